use crate::error::UploadError;
use crate::upload::intake::mime_for;
use crate::upload::types::{JobStatusResponse, ResumeFile, SubmitResponse};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const UPLOAD_PATH: &str = "/api/v1/resumes/upload";
const UPLOAD_BATCH_PATH: &str = "/api/v1/resumes/upload-batch";
const JOB_STATUS_PATH: &str = "/api/v1/resumes/jobs";

/// The resume ingestion endpoints the coordinator talks to.
#[async_trait]
pub trait ResumeBackend: Send + Sync {
    async fn submit_single(&self, file: &ResumeFile) -> Result<SubmitResponse, UploadError>;

    /// Submits all files in one request. The response is aligned with `files`.
    async fn submit_batch(&self, files: &[ResumeFile])
        -> Result<Vec<SubmitResponse>, UploadError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, UploadError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpBackend {
    pub fn new(base_url: &str, headers: HeaderMap, timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}{}/{}", self.base_url, JOB_STATUS_PATH, job_id)
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, UploadError> {
        let response = self
            .client
            .post(self.url(path))
            .headers(self.headers.clone())
            .multipart(form)
            .send()
            .await?;
        read_response(response).await
    }
}

#[async_trait]
impl ResumeBackend for HttpBackend {
    async fn submit_single(&self, file: &ResumeFile) -> Result<SubmitResponse, UploadError> {
        tracing::debug!(file = %file.name, size = file.size(), "submitting resume");
        let form = Form::new().part("file", file_part(file)?);
        self.post_form(UPLOAD_PATH, form).await
    }

    async fn submit_batch(
        &self,
        files: &[ResumeFile],
    ) -> Result<Vec<SubmitResponse>, UploadError> {
        tracing::debug!(count = files.len(), "submitting resume batch");
        let mut form = Form::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        self.post_form(UPLOAD_BATCH_PATH, form).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, UploadError> {
        let response = self
            .client
            .get(self.job_url(job_id))
            .headers(self.headers.clone())
            .send()
            .await?;
        read_response(response).await
    }
}

fn file_part(file: &ResumeFile) -> Result<Part, UploadError> {
    Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(mime_for(&file.name))
        .map_err(UploadError::Transport)
}

async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, UploadError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(UploadError::Server {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| UploadError::Malformed(e.to_string()))
}

/// Pulls a displayable `detail` out of an error body. Structured details
/// (validation error lists) are not shown to the user.
pub fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_string_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"unsupported format"}"#).as_deref(),
            Some("unsupported format")
        );
    }

    #[test]
    fn ignores_structured_or_missing_detail() {
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#),
            None
        );
        assert_eq!(error_detail(r#"{"error":"boom"}"#), None);
        assert_eq!(error_detail("<html>Bad Gateway</html>"), None);
    }

    #[test]
    fn builds_endpoint_urls() {
        let backend = HttpBackend::new(
            "http://localhost:8000/",
            HeaderMap::new(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(
            backend.url(UPLOAD_BATCH_PATH),
            "http://localhost:8000/api/v1/resumes/upload-batch"
        );
        assert_eq!(
            backend.job_url("job-1"),
            "http://localhost:8000/api/v1/resumes/jobs/job-1"
        );
    }

    #[test]
    fn submit_response_tolerates_missing_job_id() {
        let response: SubmitResponse =
            serde_json::from_str(r#"{"file_name":"a.pdf","status":"completed"}"#).unwrap();
        assert_eq!(response.job_id, None);
    }

    mod wire {
        use super::*;
        use crate::error::UPLOAD_FALLBACK;
        use reqwest::header::{HeaderValue, AUTHORIZATION};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        /// Serves one canned response and hands back the raw request.
        async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let server = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
                request
            });
            (format!("http://{}", addr), server)
        }

        async fn read_request(socket: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = buf.len() - (end + 4);
                let expected = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok());
                let complete = match expected {
                    Some(len) => body_len >= len,
                    None if head.contains("transfer-encoding: chunked") => {
                        buf.ends_with(b"0\r\n\r\n")
                    }
                    None => true,
                };
                if complete {
                    break;
                }
            }
            String::from_utf8_lossy(&buf).to_ascii_lowercase()
        }

        fn backend(base_url: &str) -> HttpBackend {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
            HttpBackend::new(base_url, headers, Duration::from_secs(5)).unwrap()
        }

        fn resume(name: &str) -> ResumeFile {
            ResumeFile::new(name, b"plain resume text".to_vec())
        }

        #[tokio::test]
        async fn single_upload_sends_file_part() {
            let (url, server) = serve_once(
                "200 OK",
                r#"{"file_name":"a.pdf","status":"processing","job_id":"j1"}"#,
            )
            .await;

            let response = backend(&url).submit_single(&resume("a.pdf")).await.unwrap();
            let request = server.await.unwrap();

            assert_eq!(response.status, "processing");
            assert_eq!(response.job_id.as_deref(), Some("j1"));
            assert!(request.starts_with("post /api/v1/resumes/upload http/1.1"));
            assert!(request.contains("authorization: bearer secret"));
            assert!(request.contains(r#"name="file"; filename="a.pdf""#));
            assert!(request.contains("content-type: application/pdf"));
            assert!(request.contains("plain resume text"));
        }

        #[tokio::test]
        async fn batch_upload_repeats_files_field() {
            let (url, server) = serve_once(
                "200 OK",
                r#"[{"file_name":"a.pdf","status":"completed","job_id":"j1"},
                    {"file_name":"b.txt","status":"processing","job_id":"j2"}]"#,
            )
            .await;

            let responses = backend(&url)
                .submit_batch(&[resume("a.pdf"), resume("b.txt")])
                .await
                .unwrap();
            let request = server.await.unwrap();

            let names: Vec<_> = responses.iter().map(|r| r.file_name.as_str()).collect();
            assert_eq!(names, vec!["a.pdf", "b.txt"]);
            assert_eq!(responses[1].job_id.as_deref(), Some("j2"));
            assert!(request.starts_with("post /api/v1/resumes/upload-batch http/1.1"));
            assert_eq!(request.matches(r#"name="files""#).count(), 2);
            assert!(request.contains(r#"name="files"; filename="a.pdf""#));
            assert!(request.contains(r#"name="files"; filename="b.txt""#));
            assert!(request.contains("content-type: text/plain"));
        }

        #[tokio::test]
        async fn job_status_reads_job_path() {
            let (url, server) = serve_once(
                "200 OK",
                r#"{"job_id":"j1","status":"completed","result":{"candidate_id":"c1"}}"#,
            )
            .await;

            let response = backend(&url).job_status("j1").await.unwrap();
            let request = server.await.unwrap();

            assert_eq!(response.status, "completed");
            assert!(request.starts_with("get /api/v1/resumes/jobs/j1 http/1.1"));
        }

        #[tokio::test]
        async fn error_status_carries_detail() {
            let (url, server) = serve_once(
                "500 Internal Server Error",
                r#"{"detail":"unsupported format"}"#,
            )
            .await;

            let error = backend(&url)
                .submit_single(&resume("a.pdf"))
                .await
                .unwrap_err();
            server.await.unwrap();

            match &error {
                UploadError::Server { status, detail } => {
                    assert_eq!(*status, 500);
                    assert_eq!(detail.as_deref(), Some("unsupported format"));
                }
                other => panic!("expected server error, got {other:?}"),
            }
            assert_eq!(error.user_message(UPLOAD_FALLBACK), "unsupported format");
        }

        #[tokio::test]
        async fn error_status_without_detail_falls_back() {
            let (url, server) =
                serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

            let error = backend(&url)
                .submit_single(&resume("a.pdf"))
                .await
                .unwrap_err();
            server.await.unwrap();

            assert!(matches!(
                error,
                UploadError::Server {
                    status: 500,
                    detail: None
                }
            ));
            assert_eq!(error.user_message(UPLOAD_FALLBACK), UPLOAD_FALLBACK);
        }
    }
}

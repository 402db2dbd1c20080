use crate::error::UploadError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::str::FromStr;

/// Headers the backend needs to recognise the browser session. Everything
/// else in a copied request (accept, sec-fetch-*, content-type) is dropped:
/// the multipart body sets its own content type.
const SESSION_HEADERS: [&str; 4] = ["authorization", "cookie", "x-csrf-token", "x-requested-with"];

/// Backend location and session headers captured from a "Copy as cURL"
/// request made by the recruiting web app.
#[derive(Clone, Default, Debug)]
pub struct CurlParser {
    pub headers: Option<HeaderMap>,
    pub base_url: Option<String>,
}

impl CurlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, curl_text: &str) -> Result<(), UploadError> {
        let base_url = extract_base_url(curl_text)
            .ok_or_else(|| UploadError::Session("Could not find a URL in curl command".into()))?;

        let mut headers = HeaderMap::new();
        for line in curl_text.lines() {
            let line = line.trim();
            let Some(content) = line
                .strip_prefix("-H '")
                .or_else(|| line.strip_prefix("--header '"))
            else {
                continue;
            };
            let content = content.trim_end_matches('\\').trim_end().trim_end_matches('\'');

            let Some((key, value)) = content.split_once(": ") else {
                continue;
            };
            let key = key.to_lowercase();
            if !SESSION_HEADERS.contains(&key.as_str()) {
                continue;
            }

            if let (Ok(name), Ok(value)) = (HeaderName::from_str(&key), HeaderValue::from_str(value)) {
                headers.insert(name, value);
            }
        }

        if let Some(cookie) = extract_cookie_flag(curl_text) {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| UploadError::Session(format!("Invalid cookie value: {}", e)))?;
            headers.insert(HeaderName::from_static("cookie"), value);
        }

        if headers.is_empty() {
            return Err(UploadError::Session(
                "No authorization or cookie header found in curl command".into(),
            ));
        }

        self.base_url = Some(base_url);
        self.headers = Some(headers);
        Ok(())
    }
}

/// Scheme and host of the first quoted http(s) URL.
fn extract_base_url(curl_text: &str) -> Option<String> {
    let start = curl_text.find("'http")?;
    let remaining = &curl_text[start + 1..];
    let url = &remaining[..remaining.find('\'')?];
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i)
        .unwrap_or(url.len());
    Some(url[..host_end].to_string())
}

/// Value of a `-b '...'` cookie flag, which newer browsers emit instead of a
/// cookie header.
fn extract_cookie_flag(curl_text: &str) -> Option<String> {
    curl_text.lines().find_map(|line| {
        let content = line.trim().strip_prefix("-b '")?;
        Some(
            content
                .trim_end_matches('\\')
                .trim_end()
                .trim_end_matches('\'')
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COPIED: &str = "curl 'https://hr.example.com/api/v1/resumes/jobs/abc' \\
  -H 'accept: application/json' \\
  -H 'authorization: Bearer eyJhbGciOi' \\
  -H 'sec-fetch-mode: cors' \\
  -b 'session=xyz; theme=dark'";

    #[test]
    fn captures_base_url_and_session_headers() {
        let mut parser = CurlParser::new();
        parser.parse(COPIED).unwrap();

        assert_eq!(parser.base_url.as_deref(), Some("https://hr.example.com"));
        let headers = parser.headers.unwrap();
        assert_eq!(headers["authorization"], "Bearer eyJhbGciOi");
        assert_eq!(headers["cookie"], "session=xyz; theme=dark");
        assert!(headers.get("accept").is_none());
        assert!(headers.get("sec-fetch-mode").is_none());
    }

    #[test]
    fn rejects_command_without_url() {
        let mut parser = CurlParser::new();
        let error = parser.parse("curl -H 'cookie: a=b'").unwrap_err();
        assert!(error.to_string().contains("Could not find a URL"));
    }

    #[test]
    fn rejects_command_without_session() {
        let mut parser = CurlParser::new();
        assert!(parser
            .parse("curl 'http://localhost:8000/api/v1/resumes/upload' -H 'accept: */*'")
            .is_err());
        assert!(parser.base_url.is_none());
    }
}

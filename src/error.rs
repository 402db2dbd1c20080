use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Shown when a single-file submission fails without a usable server message.
pub const UPLOAD_FALLBACK: &str = "An error occurred during upload.";
/// Shown when a batch submission fails without a usable server message.
pub const BATCH_FALLBACK: &str = "An error occurred during batch upload.";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected request (status {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Server { status: u16, detail: Option<String> },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidFile(String),

    #[error("Invalid session: {0}")]
    Session(String),
}

impl UploadError {
    /// Message shown next to the affected file. Only a server-supplied
    /// `detail` is shown verbatim; everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            UploadError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self, UploadError::Server { .. })
    }
}

/// Where in the workflow a failure happened. Attached to log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SubmissionTransport,
    SubmissionServer,
    BatchTransport,
    PollTransport,
}

impl FailureKind {
    pub fn for_submission(error: &UploadError) -> Self {
        if error.is_server() {
            FailureKind::SubmissionServer
        } else {
            FailureKind::SubmissionTransport
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::SubmissionTransport => "submission_transport",
            FailureKind::SubmissionServer => "submission_server",
            FailureKind::BatchTransport => "batch_transport",
            FailureKind::PollTransport => "poll_transport",
        };
        f.write_str(name)
    }
}

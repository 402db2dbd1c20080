use derivative::Derivative;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Submitting,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Position of a task in the progress list. Assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One file's journey through ingestion.
///
/// All mutators return `true` when they changed something, so callers know
/// whether to re-render. Once the task is terminal every mutator is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub file_name: String,
    pub job_id: Option<String>,
    pub status: TaskStatus,
    pub last_error: Option<String>,
    pub status_text: String,
}

impl UploadTask {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            job_id: None,
            status: TaskStatus::Submitting,
            last_error: None,
            status_text: "uploading".to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Records the backend job id. Only the first assignment sticks.
    pub fn assign_job_id(&mut self, job_id: &str) -> bool {
        if self.is_terminal() || self.job_id.is_some() {
            return false;
        }
        self.job_id = Some(job_id.to_string());
        true
    }

    pub fn begin_processing(&mut self, status_text: &str) -> bool {
        if self.status != TaskStatus::Submitting {
            return false;
        }
        self.status = TaskStatus::Processing;
        self.status_text = status_text.to_string();
        true
    }

    /// Updates the server status text of a task that is still processing.
    pub fn set_status_text(&mut self, status_text: &str) -> bool {
        if self.status != TaskStatus::Processing || self.status_text == status_text {
            return false;
        }
        self.status_text = status_text.to_string();
        true
    }

    pub fn complete(&mut self, status_text: &str) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.status_text = status_text.to_string();
        true
    }

    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.status_text = "failed".to_string();
        self.last_error = Some(error.into());
        true
    }
}

/// A file blob ready to be submitted.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ResumeFile {
    pub name: String,
    #[derivative(Debug = "ignore")]
    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Status strings reported by the backend, folded into the three states the
/// client acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Processing,
    Completed,
    Failed,
}

impl JobState {
    /// Interprets a submission response status. Anything that does not ask
    /// the client to wait or report failure counts as done.
    pub fn from_submission(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "processing" | "pending" | "queued" => JobState::Processing,
            "failed" => JobState::Failed,
            _ => JobState::Completed,
        }
    }

    /// Interprets a job status response. Only `completed` and `failed` end
    /// polling.
    pub fn from_poll(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Processing,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub file_name: String,
    pub status: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl JobStatusResponse {
    /// Failure reason carried by a `failed` job, if the server gave one.
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        self.result
            .as_ref()
            .and_then(|result| result.get("error"))
            .and_then(|error| error.as_str())
            .map(str::to_string)
    }
}

/// What a poll loop does once it stops observing a job without a terminal
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnPollExhausted {
    /// Leave the task in its last known state.
    Freeze,
    /// Mark the task failed.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Consecutive failed status checks tolerated before giving up.
    pub max_failures: u32,
    pub on_exhausted: OnPollExhausted,
    pub max_ticks: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_failures: 1,
            on_exhausted: OnPollExhausted::Freeze,
            max_ticks: None,
        }
    }
}

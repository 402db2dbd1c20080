mod client;
mod coordinator;
pub mod intake;
pub mod types;

pub use client::HttpBackend;
pub use coordinator::{ProgressEvent, ProgressSink, UploadCoordinator};
pub use intake::{Intake, SkippedFile};
pub use types::{OnPollExhausted, PollSettings, ResumeFile, TaskStatus, UploadTask};

use crate::upload::{ProgressEvent, SkippedFile, TaskStatus, UploadTask};
use std::sync::mpsc::Receiver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total: usize,
    pub uploading: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressSummary {
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}

/// Everything the window shows about uploads. One slot per task, in
/// creation order; slots are only ever appended or updated in place.
#[derive(Default)]
pub struct UploadState {
    pub tasks: Vec<UploadTask>,
    pub skipped: Vec<SkippedFile>,
    pub last_selection: Option<String>,
    pub error_message: Option<String>,
    pub show_skipped: bool,
    pub event_receiver: Option<Receiver<ProgressEvent>>,
}

impl UploadState {
    pub fn clear(&mut self) {
        *self = UploadState::default();
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        let slot = event.id().0;
        let task = match event {
            ProgressEvent::Added { task, .. } | ProgressEvent::Updated { task, .. } => task,
        };
        if slot >= self.tasks.len() {
            self.tasks.resize(slot + 1, UploadTask::new(""));
        }
        self.tasks[slot] = task;
    }

    /// Drains pending coordinator events. Returns true if anything changed.
    pub fn drain_events(&mut self) -> bool {
        let Some(receiver) = &self.event_receiver else {
            return false;
        };
        let events: Vec<ProgressEvent> = receiver.try_iter().collect();
        let had_updates = !events.is_empty();
        for event in events {
            self.apply(event);
        }
        had_updates
    }

    /// One line per task, in slot order. Failed tasks show their error.
    pub fn task_lines(&self) -> Vec<(TaskStatus, String)> {
        self.tasks
            .iter()
            .map(|task| {
                let detail = match (task.status, &task.last_error) {
                    (TaskStatus::Failed, Some(error)) => error.as_str(),
                    _ => task.status_text.as_str(),
                };
                (task.status, format!("{} - {}", task.file_name, detail))
            })
            .collect()
    }

    pub fn summary(&self) -> ProgressSummary {
        let mut summary = ProgressSummary {
            total: self.tasks.len(),
            ..ProgressSummary::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::Submitting => summary.uploading += 1,
                TaskStatus::Processing => summary.processing += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub fn is_busy(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_terminal())
    }

    pub fn get_progress_percentage(&self) -> f32 {
        let summary = self.summary();
        if summary.total == 0 {
            0.0
        } else {
            summary.finished() as f32 / summary.total as f32
        }
    }

    pub fn get_status_text(&self) -> String {
        let summary = self.summary();
        if summary.total == 0 {
            return String::new();
        }
        let label = if self.is_busy() { "Progress" } else { "Final Status" };
        format!(
            "{}: {}/{} resumes | ⏳ Processing: {} | ✅ Completed: {} | ❌ Failed: {}",
            label,
            summary.finished(),
            summary.total,
            summary.uploading + summary.processing,
            summary.completed,
            summary.failed
        )
    }
}

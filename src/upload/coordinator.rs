use crate::error::{FailureKind, BATCH_FALLBACK, UPLOAD_FALLBACK};
use crate::upload::client::ResumeBackend;
use crate::upload::types::{
    JobState, OnPollExhausted, PollSettings, ResumeFile, SubmitResponse, TaskId, UploadTask,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A change the UI should reflect. `Added` arrives once per task, before any
/// `Updated` for the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Added { id: TaskId, task: UploadTask },
    Updated { id: TaskId, task: UploadTask },
}

impl ProgressEvent {
    pub fn id(&self) -> TaskId {
        match self {
            ProgressEvent::Added { id, .. } | ProgressEvent::Updated { id, .. } => *id,
        }
    }

    pub fn task(&self) -> &UploadTask {
        match self {
            ProgressEvent::Added { task, .. } | ProgressEvent::Updated { task, .. } => task,
        }
    }
}

/// Receives every task creation and state change.
///
/// Events are delivered one at a time. `render` may read the coordinator
/// (`tasks`, `task`, `active_polls`) but must not submit files from inside
/// the callback.
pub trait ProgressSink: Send + Sync {
    fn render(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn render(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Running poll loop for one task. `done` closes when the loop ends or is
/// aborted.
struct PollHandle {
    handle: JoinHandle<()>,
    done: watch::Receiver<()>,
}

impl PollHandle {
    fn cancel(&self) {
        self.handle.abort();
    }

    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

struct Inner {
    backend: Arc<dyn ResumeBackend>,
    sink: Arc<dyn ProgressSink>,
    settings: PollSettings,
    tasks: Mutex<Vec<UploadTask>>,
    polls: Mutex<HashMap<TaskId, PollHandle>>,
    // Serializes sink calls so slots render in creation order.
    emit: Mutex<()>,
    closed: AtomicBool,
}

/// Submits resumes and follows each processing job to a terminal state.
///
/// Cloning is cheap; clones share tasks and poll loops. Polling is spawned on
/// the ambient tokio runtime, so submissions must run inside one.
#[derive(Clone)]
pub struct UploadCoordinator {
    inner: Arc<Inner>,
}

impl UploadCoordinator {
    pub fn new(
        backend: Arc<dyn ResumeBackend>,
        sink: Arc<dyn ProgressSink>,
        settings: PollSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                sink,
                settings,
                tasks: Mutex::new(Vec::new()),
                polls: Mutex::new(HashMap::new()),
                emit: Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Routes a user selection: one file goes alone, several go as a batch.
    pub async fn handle_files(&self, files: Vec<ResumeFile>) -> Vec<UploadTask> {
        match files.len() {
            0 => Vec::new(),
            1 => match files.into_iter().next() {
                Some(file) => vec![self.submit_single(file).await],
                None => Vec::new(),
            },
            _ => self.submit_batch(files).await,
        }
    }

    pub async fn submit_single(&self, file: ResumeFile) -> UploadTask {
        let id = self.inner.create_task(&file.name);
        tracing::info!(task = %id, file = %file.name, "uploading resume");

        match self.inner.backend.submit_single(&file).await {
            Ok(response) => self.apply_response(id, &response),
            Err(e) => {
                tracing::warn!(
                    task = %id,
                    file = %file.name,
                    kind = %FailureKind::for_submission(&e),
                    "upload failed: {}",
                    e
                );
                self.inner
                    .update(id, |task| task.fail(e.user_message(UPLOAD_FALLBACK)));
            }
        }

        self.inner.snapshot(id)
    }

    pub async fn submit_batch(&self, files: Vec<ResumeFile>) -> Vec<UploadTask> {
        if files.is_empty() {
            return Vec::new();
        }

        let ids: Vec<TaskId> = files
            .iter()
            .map(|file| self.inner.create_task(&file.name))
            .collect();
        tracing::info!(count = files.len(), "uploading resume batch");

        let failure = match self.inner.backend.submit_batch(&files).await {
            Ok(responses) if responses.len() == files.len() => {
                for (id, response) in ids.iter().zip(responses.iter()) {
                    self.apply_response(*id, response);
                }
                None
            }
            Ok(responses) => Some(format!(
                "Server returned {} results for {} files",
                responses.len(),
                files.len()
            )),
            Err(e) => {
                tracing::warn!(
                    count = files.len(),
                    kind = %FailureKind::BatchTransport,
                    "batch upload failed: {}",
                    e
                );
                Some(e.user_message(BATCH_FALLBACK))
            }
        };

        if let Some(message) = failure {
            for id in &ids {
                self.inner.update(*id, |task| task.fail(message.clone()));
            }
        }

        ids.iter().map(|id| self.inner.snapshot(*id)).collect()
    }

    fn apply_response(&self, id: TaskId, response: &SubmitResponse) {
        let job_id = response.job_id.as_deref();

        match JobState::from_submission(&response.status) {
            JobState::Processing => match job_id {
                Some(job_id) => {
                    self.inner.update(id, |task| {
                        let assigned = task.assign_job_id(job_id);
                        task.begin_processing(&response.status) || assigned
                    });
                    self.start_polling(id, job_id.to_string());
                }
                None => {
                    tracing::warn!(task = %id, file = %response.file_name, "processing without a job id");
                    self.inner
                        .update(id, |task| task.fail("Server did not return a job id"));
                }
            },
            JobState::Completed => {
                tracing::info!(task = %id, file = %response.file_name, "resume accepted");
                self.inner.update(id, |task| {
                    let assigned = job_id.map(|j| task.assign_job_id(j)).unwrap_or(false);
                    task.complete(&response.status) || assigned
                });
            }
            JobState::Failed => {
                let reason = response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Resume processing failed".to_string());
                tracing::warn!(task = %id, file = %response.file_name, "resume rejected: {}", reason);
                self.inner.update(id, |task| {
                    let assigned = job_id.map(|j| task.assign_job_id(j)).unwrap_or(false);
                    task.fail(reason) || assigned
                });
            }
        }
    }

    fn start_polling(&self, id: TaskId, job_id: String) {
        let inner = Arc::clone(&self.inner);
        let mut polls = lock(&self.inner.polls);
        if self.inner.closed.load(Ordering::SeqCst) {
            tracing::info!(task = %id, job_id = %job_id, "coordinator shut down, not polling");
            return;
        }
        if let Some(previous) = polls.get(&id) {
            if previous.is_active() {
                return;
            }
        }
        let (done_tx, done) = watch::channel(());
        let handle = tokio::spawn(async move {
            let _done = done_tx;
            poll_job(inner, id, job_id).await;
        });
        polls.insert(id, PollHandle { handle, done });
    }

    /// Stops watching a task. The task keeps its current state.
    pub fn cancel_polling(&self, id: TaskId) -> bool {
        match lock(&self.inner.polls).remove(&id) {
            Some(poll) => {
                let was_active = poll.is_active();
                poll.cancel();
                was_active
            }
            None => false,
        }
    }

    /// Cancels every poll loop and refuses to start new ones, including for
    /// submissions still in flight. Called when the view goes away.
    pub fn shutdown(&self) {
        let polls: Vec<PollHandle> = {
            let mut polls = lock(&self.inner.polls);
            self.inner.closed.store(true, Ordering::SeqCst);
            polls.drain().map(|(_, p)| p).collect()
        };
        if !polls.is_empty() {
            tracing::info!(count = polls.len(), "cancelling polling");
        }
        for poll in polls {
            poll.cancel();
        }
    }

    /// Waits until every poll loop has ended. Running loops stay registered
    /// while waiting, so they can still be counted and cancelled.
    pub async fn wait_for_polls(&self) {
        loop {
            let running: Vec<watch::Receiver<()>> = lock(&self.inner.polls)
                .values()
                .filter(|poll| poll.is_active())
                .map(|poll| poll.done.clone())
                .collect();
            if running.is_empty() {
                break;
            }
            for mut done in running {
                // Only ever errors, once the loop's sender is dropped.
                while done.changed().await.is_ok() {}
            }
        }

        let finished: Vec<PollHandle> = {
            let mut polls = lock(&self.inner.polls);
            let ids: Vec<TaskId> = polls
                .iter()
                .filter(|(_, poll)| !poll.is_active())
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| polls.remove(id)).collect()
        };
        for poll in finished {
            if let Err(e) = poll.handle.await {
                if !e.is_cancelled() {
                    tracing::error!("poll loop panicked: {}", e);
                }
            }
        }
    }

    pub fn active_polls(&self) -> usize {
        lock(&self.inner.polls)
            .values()
            .filter(|poll| poll.is_active())
            .count()
    }

    pub fn tasks(&self) -> Vec<UploadTask> {
        lock(&self.inner.tasks).clone()
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        lock(&self.inner.tasks).get(id.0).cloned()
    }
}

impl Inner {
    fn create_task(&self, file_name: &str) -> TaskId {
        let _order = lock(&self.emit);
        let task = UploadTask::new(file_name);
        let id = {
            let mut tasks = lock(&self.tasks);
            tasks.push(task.clone());
            TaskId(tasks.len() - 1)
        };
        self.sink.render(ProgressEvent::Added { id, task });
        id
    }

    /// Applies `change` and renders if it reported a change.
    fn update(&self, id: TaskId, change: impl FnOnce(&mut UploadTask) -> bool) -> bool {
        let _order = lock(&self.emit);
        let task = {
            let mut tasks = lock(&self.tasks);
            let Some(task) = tasks.get_mut(id.0) else {
                return false;
            };
            if !change(task) {
                return false;
            }
            task.clone()
        };
        self.sink.render(ProgressEvent::Updated { id, task });
        true
    }

    fn snapshot(&self, id: TaskId) -> UploadTask {
        lock(&self.tasks)
            .get(id.0)
            .cloned()
            .unwrap_or_else(|| UploadTask::new(""))
    }

    fn give_up(&self, id: TaskId, job_id: &str, reason: &str) {
        match self.settings.on_exhausted {
            OnPollExhausted::Freeze => {
                tracing::warn!(task = %id, job_id, "stopped polling: {}", reason);
            }
            OnPollExhausted::Fail => {
                tracing::warn!(task = %id, job_id, "marking task failed: {}", reason);
                self.update(id, |task| {
                    task.fail(format!("Lost track of processing job: {}", reason))
                });
            }
        }
    }
}

/// Polls one job until it reaches a terminal status or the failure policy
/// gives up. Each tick waits the full interval after the previous response,
/// so requests for one job never overlap.
async fn poll_job(inner: Arc<Inner>, id: TaskId, job_id: String) {
    let settings = inner.settings;
    let mut ticks: u32 = 0;
    let mut failures: u32 = 0;

    loop {
        if let Some(max_ticks) = settings.max_ticks {
            if ticks >= max_ticks {
                inner.give_up(id, &job_id, &format!("no result after {} checks", ticks));
                return;
            }
        }

        tokio::time::sleep(settings.interval).await;
        ticks += 1;

        match inner.backend.job_status(&job_id).await {
            Ok(response) => {
                failures = 0;
                tracing::debug!(task = %id, job_id = %job_id, status = %response.status, "poll");
                match JobState::from_poll(&response.status) {
                    JobState::Processing => {
                        inner.update(id, |task| task.set_status_text(&response.status));
                    }
                    JobState::Completed => {
                        tracing::info!(task = %id, job_id = %job_id, "processing completed");
                        inner.update(id, |task| task.complete(&response.status));
                        return;
                    }
                    JobState::Failed => {
                        let reason = response
                            .failure_reason()
                            .unwrap_or_else(|| "Resume processing failed".to_string());
                        tracing::warn!(task = %id, job_id = %job_id, "processing failed: {}", reason);
                        inner.update(id, |task| task.fail(reason));
                        return;
                    }
                }
            }
            Err(e) => {
                failures += 1;
                tracing::debug!(
                    task = %id,
                    job_id = %job_id,
                    kind = %FailureKind::PollTransport,
                    failures,
                    "status check failed: {}",
                    e
                );
                if failures >= settings.max_failures.max(1) {
                    inner.give_up(id, &job_id, &e.to_string());
                    return;
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

mod state;
mod ui;

use crate::config::Config;
use crate::error::UploadError;
use crate::upload::{HttpBackend, Intake, ProgressEvent, ProgressSink, UploadCoordinator};
use crate::utils::curl_parser::CurlParser;
use crate::utils::file_size::FileSizeUtils;
use eframe::{egui, App};
use state::UploadState;
use std::sync::mpsc::{self as std_mpsc, Sender};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

/// Forwards coordinator events to the UI thread and wakes it up.
struct ChannelSink {
    sender: Mutex<Sender<ProgressEvent>>,
    ctx: egui::Context,
}

impl ProgressSink for ChannelSink {
    fn render(&self, event: ProgressEvent) {
        if let Ok(sender) = self.sender.lock() {
            sender.send(event).unwrap_or_default();
        }
        self.ctx.request_repaint();
    }
}

pub struct ResumeUploader {
    curl_text: String,
    config: Config,
    runtime: Handle,
    state: UploadState,
    coordinator: Option<UploadCoordinator>,
    backend_url: String,
}

impl ResumeUploader {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config, runtime: Handle) -> Self {
        tracing::info!("Initializing resume uploader for {}", config.api_url);
        Self {
            curl_text: String::new(),
            backend_url: config.api_url.clone(),
            config,
            runtime,
            state: UploadState::default(),
            coordinator: None,
        }
    }

    /// Cancels polling and forgets every task. The session input stays.
    pub fn reset_upload_state(&mut self) {
        tracing::info!("Clearing upload list");
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.shutdown();
        }
        self.state.clear();
    }

    fn ensure_coordinator(&mut self, ctx: &egui::Context) -> Result<UploadCoordinator, UploadError> {
        if let Some(coordinator) = &self.coordinator {
            return Ok(coordinator.clone());
        }

        let (base_url, headers) = if self.curl_text.trim().is_empty() {
            let headers = self
                .config
                .default_headers()
                .map_err(|e| UploadError::Session(e.to_string()))?;
            (self.config.api_url.clone(), headers)
        } else {
            let mut parser = CurlParser::new();
            parser.parse(&self.curl_text)?;
            (
                parser.base_url.unwrap_or_else(|| self.config.api_url.clone()),
                parser.headers.unwrap_or_default(),
            )
        };

        let backend = HttpBackend::new(&base_url, headers, self.config.request_timeout)?;
        self.backend_url = backend.base_url().to_string();

        let (sender, receiver) = std_mpsc::channel();
        self.state.event_receiver = Some(receiver);
        let sink = ChannelSink {
            sender: Mutex::new(sender),
            ctx: ctx.clone(),
        };

        let coordinator = UploadCoordinator::new(Arc::new(backend), Arc::new(sink), self.config.poll);
        self.coordinator = Some(coordinator.clone());
        Ok(coordinator)
    }

    pub fn start_upload(&mut self, ctx: &egui::Context, intake: Intake) {
        if intake.is_empty() {
            return;
        }
        self.state.error_message = None;
        self.state.skipped.extend(intake.skipped);

        if intake.files.is_empty() {
            self.state.error_message = Some("No supported resumes selected".to_string());
            return;
        }

        let coordinator = match self.ensure_coordinator(ctx) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                tracing::error!("Cannot start upload: {}", e);
                self.state.error_message = Some(e.to_string());
                return;
            }
        };

        let files = intake.files;
        let selection = FileSizeUtils::describe_selection(&files);
        tracing::info!("Uploading {}", selection);
        self.state.last_selection = Some(selection);

        self.runtime.spawn(async move {
            coordinator.handle_files(files).await;
        });
    }

    fn take_dropped_files(&mut self, ctx: &egui::Context) -> Intake {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let mut intake = Intake::default();
        for file in dropped {
            if let Some(bytes) = &file.bytes {
                intake.push_bytes(&file.name, bytes.to_vec());
            } else if let Some(path) = &file.path {
                if path.is_dir() {
                    let folder = Intake::from_paths(&[path]);
                    intake.files.extend(folder.files);
                    intake.skipped.extend(folder.skipped);
                } else {
                    intake.push_path(path);
                }
            }
        }
        intake
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        if self.state.drain_events() {
            ctx.request_repaint();
        }

        let dropped = self.take_dropped_files(ctx);
        if !dropped.is_empty() {
            self.start_upload(ctx, dropped);
        }
    }
}

impl App for ResumeUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}

impl Drop for ResumeUploader {
    fn drop(&mut self) {
        if let Some(coordinator) = &self.coordinator {
            coordinator.shutdown();
        }
    }
}

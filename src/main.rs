mod app;
mod config;
mod error;
mod upload;
mod utils;

use anyhow::{anyhow, Result};
use app::ResumeUploader;
use config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use upload::{HttpBackend, Intake, ProgressEvent, TaskStatus, UploadCoordinator, UploadTask};

fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume uploader v{}", env!("CARGO_PKG_VERSION"));

    let runtime = Runtime::new()?;
    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    if !paths.is_empty() {
        let failed = runtime.block_on(run_headless(&config, &paths))?;
        if failed > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_min_inner_size([420.0, 520.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    eframe::run_native(
        "Resume Uploader",
        options,
        Box::new(
            move |cc: &eframe::CreationContext<'_>| -> Box<dyn eframe::App> {
                Box::new(ResumeUploader::new(cc, config, handle))
            },
        ),
    )
    .map_err(|e| anyhow!("Failed to start window: {e}"))?;

    Ok(())
}

/// Uploads `paths` without a window and waits for every job to settle.
/// Returns the number of failed tasks.
async fn run_headless(config: &Config, paths: &[PathBuf]) -> Result<usize> {
    let intake = Intake::from_paths(paths);
    for skipped in &intake.skipped {
        println!("⏩ {} - {}", skipped.name, skipped.reason);
    }
    if intake.files.is_empty() {
        return Err(anyhow!("No supported resumes found in the given paths"));
    }

    let backend = HttpBackend::new(&config.api_url, config.default_headers()?, config.request_timeout)?;
    let sink = |event: ProgressEvent| {
        let task = event.task();
        match task.status {
            TaskStatus::Submitting => println!("📤 {} - uploading", task.file_name),
            TaskStatus::Processing => println!("⏳ {} - {}", task.file_name, task.status_text),
            TaskStatus::Completed => println!("✅ {} - {}", task.file_name, task.status_text),
            TaskStatus::Failed => println!(
                "❌ {} - {}",
                task.file_name,
                task.last_error.as_deref().unwrap_or("failed")
            ),
        }
    };
    let coordinator = UploadCoordinator::new(Arc::new(backend), Arc::new(sink), config.poll);

    coordinator.handle_files(intake.files).await;
    coordinator.wait_for_polls().await;

    let tasks = coordinator.tasks();
    let completed = count_status(&tasks, TaskStatus::Completed);
    let failed = count_status(&tasks, TaskStatus::Failed);
    println!(
        "Final Status: {}/{} resumes completed | ❌ Failed: {} | ⏳ Unfinished: {} | ⏩ Skipped: {}",
        completed,
        tasks.len(),
        failed,
        tasks.len() - completed - failed,
        intake.skipped.len()
    );

    Ok(failed)
}

fn count_status(tasks: &[UploadTask], status: TaskStatus) -> usize {
    tasks.iter().filter(|task| task.status == status).count()
}

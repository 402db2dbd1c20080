use crate::error::UploadError;
use crate::upload::types::ResumeFile;
use crate::utils::file_size::FileSizeUtils;
use ignore::Walk;
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];

/// A file that was turned away before upload, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Files accepted for upload plus the ones rejected on the way.
#[derive(Debug, Default)]
pub struct Intake {
    pub files: Vec<ResumeFile>,
    pub skipped: Vec<SkippedFile>,
}

impl Intake {
    /// Reads every given path. Directories are walked, honoring ignore files.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut intake = Intake::default();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                for file_path in collect_folder(path) {
                    intake.push_path(&file_path);
                }
            } else {
                intake.push_path(path);
            }
        }
        intake
    }

    /// Accepts an in-memory blob, e.g. a file dropped from a browser window.
    pub fn push_bytes(&mut self, name: &str, bytes: Vec<u8>) {
        let file = ResumeFile::new(name, bytes);
        match validate(&file) {
            Ok(()) => self.files.push(file),
            Err(e) => self.skip(name, e.to_string()),
        }
    }

    pub fn push_path(&mut self, path: &Path) {
        let name = display_name(path);
        match read_resume(path) {
            Ok(file) => self.files.push(file),
            Err(e) => self.skip(&name, e.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.skipped.is_empty()
    }

    fn skip(&mut self, name: &str, reason: String) {
        tracing::info!(file = name, %reason, "skipping file");
        self.skipped.push(SkippedFile {
            name: name.to_string(),
            reason,
        });
    }
}

/// Supported files under `folder`, in walk order.
pub fn collect_folder(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in Walk::new(folder) {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && is_supported_file(path) {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => tracing::warn!("Error walking {}: {}", folder.display(), e),
        }
    }
    files
}

pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// MIME type the backend expects for a file name.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn validate(file: &ResumeFile) -> Result<(), UploadError> {
    if !is_supported_file(Path::new(&file.name)) {
        return Err(UploadError::InvalidFile(
            "Invalid file format. Allowed formats: .pdf, .doc, .docx, .txt".to_string(),
        ));
    }
    if file.bytes.is_empty() {
        return Err(UploadError::InvalidFile("File is empty".to_string()));
    }
    if file.size() > MAX_FILE_SIZE {
        return Err(UploadError::InvalidFile(format!(
            "File size ({}) exceeds maximum limit of {}",
            FileSizeUtils::format_size(file.size()),
            FileSizeUtils::format_size(MAX_FILE_SIZE)
        )));
    }
    Ok(())
}

pub fn read_resume(path: &Path) -> Result<ResumeFile, UploadError> {
    let name = display_name(path);
    let bytes = fs::read(path).map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = ResumeFile::new(name, bytes);
    validate(&file)?;
    Ok(file)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

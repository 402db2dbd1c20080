use crate::upload::ResumeFile;

pub struct FileSizeUtils;

impl FileSizeUtils {
    pub fn format_size(size: u64) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut scaled = size as f64;
        let mut unit = 0;

        while scaled >= 1024.0 && unit < UNITS.len() - 1 {
            scaled /= 1024.0;
            unit += 1;
        }

        match unit {
            0 => format!("{} {}", size, UNITS[0]),
            _ => format!("{:.2} {}", scaled, UNITS[unit]),
        }
    }

    /// "3 files, 1.20 MB" style summary of a selection.
    pub fn describe_selection(files: &[ResumeFile]) -> String {
        let total: u64 = files.iter().map(ResumeFile::size).sum();
        let noun = if files.len() == 1 { "file" } else { "files" };
        format!("{} {}, {}", files.len(), noun, Self::format_size(total))
    }
}

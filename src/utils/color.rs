use crate::upload::TaskStatus;
use eframe::egui::Color32;

pub const ACCENT: &str = "#A159E1";
const MUTED: &str = "#969696";
const SUCCESS: &str = "#00B400";
const DANGER: &str = "#DC3232";

pub trait ColorExt {
    fn from_hex(hex: &str) -> Option<Self>
    where
        Self: Sized;

    /// Like `from_hex`, for the palette constants above.
    fn hex_or_gray(hex: &str) -> Self
    where
        Self: Sized;
}

impl ColorExt for Color32 {
    fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Color32::from_rgb(r, g, b))
    }

    fn hex_or_gray(hex: &str) -> Self {
        Self::from_hex(hex).unwrap_or(Color32::GRAY)
    }
}

/// Icon and color for a task line in the progress list.
pub fn status_style(status: TaskStatus) -> (&'static str, Color32) {
    match status {
        TaskStatus::Submitting => ("📤", Color32::hex_or_gray(MUTED)),
        TaskStatus::Processing => ("⏳", Color32::hex_or_gray(ACCENT)),
        TaskStatus::Completed => ("✅", Color32::hex_or_gray(SUCCESS)),
        TaskStatus::Failed => ("❌", Color32::hex_or_gray(DANGER)),
    }
}

pub fn skipped_color() -> Color32 {
    Color32::hex_or_gray(MUTED)
}

pub fn error_color() -> Color32 {
    Color32::hex_or_gray(DANGER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_palette() {
        assert_eq!(Color32::from_hex(ACCENT), Some(Color32::from_rgb(161, 89, 225)));
        assert_eq!(Color32::from_hex("#12345"), None);
        assert_eq!(Color32::from_hex("zzzzzz"), None);
    }

    #[test]
    fn failed_tasks_render_red() {
        let (icon, color) = status_style(TaskStatus::Failed);
        assert_eq!(icon, "❌");
        assert_eq!(color, Color32::from_rgb(220, 50, 50));
    }
}

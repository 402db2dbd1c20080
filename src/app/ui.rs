use super::ResumeUploader;
use crate::upload::Intake;
use crate::utils::color::{error_color, skipped_color, status_style, ColorExt, ACCENT};
use eframe::egui::{self, Align, Color32, RichText};
use rfd::FileDialog;

const RESUME_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];

impl ResumeUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Resume Uploader");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Upload resumes for parsing and candidate matching")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);
                    self.render_session(ui);
                    ui.add_space(20.0);
                    self.render_intake(ctx, ui);
                    ui.add_space(20.0);

                    if !self.state.tasks.is_empty() {
                        self.render_progress(ui);
                    }

                    if !self.state.tasks.is_empty() || !self.state.skipped.is_empty() {
                        ui.add_space(10.0);
                        self.render_details(ui);
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });
    }

    fn render_session(&mut self, ui: &mut egui::Ui) {
        let editable = self.coordinator.is_none();
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Session (optional): paste a request copied from the recruiting app");
                ui.add_space(4.0);
                ui.label("ℹ").on_hover_text_at_pointer(
                    "To get the curl command:\n\
                    1. Log in to the recruiting app\n\
                    2. Open Developer Tools (F12), Network tab\n\
                    3. Open the resume upload page\n\
                    4. Right-click any /api/v1 request and Copy as cURL\n\
                    Leave empty to use RESUME_API_URL and RESUME_API_TOKEN.",
                );
            });

            ui.add_space(8.0);
            ui.add_enabled_ui(editable, |ui| {
                egui::ScrollArea::vertical()
                    .id_source("session_input")
                    .max_height(100.0)
                    .show(ui, |ui| {
                        let text_edit = egui::TextEdit::multiline(&mut self.curl_text)
                            .desired_width(ui.available_width())
                            .font(egui::TextStyle::Monospace)
                            .hint_text("curl 'https://<host>/api/v1/...' -H 'authorization: Bearer ...'");
                        ui.add_sized([ui.available_width(), 80.0], text_edit);
                    });
            });
        });
    }

    fn render_intake(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let accent = Color32::hex_or_gray(ACCENT);

        let border = if hovering {
            egui::Stroke::new(2.0, accent)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };
        let frame = egui::Frame::group(ui.style())
            .stroke(border)
            .inner_margin(16.0);

        frame.show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical_centered(|ui| {
                let prompt = if hovering {
                    "Release to upload"
                } else {
                    "Drag and drop resumes here (.pdf, .doc, .docx, .txt, max 10 MB)"
                };
                let prompt_color = if hovering {
                    accent
                } else {
                    ui.visuals().text_color()
                };
                ui.label(RichText::new(prompt).color(prompt_color));
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    if ui.button("📄 Select Resumes").clicked() {
                        if let Some(paths) = FileDialog::new()
                            .add_filter("Resumes", &RESUME_EXTENSIONS)
                            .pick_files()
                        {
                            self.start_upload(ctx, Intake::from_paths(&paths));
                        }
                    }
                    if ui.button("📁 Select Folder").clicked() {
                        if let Some(path) = FileDialog::new().pick_folder() {
                            self.start_upload(ctx, Intake::from_paths(&[path]));
                        }
                    }
                    let has_entries =
                        !self.state.tasks.is_empty() || !self.state.skipped.is_empty();
                    if has_entries && ui.button("🗑 Clear").clicked() {
                        self.reset_upload_state();
                    }
                });

                if let Some(selection) = &self.state.last_selection {
                    ui.add_space(5.0);
                    ui.label(format!("Last selection: {}", selection));
                }
            });
        });
    }

    fn render_progress(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            let heading = if self.state.is_busy() {
                "📤 Uploading"
            } else if self.state.summary().failed > 0 {
                "Upload finished with failures"
            } else {
                "Upload Complete"
            };
            ui.label(heading);

            let progress_bar = egui::ProgressBar::new(self.state.get_progress_percentage())
                .show_percentage()
                .animate(self.state.is_busy())
                .fill(Color32::hex_or_gray(ACCENT));
            ui.add(progress_bar);

            ui.label(self.state.get_status_text());
        });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .id_source("upload_details")
            .max_height(240.0)
            .show(ui, |ui| {
                egui::Frame::none()
                    .fill(ui.style().visuals.extreme_bg_color)
                    .show(ui, |ui| {
                        ui.add_space(8.0);
                        for (status, line) in self.state.task_lines() {
                            let (icon, color) = status_style(status);
                            ui.horizontal(|ui| {
                                ui.label(icon);
                                ui.colored_label(color, line);
                            });
                            ui.add_space(4.0);
                        }
                        ui.add_space(4.0);
                    });
            });

        if self.state.skipped.is_empty() {
            return;
        }

        ui.add_space(6.0);
        let toggle = if self.state.show_skipped {
            format!("Hide Skipped ({})", self.state.skipped.len())
        } else {
            format!("Show Skipped ({})", self.state.skipped.len())
        };
        if ui.button(toggle).clicked() {
            self.state.show_skipped = !self.state.show_skipped;
        }
        if !self.state.show_skipped {
            return;
        }

        for skipped in &self.state.skipped {
            ui.horizontal(|ui| {
                ui.label("⏩");
                ui.colored_label(
                    skipped_color(),
                    format!("{} - {}", skipped.name, skipped.reason),
                );
            });
            ui.add_space(4.0);
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            let link = egui::Label::new(
                RichText::new(format!("Open {}", self.backend_url))
                    .color(Color32::hex_or_gray(ACCENT)),
            )
            .sense(egui::Sense::click());
            if ui.add(link).clicked() {
                if let Err(e) = open::that(&self.backend_url) {
                    tracing::warn!("Failed to open link: {}", e);
                }
            }
        });

        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(error_color(), error);
            });
        }
    }
}

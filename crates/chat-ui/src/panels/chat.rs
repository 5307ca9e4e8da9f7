//! Chat panel: displays the active conversation, pending images,
//! staged files and the input field.

use egui::{self, Align, Key, Layout, Modifiers, RichText, ScrollArea, Vec2};
use chat_types::message::{AttachmentKind, Message};
use crate::state::UiState;
use crate::theme::*;

/// What the caller should do after rendering the chat panel
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    None,
    /// Send the composer content
    Submit {
        text: String,
        files: Vec<chat_types::message::Attachment>,
    },
    /// Open the picker for images to upload
    PickImages,
    /// Open the picker for files to attach
    PickFiles,
    RemovePendingImage(usize),
}

/// Render the chat panel. The composer is cleared when a submit is returned.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState) -> ChatAction {
    let mut action = ChatAction::None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    let title = state
                        .snapshot
                        .active_conversation()
                        .map(|c| c.title.clone())
                        .unwrap_or_else(|| "Chat".to_string());
                    ui.heading(RichText::new(title).color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status_color = if state.is_busy() || state.uploading() {
                            WARNING
                        } else if state.status_text.starts_with("Error") {
                            ERROR
                        } else {
                            SUCCESS
                        };
                        ui.label(RichText::new(&state.status_text).color(status_color).small());
                    });
                });

                ui.separator();

                // Messages area
                let available_height = ui.available_height() - 120.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if state.active_messages().is_empty() {
                            ui.label(
                                RichText::new("Send a message to start the conversation")
                                    .color(TEXT_SECONDARY),
                            );
                        }
                        for message in state.active_messages() {
                            render_message(ui, message);
                            ui.add_space(4.0);
                        }
                    });

                ui.add_space(8.0);

                if let Some(a) = pending_strip(ui, state) {
                    action = a;
                }

                // Input area
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!state.uploading(), egui::Button::new("🖼"))
                        .on_hover_text("Upload images")
                        .clicked()
                    {
                        action = ChatAction::PickImages;
                    }
                    if ui.button("📎").on_hover_text("Attach files").clicked() {
                        action = ChatAction::PickFiles;
                    }

                    // Enter sends, Shift+Enter inserts a newline
                    let input_id = ui.make_persistent_id("chat_input");
                    let had_focus = ui.memory(|m| m.has_focus(input_id));
                    let enter_pressed =
                        had_focus && ui.input_mut(|i| i.consume_key(Modifiers::NONE, Key::Enter));

                    let input = egui::TextEdit::multiline(&mut state.input_text)
                        .id(input_id)
                        .hint_text("Type a message...")
                        .desired_rows(2)
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));
                    ui.add(input);

                    let send_enabled = state.can_send();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    if enter_pressed || send_btn.clicked() {
                        if let Some((text, files)) = state.take_submission() {
                            action = ChatAction::Submit { text, files };
                        }
                    }
                });
            });
        });

    action
}

/// Pending image URLs and staged files above the input
fn pending_strip(ui: &mut egui::Ui, state: &mut UiState) -> Option<ChatAction> {
    if state.pending_images.is_empty() && state.staged_files.is_empty() {
        return None;
    }

    let mut action = None;
    let mut unstage = None;
    ui.horizontal_wrapped(|ui| {
        for (i, url) in state.pending_images.iter().enumerate() {
            chip(ui, |ui| {
                ui.hyperlink_to(RichText::new(file_name(url)).small(), url);
                if ui.small_button("✕").clicked() {
                    action = Some(ChatAction::RemovePendingImage(i));
                }
            });
        }
        for (i, file) in state.staged_files.iter().enumerate() {
            chip(ui, |ui| {
                ui.label(
                    RichText::new(format!("{} ({} KB)", file.name, file.size_kb()))
                        .color(TEXT_SECONDARY)
                        .small(),
                );
                if ui.small_button("✕").clicked() {
                    unstage = Some(i);
                }
            });
        }
    });

    if let Some(i) = unstage {
        state.remove_staged_file(i);
    }
    action
}

fn chip(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::default()
        .fill(BG_SURFACE)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(4.0)
        .show(ui, |ui| {
            ui.horizontal(add_contents);
        });
}

fn render_message(ui: &mut egui::Ui, message: &Message) {
    let (label, label_color, bg) = if message.is_user {
        ("You", ACCENT, USER_BUBBLE)
    } else {
        ("AI", SUCCESS, AI_BUBBLE)
    };

    egui::Frame::default()
        .fill(bg)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(label).color(label_color).strong().small());
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if !message.is_streaming
                        && !message.content.is_empty()
                        && ui.small_button("Copy").clicked()
                    {
                        ui.ctx().copy_text(message.content.clone());
                    }
                });
            });

            if message.is_streaming && message.content.is_empty() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new("Thinking...").color(TEXT_SECONDARY));
                });
            } else {
                ui.horizontal_wrapped(|ui| {
                    ui.label(RichText::new(&message.content).color(TEXT_PRIMARY));
                    if message.is_streaming {
                        ui.label(RichText::new("▌").color(ACCENT).strong());
                    }
                });
            }

            for url in &message.image_urls {
                ui.hyperlink_to(RichText::new(format!("🖼 {}", file_name(url))).small(), url);
            }
            for file in &message.files {
                let icon = match file.kind {
                    AttachmentKind::Image => "🖼",
                    AttachmentKind::Other => "📄",
                };
                ui.label(
                    RichText::new(format!("{} {} ({} KB)", icon, file.name, file.size_kb()))
                        .color(TEXT_SECONDARY)
                        .small(),
                );
            }
        });
}

/// Last path segment of a URL
pub fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

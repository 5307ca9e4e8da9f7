//! Sidebar panel: conversation list with create / select / delete.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use chat_types::conversation::ConversationId;
use crate::state::UiState;
use crate::theme::*;

/// What the caller should do after rendering the sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    None,
    Create,
    Select(ConversationId),
    Delete(ConversationId),
}

pub fn sidebar_panel(ui: &mut egui::Ui, state: &UiState) -> SidebarAction {
    let mut action = SidebarAction::None;
    let active = state.snapshot.active_id().cloned();

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            let new_btn = egui::Button::new(RichText::new("+ New chat").color(TEXT_PRIMARY))
                .fill(ACCENT)
                .corner_radius(PANEL_ROUNDING)
                .min_size(Vec2::new(ui.available_width(), 32.0));
            if ui.add(new_btn).clicked() {
                action = SidebarAction::Create;
            }

            ui.add_space(8.0);

            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for summary in state.conversations() {
                        let selected = active.as_ref() == Some(&summary.id);
                        ui.horizontal(|ui| {
                            let mut title = RichText::new(&summary.title).color(if selected {
                                TEXT_PRIMARY
                            } else {
                                TEXT_SECONDARY
                            });
                            if summary.is_streaming {
                                title = title.italics();
                            }
                            if ui.selectable_label(selected, title).clicked() && !selected {
                                action = SidebarAction::Select(summary.id.clone());
                            }
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if ui
                                    .small_button(RichText::new("🗑").color(ERROR))
                                    .on_hover_text("Delete conversation")
                                    .clicked()
                                {
                                    action = SidebarAction::Delete(summary.id.clone());
                                }
                            });
                        });
                    }

                    if state.snapshot.is_empty() {
                        ui.label(
                            RichText::new("No conversations yet")
                                .color(TEXT_SECONDARY)
                                .small(),
                        );
                    }
                });
        });

    action
}

//! Main egui application: composes the panels and drives the chat session.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use chat_core::event_bus::EventBus;
use chat_core::ports::LocalFile;
use chat_core::session::ChatSession;
use chat_core::store::SharedStore;
use chat_platform::coze::CozeChatProvider;
use chat_platform::file::{pick_files, MemoryFile};
use chat_platform::github::GitHubContentStore;
use chat_types::config::ChatConfig;
use chat_types::event::ChatEvent;
use chat_types::message::{Attachment, AttachmentKind};
use chat_ui::panels::chat::{self, ChatAction};
use chat_ui::panels::sidebar::{self, SidebarAction};
use chat_ui::panels::alert;
use chat_ui::state::UiState;
use chat_ui::theme;

const CJK_FONT_URL: &str = "NotoSansSC-Regular.otf";

/// The main application state
pub struct ChatApp {
    ui_state: UiState,
    config: Rc<ChatConfig>,
    event_bus: EventBus,
    session: Rc<ChatSession>,
    /// Files picked asynchronously, staged on the next frame
    picked_files: Rc<RefCell<Vec<Attachment>>>,
    first_frame: bool,
}

impl ChatApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = Rc::new(ChatConfig::from_build_env());
        let event_bus = EventBus::new();

        let mut ui_state = UiState::new();
        if let Err(e) = config.validate() {
            log::warn!("Incomplete configuration: {}", e);
            ui_state.alert = Some(e.to_string());
        }

        let chat = Rc::new(CozeChatProvider::new(config.chat.clone()));
        let content_store = Rc::new(GitHubContentStore::new(config.content_store.clone()));
        let session = ChatSession::new(
            &config,
            SharedStore::default(),
            event_bus.clone(),
            chat,
            content_store,
        );

        Self {
            ui_state,
            config,
            event_bus,
            session: Rc::new(session),
            picked_files: Rc::new(RefCell::new(Vec::new())),
            first_frame: true,
        }
    }

    /// Fetch a CJK font from the server and install it into egui
    fn load_cjk_font(ctx: egui::Context) {
        wasm_bindgen_futures::spawn_local(async move {
            let Some(window) = web_sys::window() else {
                return;
            };
            let resp = match wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(CJK_FONT_URL)).await {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Failed to fetch CJK font: {:?}", e);
                    return;
                }
            };
            let resp: web_sys::Response = resp.into();
            let buf = match resp.array_buffer() {
                Ok(p) => match wasm_bindgen_futures::JsFuture::from(p).await {
                    Ok(b) => b,
                    Err(_) => return,
                },
                Err(_) => return,
            };
            let bytes = js_sys::Uint8Array::new(&buf).to_vec();

            let mut fonts = egui::FontDefinitions::default();
            fonts.font_data.insert(
                "noto_sans_sc".to_owned(),
                egui::FontData::from_owned(bytes).into(),
            );
            fonts
                .families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .insert(0, "noto_sans_sc".to_owned());
            fonts
                .families
                .entry(egui::FontFamily::Monospace)
                .or_default()
                .push("noto_sans_sc".to_owned());

            ctx.set_fonts(fonts);
            ctx.request_repaint();
            log::info!("CJK font loaded");
        });
    }

    fn refresh(&mut self) {
        self.ui_state
            .refresh(self.session.snapshot(), self.session.pending_image_urls());
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            Self::load_cjk_font(ctx.clone());
            self.first_frame = false;
        }

        // Drain events from the chat session
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            // Upload batches change pending images without touching the store
            self.refresh();
            ctx.request_repaint();
        }

        let picked: Vec<Attachment> = self.picked_files.borrow_mut().drain(..).collect();
        if !picked.is_empty() {
            self.ui_state.stage_files(picked);
        }

        self.handle_dropped_files(ctx);

        if self.ui_state.is_busy() || self.ui_state.uploading() {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .selectable_label(self.ui_state.show_sidebar, "☰")
                    .on_hover_text("Conversations")
                    .clicked()
                {
                    self.ui_state.show_sidebar = !self.ui_state.show_sidebar;
                }
                ui.label(
                    RichText::new("WASM Chat")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "Bot: {} | Images: {}/{}@{}",
                        if self.config.chat.bot_id.is_empty() { "-" } else { self.config.chat.bot_id.as_str() },
                        self.config.content_store.owner,
                        self.config.content_store.repo,
                        self.config.content_store.branch,
                    ))
                    .color(theme::TEXT_SECONDARY)
                    .small(),
                );
            });
        });

        // ── Conversation sidebar ─────────────────────────────
        if self.ui_state.show_sidebar {
            let mut action = SidebarAction::None;
            SidePanel::left("sidebar_panel")
                .exact_width(theme::SIDEBAR_WIDTH)
                .show(ctx, |ui| {
                    action = sidebar::sidebar_panel(ui, &self.ui_state);
                });
            self.handle_sidebar_action(action, ctx);
        }

        // ── Main content ─────────────────────────────────────
        let mut action = ChatAction::None;
        CentralPanel::default().show(ctx, |ui| {
            action = chat::chat_panel(ui, &mut self.ui_state);
        });
        self.handle_chat_action(action, ctx);

        alert::alert_window(ctx, &mut self.ui_state);
    }
}

impl ChatApp {
    fn handle_sidebar_action(&mut self, action: SidebarAction, ctx: &egui::Context) {
        let changed = match action {
            SidebarAction::None => false,
            SidebarAction::Create => {
                self.session.create_conversation(None);
                true
            }
            SidebarAction::Select(id) => self.session.select_conversation(&id),
            SidebarAction::Delete(id) => self.session.delete_conversation(&id),
        };
        if changed {
            ctx.request_repaint();
        }
    }

    fn handle_chat_action(&mut self, action: ChatAction, ctx: &egui::Context) {
        match action {
            ChatAction::None => {}
            ChatAction::Submit { text, files } => self.dispatch_message(text, files, ctx),
            ChatAction::PickImages => self.dispatch_image_picker(ctx),
            ChatAction::PickFiles => self.dispatch_file_picker(ctx),
            ChatAction::RemovePendingImage(index) => {
                self.session.remove_pending_image(index);
                self.refresh();
            }
        }
    }

    /// Images dropped onto the window are uploaded, other files are staged
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }

        let mut images: Vec<Rc<dyn LocalFile>> = Vec::new();
        for file in dropped {
            let memory = MemoryFile::new(file.name, file.mime, file.bytes.map(|b| b.to_vec()));
            match memory.attachment().kind {
                AttachmentKind::Image => images.push(Rc::new(memory)),
                AttachmentKind::Other => self.ui_state.stage_files([memory.attachment().clone()]),
            }
        }
        if !images.is_empty() {
            self.dispatch_upload(images, ctx);
        }
    }

    /// Send the composer content to the session (async)
    fn dispatch_message(&self, text: String, files: Vec<Attachment>, ctx: &egui::Context) {
        let session = self.session.clone();
        let event_bus = self.event_bus.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = session.submit(&text, files).await {
                log::error!("Submit failed: {}", e);
                event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                });
            }
            ctx.request_repaint();
        });
    }

    fn dispatch_upload(&self, files: Vec<Rc<dyn LocalFile>>, ctx: &egui::Context) {
        let session = self.session.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            session.upload_images(&files).await;
            ctx.request_repaint();
        });
    }

    fn dispatch_image_picker(&self, ctx: &egui::Context) {
        let session = self.session.clone();
        let event_bus = self.event_bus.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            match pick_files("image/*", true).await {
                Ok(picked) if !picked.is_empty() => {
                    let files: Vec<Rc<dyn LocalFile>> = picked
                        .into_iter()
                        .map(|f| Rc::new(f) as Rc<dyn LocalFile>)
                        .collect();
                    session.upload_images(&files).await;
                }
                Ok(_) => {}
                Err(e) => event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                }),
            }
            ctx.request_repaint();
        });
    }

    fn dispatch_file_picker(&self, ctx: &egui::Context) {
        let inbox = self.picked_files.clone();
        let event_bus = self.event_bus.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            match pick_files("", true).await {
                Ok(picked) => inbox
                    .borrow_mut()
                    .extend(picked.iter().map(|f| f.attachment().clone())),
                Err(e) => event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                }),
            }
            ctx.request_repaint();
        });
    }
}

use crate::event::{AppEvent, UploadSource};
use crate::gateway::TutorGateway;
use crate::locale::{Language, Strings};
use crate::markdown::render_markdown;
use crate::session::image::UploadedImage;
use crate::session::machine::{Dispatch, Session};
use crate::session::{Message, MessageKind, Role};
use crate::theme::Theme;
use eframe::egui::{self, RichText, ScrollArea, TextureHandle, TextureOptions};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tracing::{info, warn};

enum PhotoInput {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

pub struct TutorApp {
    rx: Receiver<AppEvent>,
    tx: Sender<AppEvent>,
    runtime: Handle,
    gateway: Arc<TutorGateway>,
    session: Session,
    strings: &'static Strings,
    theme: Theme,
    theme_applied: bool,
    photo_texture: Option<TextureHandle>,
    gallery_path: String,
    loading_photo: bool,
    diagnostics_log: Vec<String>,
    scroll_to_bottom: bool,
}

impl TutorApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        tx: Sender<AppEvent>,
        runtime: Handle,
        gateway: Arc<TutorGateway>,
        language: Language,
    ) -> Self {
        Self {
            rx,
            tx,
            runtime,
            gateway,
            session: Session::new(language),
            strings: language.strings(),
            theme: Theme::default(),
            theme_applied: false,
            photo_texture: None,
            gallery_path: String::new(),
            loading_photo: false,
            diagnostics_log: Vec::new(),
            scroll_to_bottom: false,
        }
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::PhotoLoaded { source, image } => {
                self.loading_photo = false;
                match self.session.upload(image) {
                    Ok(()) => {
                        info!(%source, "photo accepted");
                        self.log_diagnostic(format!("photo accepted ({source})"));
                        self.scroll_to_bottom = true;
                    }
                    Err(err) => {
                        warn!(error = %err, "photo ignored");
                        self.log_diagnostic(format!("photo ignored: {err}"));
                    }
                }
            }
            AppEvent::PhotoRejected { source, reason } => {
                self.loading_photo = false;
                warn!(%source, %reason, "photo rejected");
                self.log_diagnostic(format!("photo rejected ({source}): {reason}"));
            }
            AppEvent::ReplyReady(reply) => {
                let task = reply.task;
                match self.session.resolve(reply) {
                    Ok(()) => {
                        self.log_diagnostic(format!("{task} reply received"));
                        self.scroll_to_bottom = true;
                    }
                    Err(err) => {
                        warn!(error = %err, "tutor reply discarded");
                        self.log_diagnostic(format!("reply discarded: {err}"));
                    }
                }
            }
        }
    }

    fn load_photo(&mut self, source: UploadSource, input: PhotoInput, ctx: &egui::Context) {
        if !self.session.controls().upload || self.loading_photo {
            self.log_diagnostic(format!("photo ({source}) ignored: a photo is already loaded"));
            return;
        }

        self.loading_photo = true;
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let event = match read_photo(input).await {
                Ok(image) => AppEvent::PhotoLoaded { source, image },
                Err(reason) => AppEvent::PhotoRejected { source, reason },
            };
            let _ = tx.send(event);
            ctx.request_repaint();
        });
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };

        let input = match (file.bytes, file.path) {
            (Some(bytes), _) => PhotoInput::Bytes(bytes),
            (None, Some(path)) => PhotoInput::Path(path),
            (None, None) => {
                self.log_diagnostic(format!(
                    "dropped file `{}` has no readable content",
                    file.name
                ));
                return;
            }
        };
        self.load_photo(UploadSource::Dropped, input, ctx);
    }

    fn open_gallery_path(&mut self, ctx: &egui::Context) {
        let path = self.gallery_path.trim();
        if path.is_empty() {
            return;
        }
        let input = PhotoInput::Path(PathBuf::from(path));
        self.load_photo(UploadSource::Picked, input, ctx);
    }

    /// Keeps the GPU copy of the photo in step with the session.
    fn sync_photo_texture(&mut self, ctx: &egui::Context) {
        match (self.session.image(), self.photo_texture.is_some()) {
            (Some(image), false) => {
                let preview = image.preview();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [preview.width, preview.height],
                    &preview.rgba,
                );
                self.photo_texture =
                    Some(ctx.load_texture("student-photo", color_image, TextureOptions::LINEAR));
            }
            (None, true) => self.photo_texture = None,
            _ => {}
        }
    }

    fn dispatch(&self, dispatch: Dispatch, ctx: &egui::Context) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let reply = gateway.answer(dispatch).await;
            let _ = tx.send(AppEvent::ReplyReady(reply));
            ctx.request_repaint();
        });
    }

    fn request_hint(&mut self, ctx: &egui::Context) {
        match self.session.request_hint() {
            Ok(dispatch) => {
                self.log_diagnostic("hint requested");
                self.dispatch(dispatch, ctx);
                self.scroll_to_bottom = true;
            }
            Err(err) => self.log_diagnostic(format!("hint request rejected: {err}")),
        }
    }

    fn request_analysis(&mut self, ctx: &egui::Context) {
        match self.session.request_analysis() {
            Ok(dispatch) => {
                self.log_diagnostic("full analysis requested");
                self.dispatch(dispatch, ctx);
                self.scroll_to_bottom = true;
            }
            Err(err) => self.log_diagnostic(format!("analysis request rejected: {err}")),
        }
    }

    fn reset(&mut self) {
        self.session.reset();
        self.photo_texture = None;
        self.gallery_path.clear();
        self.log_diagnostic("session reset");
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let state = self.session.state();
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong(self.strings.app_title);
                ui.separator();
                ui.label(RichText::new(state.as_str()).color(self.theme.text_muted).small());
            });
        });
    }

    fn render_diagnostics(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("diagnostics_panel").show(ctx, |ui| {
            egui::CollapsingHeader::new(self.strings.diagnostics)
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(RichText::new(entry).small().color(self.theme.text_muted));
                            }
                        });
                });
        });
    }

    fn render_welcome(&mut self, ctx: &egui::Context) {
        let hovered = ctx.input(|input| !input.raw.hovered_files.is_empty());
        let mut open_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space((ui.available_height() * 0.15).max(12.0));
                ui.set_max_width(420.0);
                self.theme.card_frame().show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading(RichText::new(self.strings.welcome_title).strong());
                        let blurb =
                            RichText::new(self.strings.welcome_blurb).color(self.theme.text_muted);
                        ui.label(blurb);
                        ui.add_space(12.0);

                        self.theme.drop_zone_frame(hovered).show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.vertical_centered(|ui| {
                                if self.loading_photo {
                                    ui.spinner();
                                    ui.label(self.strings.loading_photo);
                                } else if hovered {
                                    ui.strong(self.strings.drop_photo_hovered);
                                } else {
                                    let prompt = RichText::new(self.strings.drop_photo)
                                        .color(self.theme.accent);
                                    ui.strong(prompt);
                                }
                            });
                        });

                        ui.add_space(8.0);
                        ui.label(
                            RichText::new(self.strings.gallery_hint)
                                .small()
                                .color(self.theme.text_muted),
                        );
                        ui.horizontal(|ui| {
                            let field_width = (ui.available_width() - 90.0).max(120.0);
                            let response = ui.add_enabled(
                                !self.loading_photo,
                                egui::TextEdit::singleline(&mut self.gallery_path)
                                    .desired_width(field_width)
                                    .hint_text("/path/to/solution.jpg"),
                            );
                            let submitted = ui.input(|i| i.key_pressed(egui::Key::Enter));
                            if response.lost_focus() && submitted {
                                open_clicked = true;
                            }
                            let can_open =
                                !self.loading_photo && !self.gallery_path.trim().is_empty();
                            open_clicked |= ui
                                .add_enabled(can_open, egui::Button::new(self.strings.gallery_open))
                                .clicked();
                        });
                    });
                });
            });
        });

        if open_clicked {
            self.open_gallery_path(ctx);
        }
    }

    fn render_controls(&mut self, ctx: &egui::Context) {
        let controls = self.session.controls();
        let mut hint_clicked = false;
        let mut analysis_clicked = false;
        let mut reset_clicked = false;

        egui::TopBottomPanel::bottom("controls_panel")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                self.theme.controls_frame().show(ui, |ui| {
                    let width = ui.available_width();
                    let height = self.theme.button_height;
                    if controls.request_hint {
                        let button =
                            self.theme.action_button(self.strings.give_hint, self.theme.accent);
                        hint_clicked = ui.add_sized([width, height], button).clicked();
                    }
                    if controls.busy {
                        ui.vertical_centered(|ui| {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                let status = RichText::new(self.strings.analysing)
                                    .color(self.theme.text_muted);
                                ui.label(status);
                            });
                        });
                    }
                    if controls.request_analysis {
                        ui.columns(2, |columns| {
                            let half = columns[0].available_width();
                            let new_photo = self.theme.secondary_button(self.strings.new_photo);
                            reset_clicked = columns[0]
                                .add_sized([half, height], new_photo)
                                .clicked();
                            let analysis = self
                                .theme
                                .action_button(self.strings.hint_did_not_help, self.theme.warning);
                            analysis_clicked = columns[1]
                                .add_sized([half, height], analysis)
                                .clicked();
                        });
                    } else if controls.reset {
                        let button =
                            self.theme.action_button(self.strings.next_problem, self.theme.success);
                        reset_clicked = ui.add_sized([width, height], button).clicked();
                    }
                });
                ui.add_space(6.0);
            });

        if hint_clicked {
            self.request_hint(ctx);
        }
        if analysis_clicked {
            self.request_analysis(ctx);
        }
        if reset_clicked {
            self.reset();
        }
    }

    fn render_transcript(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for message in self.session.transcript().messages() {
                        self.render_message(ui, message);
                        ui.add_space(4.0);
                    }
                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
        });
        self.scroll_to_bottom = false;
    }

    fn render_message(&self, ui: &mut egui::Ui, message: &Message) {
        let layout = match message.role {
            Role::Student => egui::Layout::right_to_left(egui::Align::TOP),
            Role::Tutor => egui::Layout::left_to_right(egui::Align::TOP),
        };
        let text_color = self.theme.bubble_text_color(message.role);

        ui.with_layout(layout, |ui| {
            self.theme.bubble_frame(message.role).show(ui, |ui| {
                ui.set_max_width(self.theme.bubble_max_width);
                match message.kind {
                    MessageKind::Image => {
                        ui.with_layout(egui::Layout::top_down(egui::Align::LEFT), |ui| {
                            let caption = RichText::new(self.strings.my_solution).strong();
                            ui.label(caption.color(text_color));
                            match &self.photo_texture {
                                Some(texture) => {
                                    let sized = egui::load::SizedTexture::from_handle(texture);
                                    ui.add(
                                        egui::Image::from_texture(sized)
                                            .max_width(self.theme.bubble_max_width * 0.7)
                                            .corner_radius(egui::CornerRadius::same(10)),
                                    );
                                }
                                None => {
                                    ui.label(RichText::new("📷").color(text_color));
                                }
                            }
                        });
                    }
                    MessageKind::Text if message.is_pending => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            let thinking = RichText::new(self.strings.tutor_thinking)
                                .color(self.theme.text_muted);
                            ui.label(thinking);
                        });
                    }
                    MessageKind::Text => {
                        ui.with_layout(egui::Layout::top_down(egui::Align::LEFT), |ui| {
                            render_markdown(ui, &message.content, text_color);
                        });
                    }
                }
            });
        });
    }
}

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }

        self.drain_events();
        self.handle_dropped_files(ctx);
        self.sync_photo_texture(ctx);

        self.render_top_bar(ctx);
        self.render_diagnostics(ctx);
        if self.session.transcript().is_empty() {
            self.render_welcome(ctx);
        } else {
            self.render_controls(ctx);
            self.render_transcript(ctx);
        }
    }
}

async fn read_photo(input: PhotoInput) -> Result<UploadedImage, String> {
    let bytes: Arc<[u8]> = match input {
        PhotoInput::Bytes(bytes) => bytes,
        PhotoInput::Path(path) => tokio::fs::read(&path)
            .await
            .map(Arc::from)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?,
    };

    tokio::task::spawn_blocking(move || UploadedImage::decode(&bytes))
        .await
        .map_err(|err| format!("photo decoding task failed: {err}"))?
        .map_err(|err| err.to_string())
}

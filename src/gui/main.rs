#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use eframe::egui;

use gallery_ai::ai::gemini::GeminiService;
use gallery_ai::ai::{AiService, AspectRatio, fetch_image};
use gallery_ai::config::{API_KEY_VAR, Config};
use gallery_ai::flow::{self, AnalysisOutcome, FlowState, GenerationOutcome};
use gallery_ai::gallery::{Gallery, ImageRecord};
use gallery_ai::ingest::{self, IMAGE_EXTENSIONS};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1100.0, 720.0])
        .with_min_inner_size([800.0, 500.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "gallery-ai",
        options,
        Box::new(|cc| Ok(Box::new(App::new(cc)))),
    )
}

// ── Messages sent from background tasks to the UI ───────────────────

enum BgMessage {
    /// One upload finished; `Err` carries the read failure.
    Uploaded(Result<ImageRecord, String>),
    /// The generation flow finished.
    GenerationDone(GenerationOutcome),
    /// The analysis flow finished for one record.
    AnalysisDone { id: String, outcome: AnalysisOutcome },
    /// Bytes for a remote-URL record arrived (or failed to).
    ImageFetched {
        id: String,
        kind: TextureKind,
        result: Result<Vec<u8>, String>,
    },
}

// ── Texture cache ───────────────────────────────────────────────────

/// Which rendition of a record a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextureKind {
    /// Grid-sized rendition, from `thumbnail_url`.
    Thumbnail,
    /// Full-size rendition, from `url`.
    Full,
}

enum TextureState {
    /// A remote fetch is in flight.
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

fn texture_from_bytes(ctx: &egui::Context, name: &str, bytes: &[u8]) -> Option<egui::TextureHandle> {
    let img = image::load_from_memory(bytes).ok()?;
    let size = [img.width() as usize, img.height() as usize];
    let rgba = img.to_rgba8();
    let pixels = rgba.as_flat_samples();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    Some(ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR))
}

// ── Main application state ──────────────────────────────────────────

struct App {
    gallery: Gallery,
    service: Arc<dyn AiService>,
    /// Decoded image textures, keyed by record id and rendition.
    textures: HashMap<(String, TextureKind), TextureState>,
    prompt: String,
    aspect_ratio: AspectRatio,
    show_generate: bool,
    show_info: bool,
    generation: FlowState,
    analysis: FlowState,
    pending_uploads: usize,
    status: String,
    rx: mpsc::Receiver<BgMessage>,
    tx: mpsc::Sender<BgMessage>,
    /// Tokio runtime for async tasks.
    rt: tokio::runtime::Runtime,
}

impl App {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (tx, rx) = mpsc::channel();
        let config = Config::from_env();

        let status = if config.has_credential() {
            "Ready — drop images or click Upload".to_string()
        } else {
            format!("Ready — set {API_KEY_VAR} to enable AI features")
        };

        Self {
            gallery: Gallery::with_samples(),
            service: Arc::new(GeminiService::new(&config)),
            textures: HashMap::new(),
            prompt: String::new(),
            aspect_ratio: AspectRatio::Square,
            show_generate: false,
            show_info: false,
            generation: FlowState::Idle,
            analysis: FlowState::Idle,
            pending_uploads: 0,
            status,
            rx,
            tx,
            rt: tokio::runtime::Runtime::new().expect("Failed to create tokio runtime"),
        }
    }

    fn is_busy(&self) -> bool {
        self.pending_uploads > 0
            || self.generation.is_pending()
            || self.analysis.is_pending()
            || self
                .textures
                .values()
                .any(|t| matches!(t, TextureState::Loading))
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_messages(ctx);

        // Request repaint while background work is outstanding so we pick
        // up messages promptly.
        if self.is_busy() {
            ctx.request_repaint();
        }

        // Handle dropped files
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.start_uploads(dropped);
        }

        // Keyboard navigation, only while the viewer is open
        if self.gallery.selected_id().is_some() {
            let (escape, right, left) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::Escape),
                    i.key_pressed(egui::Key::ArrowRight),
                    i.key_pressed(egui::Key::ArrowLeft),
                )
            });
            if escape {
                self.gallery.select(None);
            } else if right {
                self.gallery.next();
            } else if left {
                self.gallery.prev();
            }
        }

        self.show_toolbar(ctx);
        self.show_generate_window(ctx);

        match self.gallery.selected().cloned() {
            Some(record) => self.show_viewer(ctx, &record),
            None => self.show_grid(ctx),
        }
    }
}

// ── Background work ─────────────────────────────────────────────────

impl App {
    fn open_files(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_files()
        {
            self.start_uploads(paths);
        }
    }

    fn start_uploads(&mut self, paths: Vec<PathBuf>) {
        let files = ingest::collect_images(&paths);
        if files.is_empty() {
            return;
        }
        log::info!("Ingesting {} file(s)", files.len());
        self.pending_uploads += files.len();
        self.status = format!("Ingesting {} file(s)...", files.len());

        // Each file is read independently; completion order decides the
        // relative order of a batch in the gallery.
        for path in files {
            let tx = self.tx.clone();
            self.rt.spawn(async move {
                let result = ingest::record_from_file(&path)
                    .await
                    .map_err(|e| e.to_string());
                let _ = tx.send(BgMessage::Uploaded(result));
            });
        }
    }

    fn start_generation(&mut self) {
        if self.generation.is_pending() {
            return;
        }
        self.generation = FlowState::Pending;
        self.status = "Generating image...".into();

        let service = self.service.clone();
        let prompt = self.prompt.clone();
        let aspect_ratio = self.aspect_ratio;
        let tx = self.tx.clone();

        self.rt.spawn(async move {
            let outcome = flow::generate_image(service.as_ref(), &prompt, aspect_ratio).await;
            let _ = tx.send(BgMessage::GenerationDone(outcome));
        });
    }

    fn start_analysis(&mut self, regenerate: bool) {
        if self.analysis.is_pending() {
            return;
        }
        let Some(record) = self.gallery.selected().cloned() else {
            return;
        };
        self.analysis = FlowState::Pending;
        self.status = "Analyzing image...".into();

        let service = self.service.clone();
        let tx = self.tx.clone();

        self.rt.spawn(async move {
            let outcome = flow::analyze_record(service.as_ref(), &record, regenerate).await;
            let _ = tx.send(BgMessage::AnalysisDone {
                id: record.id,
                outcome,
            });
        });
    }

    /// Make sure a texture exists (or is on its way) for one rendition of
    /// a record. Embedded payloads decode immediately; remote URLs are
    /// fetched in the background.
    fn ensure_texture(&mut self, ctx: &egui::Context, id: &str, kind: TextureKind) {
        if self.textures.contains_key(&(id.to_string(), kind)) {
            return;
        }
        let Some(record) = self.gallery.get(id) else {
            return;
        };
        let data = record.base64_data.clone();
        let url = match kind {
            TextureKind::Thumbnail => record.thumbnail_url.clone(),
            TextureKind::Full => record.url.clone(),
        };

        let state = if let Some(data) = data {
            match STANDARD.decode(&data) {
                Ok(bytes) => match texture_from_bytes(ctx, id, &bytes) {
                    Some(texture) => TextureState::Ready(texture),
                    None => TextureState::Failed,
                },
                Err(e) => {
                    log::warn!("Invalid base64 payload for record {id}: {e}");
                    TextureState::Failed
                }
            }
        } else {
            let tx = self.tx.clone();
            let id = id.to_string();
            self.rt.spawn(async move {
                let result = fetch_image(&url)
                    .await
                    .map(|(bytes, _)| bytes)
                    .map_err(|e| e.to_string());
                let _ = tx.send(BgMessage::ImageFetched { id, kind, result });
            });
            TextureState::Loading
        };

        self.textures.insert((id.to_string(), kind), state);
    }

    fn poll_messages(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                BgMessage::Uploaded(Ok(record)) => {
                    self.pending_uploads = self.pending_uploads.saturating_sub(1);
                    self.gallery.insert_front(record);
                    if self.pending_uploads == 0 {
                        self.status = format!("{} image(s) in gallery", self.gallery.len());
                    }
                }
                BgMessage::Uploaded(Err(e)) => {
                    self.pending_uploads = self.pending_uploads.saturating_sub(1);
                    log::warn!("Upload failed: {e}");
                    self.status = format!("Upload failed: {e}");
                }
                BgMessage::GenerationDone(outcome) => match outcome {
                    GenerationOutcome::Generated(record) => {
                        self.generation = FlowState::Succeeded;
                        self.prompt.clear();
                        self.show_generate = false;
                        self.status = format!("Generated \"{}\"", record.title);
                        self.gallery.insert_front(record);
                    }
                    GenerationOutcome::Failed(message) => {
                        self.status = "Generation failed".into();
                        self.generation = FlowState::Failed(message);
                    }
                    GenerationOutcome::SkippedEmptyPrompt => {
                        self.generation = FlowState::Idle;
                    }
                },
                BgMessage::AnalysisDone { id, outcome } => {
                    self.analysis = match &outcome {
                        AnalysisOutcome::Failed(text) => {
                            self.status = "Analysis failed".into();
                            FlowState::Failed(text.clone())
                        }
                        _ => {
                            self.status = "Description ready".into();
                            FlowState::Succeeded
                        }
                    };
                    self.gallery.set_description(&id, outcome.text().to_string());
                }
                BgMessage::ImageFetched { id, kind, result } => {
                    let state = match result {
                        Ok(bytes) => match texture_from_bytes(ctx, &id, &bytes) {
                            Some(texture) => TextureState::Ready(texture),
                            None => TextureState::Failed,
                        },
                        Err(e) => {
                            log::warn!("Image fetch failed for record {id}: {e}");
                            TextureState::Failed
                        }
                    };
                    self.textures.insert((id, kind), state);
                }
            }
        }
    }
}

// ── Panels ──────────────────────────────────────────────────────────

const THUMB_SIZE: f32 = 180.0;

impl App {
    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("gallery-ai");
                ui.separator();

                if ui.button("📂 Upload").clicked() {
                    self.open_files();
                }
                if ui
                    .add_enabled(!self.generation.is_pending(), egui::Button::new("✨ Generate"))
                    .clicked()
                {
                    self.show_generate = true;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.is_busy() {
                        ui.spinner();
                    }
                    ui.label(&self.status);
                });
            });
            ui.add_space(4.0);
        });
    }

    /// Rendition the grid shows for a record. Records with an embedded
    /// payload reuse the full image; their thumbnail reference is the
    /// same data URL.
    fn grid_kind(record: &ImageRecord) -> TextureKind {
        if record.base64_data.is_some() {
            TextureKind::Full
        } else {
            TextureKind::Thumbnail
        }
    }

    fn show_grid(&mut self, ctx: &egui::Context) {
        let entries: Vec<(String, TextureKind)> = self
            .gallery
            .records()
            .iter()
            .map(|r| (r.id.clone(), Self::grid_kind(r)))
            .collect();
        for (id, kind) in &entries {
            self.ensure_texture(ctx, id, *kind);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if entries.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new("Drop images here\nor click Upload")
                            .size(16.0)
                            .color(egui::Color32::GRAY),
                    );
                });
                return;
            }

            let mut clicked: Option<String> = None;
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add_space(8.0);
                    ui.horizontal_wrapped(|ui| {
                        for (id, kind) in &entries {
                            self.show_thumbnail(ui, id, *kind, &mut clicked);
                        }
                    });
                });
            if let Some(id) = clicked {
                self.gallery.select(Some(&id));
            }
        });
    }

    fn show_thumbnail(
        &self,
        ui: &mut egui::Ui,
        id: &str,
        kind: TextureKind,
        clicked: &mut Option<String>,
    ) {
        let title = self
            .gallery
            .get(id)
            .map(|r| r.title.clone())
            .unwrap_or_default();

        match self.textures.get(&(id.to_string(), kind)) {
            Some(TextureState::Ready(texture)) => {
                let size = texture.size_vec2();
                let scale = (THUMB_SIZE / size.x).min(THUMB_SIZE / size.y);
                let resp = ui
                    .add(
                        egui::Image::new(egui::load::SizedTexture::new(texture.id(), size * scale))
                            .sense(egui::Sense::click()),
                    )
                    .on_hover_text(&title);
                if resp.clicked() {
                    *clicked = Some(id.to_string());
                }
            }
            Some(TextureState::Loading) | None => {
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(THUMB_SIZE, THUMB_SIZE), egui::Sense::hover());
                ui.put(rect, egui::Spinner::new());
            }
            Some(TextureState::Failed) => {
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(THUMB_SIZE, THUMB_SIZE), egui::Sense::hover());
                ui.put(rect, egui::Label::new("⚠"));
            }
        }
    }

    fn show_viewer(&mut self, ctx: &egui::Context, record: &ImageRecord) {
        self.ensure_texture(ctx, &record.id, TextureKind::Full);

        if self.show_info {
            egui::SidePanel::right("info_panel")
                .default_width(300.0)
                .min_width(240.0)
                .show(ctx, |ui| self.show_info_panel(ui, record));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("✖ Close").clicked() {
                    self.gallery.select(None);
                }
                ui.separator();
                ui.label(egui::RichText::new(&record.title).strong());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(self.gallery.has_next(), egui::Button::new("Next ▶"))
                        .clicked()
                    {
                        self.gallery.next();
                    }
                    if ui
                        .add_enabled(self.gallery.has_prev(), egui::Button::new("◀ Prev"))
                        .clicked()
                    {
                        self.gallery.prev();
                    }
                    ui.separator();
                    ui.toggle_value(&mut self.show_info, "ℹ Info");
                });
            });
            ui.separator();

            match self.textures.get(&(record.id.clone(), TextureKind::Full)) {
                Some(TextureState::Ready(texture)) => {
                    let size = texture.size_vec2();
                    let avail = ui.available_size();
                    let scale = (avail.x / size.x).min(avail.y / size.y);
                    ui.centered_and_justified(|ui| {
                        ui.image(egui::load::SizedTexture::new(texture.id(), size * scale));
                    });
                }
                Some(TextureState::Loading) | None => {
                    ui.centered_and_justified(|ui| ui.spinner());
                }
                Some(TextureState::Failed) => {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            egui::RichText::new("Could not load image").color(egui::Color32::GRAY),
                        );
                    });
                }
            }
        });
    }

    fn show_info_panel(&mut self, ui: &mut egui::Ui, record: &ImageRecord) {
        ui.add_space(4.0);
        ui.heading("Details");
        ui.add_space(4.0);
        ui.label(format!(
            "Created: {}",
            record.created_at.format("%Y-%m-%d %H:%M")
        ));
        ui.label(format!("Source: {}", record.origin.as_str()));

        ui.add_space(8.0);
        ui.separator();
        ui.add_space(8.0);

        ui.label(egui::RichText::new(format!("✨ {} Analysis", self.service.name())).strong());
        ui.add_space(8.0);

        if self.analysis.is_pending() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analyzing visual data...");
            });
            return;
        }

        match &record.description {
            Some(description) => {
                egui::ScrollArea::vertical()
                    .max_height(320.0)
                    .show(ui, |ui| {
                        ui.label(description);
                    });
                ui.add_space(8.0);
                if ui.button("🔄 Regenerate Analysis").clicked() {
                    self.start_analysis(true);
                }
            }
            None => {
                if ui.button("✨ Analyze Image").clicked() {
                    self.start_analysis(false);
                }
            }
        }
    }

    fn show_generate_window(&mut self, ctx: &egui::Context) {
        if !self.show_generate {
            return;
        }
        let mut open = true;

        egui::Window::new(format!("✨ Generate with {}", self.service.name()))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(420.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let pending = self.generation.is_pending();

                ui.label("Prompt");
                ui.add_enabled(
                    !pending,
                    egui::TextEdit::multiline(&mut self.prompt)
                        .hint_text(
                            "A futuristic city with flying cars, neon lights, cyberpunk style...",
                        )
                        .desired_rows(4)
                        .desired_width(f32::INFINITY),
                );
                ui.add_space(4.0);

                ui.horizontal(|ui| {
                    ui.label("Aspect ratio:");
                    egui::ComboBox::from_id_salt("aspect_ratio")
                        .selected_text(self.aspect_ratio.as_str())
                        .show_ui(ui, |ui| {
                            for ratio in AspectRatio::ALL {
                                ui.selectable_value(&mut self.aspect_ratio, ratio, ratio.as_str());
                            }
                        });
                });

                if let FlowState::Failed(message) = &self.generation {
                    ui.add_space(4.0);
                    ui.colored_label(egui::Color32::from_rgb(220, 50, 50), message);
                }

                ui.add_space(8.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let can_generate = !pending && !self.prompt.trim().is_empty();
                    if ui
                        .add_enabled(can_generate, egui::Button::new("✨ Generate"))
                        .clicked()
                    {
                        self.start_generation();
                    }
                    if pending {
                        ui.spinner();
                        ui.label("Generating...");
                    }
                });
            });

        if !open {
            self.show_generate = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery_ai::gallery::Origin;

    #[test]
    fn grid_loads_thumbnails_for_remote_records() {
        let gallery = Gallery::with_samples();
        for record in gallery.records() {
            assert_eq!(App::grid_kind(record), TextureKind::Thumbnail);
        }
    }

    #[test]
    fn grid_reuses_embedded_images() {
        let record = ImageRecord::from_encoded(
            "tiny".to_string(),
            "image/png",
            "AAAA".to_string(),
            Origin::Upload,
        );
        assert_eq!(App::grid_kind(&record), TextureKind::Full);
        assert_eq!(record.thumbnail_url, record.url);
    }

    #[test]
    fn textures_decode_from_image_bytes() {
        let mut png = Vec::new();
        image::RgbaImage::new(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let ctx = egui::Context::default();
        let texture = texture_from_bytes(&ctx, "tiny", &png).unwrap();
        assert_eq!(texture.size(), [2, 2]);

        assert!(texture_from_bytes(&ctx, "junk", b"not an image").is_none());
    }
}

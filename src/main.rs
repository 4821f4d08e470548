mod catalog;
mod command;
mod constants;
mod export;
mod fetch;
mod geometry;
mod image_cache;
mod input;
mod layer_state;
mod renderer;

use catalog::{Catalog, LayerKind};
use command::{Command, Event, StartupConfig};
use constants::{
    CANVAS_HEIGHT, CANVAS_WIDTH, COLOR_ERROR_BANNER, COLOR_TOOLBAR_BG, EXPORT_FILE_NAME,
    EXPORT_FILE_NAME_TRANSPARENT, INITIAL_WINDOW_HEIGHT, INITIAL_WINDOW_WIDTH,
};
use eframe::egui::{self, vec2, Color32, CursorIcon, Pos2, Rect, RichText, Vec2};
use fetch::{FsFetcher, ImageFetcher};
use image_cache::ImageCache;
use input::{HoverFeedback, InputController};
use layer_state::LayerStore;
use renderer::Caption;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let launch = match Launch::from_args(std::env::args().skip(1)) {
        Ok(launch) => launch,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([INITIAL_WINDOW_WIDTH, INITIAL_WINDOW_HEIGHT]),
        ..Default::default()
    };

    eframe::run_native(
        "Bani Meme Generator",
        options,
        Box::new(move |_cc| Ok(Box::new(MemeApp::new(launch)?))),
    )
}

/// Everything decided on the command line before the window opens.
struct Launch {
    catalog_path: Option<PathBuf>,
    asset_root: PathBuf,
    startup: StartupConfig,
}

impl Launch {
    fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut launch = Launch {
            catalog_path: None,
            asset_root: PathBuf::from("assets"),
            startup: StartupConfig::default(),
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--catalog" => {
                    let path = args.next().ok_or("--catalog requires a file path")?;
                    launch.catalog_path = Some(PathBuf::from(path));
                }
                "--assets" => {
                    let path = args.next().ok_or("--assets requires a directory path")?;
                    launch.asset_root = PathBuf::from(path);
                }
                query if !query.starts_with("--") => {
                    launch.startup = StartupConfig::from_query(query);
                }
                unknown => return Err(format!("unknown argument: {unknown}")),
            }
        }
        Ok(launch)
    }
}

struct MemeApp {
    catalog: Catalog,
    cache: ImageCache,
    store: LayerStore,
    controller: InputController,
    caption: Caption,
    commands: Receiver<Command>,
    /// Applied once the preload settles, then cleared.
    startup: Option<StartupConfig>,
    ready_emitted: bool,
    /// Live touch points, for two-finger pinch tracking.
    touches: BTreeMap<u64, Pos2>,
    last_error: Option<String>,
}

impl MemeApp {
    fn new(launch: Launch) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let catalog = match &launch.catalog_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
                Catalog::from_json(&json)?
            }
            None => Catalog::builtin(),
        };

        let fetcher: Arc<dyn ImageFetcher> = Arc::new(FsFetcher::new(launch.asset_root));
        let mut cache = ImageCache::new();
        cache.preload(&catalog, fetcher);
        log::info!("preloading {} catalog images", catalog.total_entries());

        Ok(Self {
            catalog,
            cache,
            store: LayerStore::new(vec2(CANVAS_WIDTH, CANVAS_HEIGHT)),
            controller: InputController::new(),
            caption: Caption::default(),
            commands: command::start_stdin_listener(),
            startup: Some(launch.startup).filter(|config| !config.is_empty()),
            ready_emitted: false,
            touches: BTreeMap::new(),
            last_error: None,
        })
    }

    fn select_or_clear(&mut self, kind: LayerKind, index: Option<usize>) {
        match index {
            Some(index) if self.catalog.entry(kind, index).is_some() => {
                self.store.select(kind, index);
            }
            Some(index) => {
                log::warn!("ignoring out-of-range {} index {index}", kind.name());
            }
            None => self.store.clear(kind),
        }
    }

    fn apply_startup(&mut self, config: StartupConfig) {
        self.select_or_clear(LayerKind::Background, config.background);
        self.select_or_clear(LayerKind::Pose, config.pose);
        self.select_or_clear(LayerKind::Charm, config.charm);
        if let Some(top) = config.top_text {
            self.caption.top = top;
        }
        if let Some(bottom) = config.bottom_text {
            self.caption.bottom = bottom;
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::Download => self.export(false, false),
            Command::SetText { top, bottom } => {
                self.caption = Caption { top, bottom };
            }
            Command::SetLayers {
                background,
                pose,
                charm,
            } => {
                self.select_or_clear(LayerKind::Background, background);
                self.select_or_clear(LayerKind::Pose, pose);
                self.select_or_clear(LayerKind::Charm, charm);
            }
        }
    }

    fn export(&mut self, transparent: bool, hires: bool) {
        let result = if hires {
            export::compose_hires(&self.store, &self.cache, &self.caption, !transparent)
        } else {
            export::compose(
                self.store.canvas(),
                &self.store,
                &self.cache,
                &self.caption,
                !transparent,
            )
        };
        let image = match result {
            Ok(image) => image,
            Err(err) => {
                log::error!("export failed: {err}");
                self.last_error = Some(err);
                return;
            }
        };

        let default_name = if transparent {
            EXPORT_FILE_NAME_TRANSPARENT
        } else {
            EXPORT_FILE_NAME
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(default_name)
            .add_filter("PNG image", &["png"])
            .save_file()
        else {
            return;
        };

        match export::encode_png(&image)
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(|err| err.to_string()))
        {
            Ok(()) => {
                log::info!("exported {}", path.display());
                self.last_error = None;
                Event::ImageGenerated {
                    path: path.display().to_string(),
                }
                .emit();
            }
            Err(err) => {
                log::error!("failed to write {}: {err}", path.display());
                self.last_error = Some(err);
            }
        }
    }

    /// Feed raw pointer and touch input to the gesture machine, in canvas
    /// coordinates.
    fn handle_canvas_input(&mut self, ctx: &egui::Context, canvas_rect: Rect) {
        let input = ctx.input(|i| i.clone());
        let to_canvas = |pos: Pos2| pos - canvas_rect.min.to_vec2();

        let mut touch_count_before = self.touches.len();
        for event in &input.events {
            let egui::Event::Touch { id, phase, pos, .. } = event else {
                continue;
            };
            match phase {
                egui::TouchPhase::Start | egui::TouchPhase::Move => {
                    self.touches.insert(id.0, *pos);
                }
                egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                    self.touches.remove(&id.0);
                    self.controller.pointer_up(&mut self.store);
                    touch_count_before = 0;
                }
            }
        }
        if self.touches.len() == 2 {
            let mut points = self.touches.values().copied();
            if let (Some(p0), Some(p1)) = (points.next(), points.next()) {
                let (p0, p1) = (to_canvas(p0), to_canvas(p1));
                if touch_count_before < 2 {
                    self.controller.pinch_start(p0, p1, &mut self.store);
                } else {
                    self.controller.pinch_move(p0, p1, &mut self.store);
                }
            }
            return;
        }

        if input.pointer.primary_pressed() {
            if let Some(pos) = input.pointer.interact_pos() {
                if canvas_rect.contains(pos) {
                    self.controller
                        .pointer_down(to_canvas(pos), input.time, &mut self.store);
                }
            }
        }
        if input.pointer.primary_down() {
            if let Some(pos) = input.pointer.hover_pos() {
                self.controller.pointer_move(to_canvas(pos), &mut self.store);
            }
        }
        let pointer_gone = input
            .events
            .iter()
            .any(|event| matches!(event, egui::Event::PointerGone));
        if input.pointer.primary_released() || pointer_gone || !input.focused {
            self.controller.pointer_up(&mut self.store);
        }

        // Cursor feedback while no gesture is active.
        if self.controller.gesture() == input::Gesture::Idle {
            if let Some(pos) = input.pointer.hover_pos() {
                if canvas_rect.contains(pos) {
                    let icon = match self.controller.hover(to_canvas(pos), &self.store) {
                        HoverFeedback::ResizeNwSe => CursorIcon::ResizeNwSe,
                        HoverFeedback::ResizeNeSw => CursorIcon::ResizeNeSw,
                        HoverFeedback::Move => CursorIcon::Move,
                        HoverFeedback::None => CursorIcon::Default,
                    };
                    ctx.set_cursor_icon(icon);
                }
            }
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context) {
        let can_export = !self.cache.is_loading() && !self.store.is_empty();
        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::default()
                    .fill(COLOR_TOOLBAR_BG)
                    .inner_margin(4.0),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.add_space(8.0);
                    ui.label(
                        RichText::new("Bani Meme Generator")
                            .size(18.0)
                            .color(Color32::WHITE),
                    );
                    ui.add_space(16.0);

                    let export_button = |label: &str| {
                        egui::Button::new(RichText::new(label).size(16.0).color(Color32::WHITE))
                            .min_size(Vec2::new(32.0, 28.0))
                            .frame(false)
                    };
                    if ui
                        .add_enabled(can_export, export_button("💾 Save"))
                        .on_hover_text("Export as PNG")
                        .clicked()
                    {
                        self.export(false, false);
                    }
                    if ui
                        .add_enabled(can_export, export_button("👻 Transparent"))
                        .on_hover_text("Export without the background layer")
                        .clicked()
                    {
                        self.export(true, false);
                    }
                    if ui
                        .add_enabled(can_export, export_button("🔍 Hi-res"))
                        .on_hover_text("Export at high resolution")
                        .clicked()
                    {
                        self.export(false, true);
                    }

                    if self.cache.is_loading() {
                        ui.add_space(16.0);
                        ui.add(egui::Spinner::new().color(Color32::WHITE));
                        ui.label(RichText::new("loading images…").color(Color32::GRAY));
                    }
                });
            });
    }

    fn selection_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("selection").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                for kind in LayerKind::DRAW_ORDER {
                    self.layer_combo(ui, kind);
                    ui.add_space(12.0);
                }
            });
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label("Top text:");
                ui.add(egui::TextEdit::singleline(&mut self.caption.top).desired_width(180.0));
                ui.add_space(12.0);
                ui.label("Bottom text:");
                ui.add(egui::TextEdit::singleline(&mut self.caption.bottom).desired_width(180.0));
            });
            if let Some(err) = &self.last_error {
                ui.colored_label(COLOR_ERROR_BANNER, err);
            }
            ui.add_space(4.0);
        });
    }

    fn layer_combo(&mut self, ui: &mut egui::Ui, kind: LayerKind) {
        let mut selected = self.store.selection(kind);
        let current_label = selected
            .and_then(|index| self.catalog.entry(kind, index))
            .map(|entry| entry.label.clone())
            .unwrap_or_else(|| "None".to_string());

        ui.label(kind.name());
        egui::ComboBox::from_id_salt(kind.name())
            .selected_text(current_label)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut selected, None, "None");
                for (index, entry) in self.catalog.entries(kind).iter().enumerate() {
                    ui.selectable_value(&mut selected, Some(index), &entry.label);
                }
            });
        if selected != self.store.selection(kind) {
            self.select_or_clear(kind, selected);
        }
    }
}

impl eframe::App for MemeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.cache.poll() {
            ctx.request_repaint();
        }
        if !self.cache.is_loading() && !self.ready_emitted {
            self.ready_emitted = true;
            if let Some(config) = self.startup.take() {
                self.apply_startup(config);
            }
            Event::Ready.emit();
        }

        while let Ok(command) = self.commands.try_recv() {
            log::debug!("applying host command: {command:?}");
            self.apply_command(command);
        }

        self.toolbar(ctx);

        if self.cache.all_failed() {
            egui::TopBottomPanel::top("load-error")
                .frame(egui::Frame::default().fill(COLOR_ERROR_BANNER).inner_margin(6.0))
                .show(ctx, |ui| {
                    ui.colored_label(
                        Color32::WHITE,
                        "No catalog images could be loaded. Check the asset directory.",
                    );
                });
        }

        self.selection_panel(ctx);
        self.store.sync(&self.catalog, &self.cache);

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            let canvas_rect = Rect::from_center_size(
                available.center(),
                vec2(CANVAS_WIDTH, CANVAS_HEIGHT),
            );
            self.handle_canvas_input(ctx, canvas_rect);

            let painter = ui.painter_at(canvas_rect);
            renderer::draw_canvas(
                ctx,
                &painter,
                canvas_rect,
                &self.store,
                &mut self.cache,
                &self.caption,
            );
            painter.rect_stroke(
                canvas_rect,
                0.0,
                egui::Stroke::new(1.0, Color32::from_gray(200)),
            );
        });

        if self.cache.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        } else {
            // Host commands can arrive while the UI is otherwise idle.
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_parse_flags_and_query() {
        let launch = Launch::from_args(
            ["--assets", "/srv/images", "--catalog", "cat.json", "bg=1&topText=gm"]
                .iter()
                .map(|s| s.to_string()),
        )
        .unwrap();
        assert_eq!(launch.asset_root, PathBuf::from("/srv/images"));
        assert_eq!(launch.catalog_path, Some(PathBuf::from("cat.json")));
        assert_eq!(launch.startup.background, Some(1));
        assert_eq!(launch.startup.top_text.as_deref(), Some("gm"));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Launch::from_args(["--frobnicate".to_string()].into_iter()).is_err());
        assert!(Launch::from_args(["--catalog".to_string()].into_iter()).is_err());
    }
}

use std::path::PathBuf;
use std::time::Duration;

use ab_glyph::FontArc;
use eframe::egui;
use tracing::{error, info, warn};

use crate::config::EditorConfig;
use crate::export::{self, ExportJob, ExportTarget};
use crate::loader::RasterLoad;
use crate::model::{Color, Point};
use crate::raster_canvas::{self, PixelCanvas};
use crate::render::{draw_scene, TEXT_SCALE};
use crate::session::{EditorSession, SessionHost, Tool};

const TOOLS: [(Tool, &str); 6] = [
    (Tool::Select, "Select"),
    (Tool::Pen, "Pen"),
    (Tool::Rectangle, "Rectangle"),
    (Tool::Arrow, "Arrow"),
    (Tool::Text, "Text"),
    (Tool::Crop, "Crop"),
];

fn to_egui(c: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

// ── Host collaborator ───────────────────────────────────────────────────────

struct WindowHost<'a> {
    ctx: &'a egui::Context,
    allow_close: &'a mut bool,
}

impl SessionHost for WindowHost<'_> {
    fn confirm_discard(&mut self) -> bool {
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("Unsaved annotations")
            .set_description("Discard changes and close?")
            .set_buttons(rfd::MessageButtons::YesNo)
            .show()
            == rfd::MessageDialogResult::Yes
    }

    fn close(&mut self) {
        *self.allow_close = true;
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Undo,
    Redo,
    Copy,
    Save,
    Share,
    Done,
    Delete,
    Escape,
    ApplyCrop,
    ConfirmText,
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct SnapmarkApp {
    image_path: PathBuf,
    config: EditorConfig,
    config_path: Option<PathBuf>,
    session: EditorSession,
    load: Option<RasterLoad>,
    load_error: Option<String>,
    font: Option<FontArc>,
    frame: PixelCanvas,
    texture: Option<egui::TextureHandle>,

    exports: Vec<ExportJob>,
    close_after_save: bool,
    allow_close: bool,
    status: Option<String>,

    pointer_held: bool,
    last_pointer: Option<Point>,
    size_draft: Option<f32>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl SnapmarkApp {
    pub fn new(image_path: PathBuf, config: EditorConfig, config_path: Option<PathBuf>) -> Self {
        let font = config
            .font_path
            .as_deref()
            .and_then(|path| match raster_canvas::load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("{e:#}; falling back to the bundled font");
                    None
                }
            })
            .or_else(raster_canvas::bundled_font);
        if font.is_none() {
            warn!("no font available; text annotations will not be rasterized");
        }

        let session = EditorSession::new(config.initial_style(), config.size_range());
        let load = RasterLoad::spawn(&image_path);

        Self {
            image_path,
            config,
            config_path,
            session,
            load: Some(load),
            load_error: None,
            font: font.clone(),
            frame: PixelCanvas::new(font),
            texture: None,
            exports: Vec::new(),
            close_after_save: false,
            allow_close: false,
            status: None,
            pointer_held: false,
            last_pointer: None,
            size_draft: None,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        }
    }

    fn image_size(&self) -> egui::Vec2 {
        let (w, h) = self.session.dimensions().unwrap_or((800, 600));
        egui::vec2(w as f32, h as f32)
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        canvas_rect.center() + self.pan + (img_pos.to_vec2() - self.image_size() * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image-space
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> Point {
        let rel = screen_pos - canvas_rect.center() - self.pan;
        let size = self.image_size();
        Point::new(
            rel.x / self.zoom + size.x * 0.5,
            rel.y / self.zoom + size.y * 0.5,
        )
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let size = self.image_size();
        egui::Rect::from_min_max(
            self.image_to_screen(canvas_rect, egui::Pos2::ZERO),
            self.image_to_screen(canvas_rect, egui::pos2(size.x, size.y)),
        )
    }

    /// Stores the style in use so the next session starts with it.
    fn persist_style(&mut self) {
        if !self.config.remember_style(self.session.style()) {
            return;
        }
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if let Err(e) = self.config.save(path) {
            warn!("{e:#}");
        }
    }

    fn poll_load(&mut self) {
        let Some(load) = self.load.as_mut() else {
            return;
        };
        match load.poll() {
            Some(Ok(raster)) => {
                self.session.load_raster(raster);
                self.load = None;
            }
            Some(Err(e)) => {
                error!("{e}");
                self.load_error = Some(e.to_string());
                self.load = None;
            }
            None => {}
        }
    }

    fn poll_exports(&mut self, ctx: &egui::Context) {
        let mut finished = Vec::new();
        self.exports.retain_mut(|job| match job.poll() {
            Some(outcome) => {
                finished.push((job.target().clone(), outcome));
                false
            }
            None => true,
        });
        for (target, outcome) in finished {
            match outcome {
                Ok(message) => {
                    self.status = Some(message);
                    if self.close_after_save && matches!(target, ExportTarget::File(_)) {
                        self.close_after_save = false;
                        WindowHost {
                            ctx,
                            allow_close: &mut self.allow_close,
                        }
                        .close();
                    }
                }
                Err(e) => {
                    self.status = Some(format!("Export failed: {e:#}"));
                    self.close_after_save = false;
                }
            }
        }
    }

    /// Flattens the document for copy/save/share and runs the sink off the
    /// UI thread.
    fn start_export(&mut self, target: ExportTarget) -> bool {
        match self.session.export_image(self.font.as_ref()) {
            Ok(image) => {
                info!(sink = ?target, "export started");
                self.exports.push(ExportJob::spawn(target, image));
                true
            }
            Err(e) => {
                warn!("{e}");
                self.status = Some(e.to_string());
                false
            }
        }
    }

    fn save_as(&mut self) -> bool {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name(export::suggested_file_name(&self.image_path))
            .save_file()
        else {
            return false;
        };
        self.start_export(ExportTarget::File(path))
    }

    fn perform(&mut self, ctx: &egui::Context, action: Action) {
        match action {
            Action::Undo => self.session.undo(),
            Action::Redo => self.session.redo(),
            Action::Copy => {
                self.start_export(ExportTarget::Clipboard);
            }
            Action::Share => {
                self.start_export(ExportTarget::Share);
            }
            Action::Save => {
                self.save_as();
            }
            Action::Done => {
                if self.save_as() {
                    self.close_after_save = true;
                }
            }
            Action::Delete => self.session.delete_selection(),
            Action::Escape => {
                let mut host = WindowHost {
                    ctx,
                    allow_close: &mut self.allow_close,
                };
                self.session.escape(&mut host);
            }
            Action::ApplyCrop => {
                if self.session.tool() == Tool::Crop {
                    self.session.apply_crop();
                }
            }
            Action::ConfirmText => self.session.confirm_text_entry(),
        }
    }

    fn keyboard_actions(&self, ctx: &egui::Context) -> Vec<Action> {
        let editing_text = self.session.text_entry().is_some();
        ctx.input(|i| {
            let mut actions = Vec::new();
            let cmd = i.modifiers.command;
            if !editing_text {
                if cmd && i.key_pressed(egui::Key::Z) {
                    actions.push(if i.modifiers.shift {
                        Action::Redo
                    } else {
                        Action::Undo
                    });
                }
                if cmd && i.key_pressed(egui::Key::Y) {
                    actions.push(Action::Redo);
                }
                let copy_event = i.events.iter().any(|e| matches!(e, egui::Event::Copy));
                if copy_event || (cmd && i.key_pressed(egui::Key::C)) {
                    actions.push(Action::Copy);
                }
                if i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace) {
                    actions.push(Action::Delete);
                }
            }
            if cmd && i.key_pressed(egui::Key::S) {
                actions.push(Action::Save);
            }
            if i.key_pressed(egui::Key::Escape) {
                actions.push(Action::Escape);
            }
            if i.key_pressed(egui::Key::Enter) {
                actions.push(if editing_text {
                    Action::ConfirmText
                } else {
                    Action::ApplyCrop
                });
            }
            actions
        })
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.horizontal(|ui| {
            let current = self.session.tool();
            for (tool, label) in TOOLS {
                if ui.selectable_label(current == tool, label).clicked() && current != tool {
                    self.session.select_tool(tool);
                }
            }
            ui.separator();

            let style = self.session.style();
            for color in self.config.palette.clone() {
                let (rect, resp) =
                    ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::click());
                ui.painter().rect_filled(rect, 3.0, to_egui(color));
                if color == style.color {
                    ui.painter().rect_stroke(
                        rect.expand(2.0),
                        3.0,
                        egui::Stroke::new(1.5, ui.visuals().strong_text_color()),
                        egui::StrokeKind::Outside,
                    );
                }
                if resp.on_hover_text(color.to_hex()).clicked() {
                    self.session.set_color(color);
                }
            }
            let mut rgb = [style.color.r, style.color.g, style.color.b];
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                self.session.set_color(Color::rgb(rgb[0], rgb[1], rgb[2]));
            }
            ui.separator();

            ui.label("Size:");
            let mut size = self.size_draft.unwrap_or(style.size);
            let resp = ui.add(egui::Slider::new(&mut size, self.session.size_range()).step_by(1.0));
            if resp.drag_stopped() || (resp.changed() && !resp.dragged()) {
                self.size_draft = None;
                self.session.set_size(size);
            } else if resp.changed() {
                self.size_draft = Some(size);
            }
            ui.separator();

            if ui
                .add_enabled(self.session.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                actions.push(Action::Undo);
            }
            if ui
                .add_enabled(self.session.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                actions.push(Action::Redo);
            }
            if current == Tool::Crop && ui.button("Apply crop").clicked() {
                actions.push(Action::ApplyCrop);
            }
            ui.separator();
            if ui.button("Copy").clicked() {
                actions.push(Action::Copy);
            }
            if ui.button("Share").clicked() {
                actions.push(Action::Share);
            }
            if ui.button("Save").clicked() {
                actions.push(Action::Save);
            }
            if ui.button("Done").clicked() {
                actions.push(Action::Done);
            }
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
        });
        if let Some(status) = &self.status {
            ui.label(status);
        }
    }

    /// Uploads a new frame when the session changed since the last tick.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.session.take_frame_request() {
            return;
        }
        let Some(scene) = self.session.scene() else {
            return;
        };
        draw_scene(&mut self.frame, &scene);
        let image = self.frame.image();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [image.width() as usize, image.height() as usize],
            image.as_raw(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("frame", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn draw_crop_overlay(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let Some(crop) = self.session.crop_rect() else {
            return;
        };
        let image_rect = self.image_rect_on_screen(canvas_rect);
        let rect = egui::Rect::from_min_max(
            self.image_to_screen(canvas_rect, egui::pos2(crop.x, crop.y)),
            self.image_to_screen(canvas_rect, egui::pos2(crop.right(), crop.bottom())),
        );

        let shade = egui::Color32::from_black_alpha(128);
        let outer = image_rect.union(rect);
        for band in [
            egui::Rect::from_min_max(outer.min, egui::pos2(outer.max.x, rect.min.y)),
            egui::Rect::from_min_max(egui::pos2(outer.min.x, rect.max.y), outer.max),
            egui::Rect::from_min_max(
                egui::pos2(outer.min.x, rect.min.y),
                egui::pos2(rect.min.x, rect.max.y),
            ),
            egui::Rect::from_min_max(
                egui::pos2(rect.max.x, rect.min.y),
                egui::pos2(outer.max.x, rect.max.y),
            ),
        ] {
            if band.is_positive() {
                painter.rect_filled(band, 0.0, shade);
            }
        }
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(2.0, egui::Color32::WHITE),
            egui::StrokeKind::Middle,
        );
        for (_, anchor) in crop.handle_positions() {
            let center = self.image_to_screen(canvas_rect, egui::pos2(anchor.x, anchor.y));
            let handle = egui::Rect::from_center_size(center, egui::vec2(8.0, 8.0));
            painter.rect_filled(handle, 0.0, egui::Color32::WHITE);
            painter.rect_stroke(
                handle,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::BLACK),
                egui::StrokeKind::Middle,
            );
        }
    }

    fn show_text_entry(&mut self, ctx: &egui::Context, canvas_rect: egui::Rect) {
        let Some(entry) = self.session.text_entry().cloned() else {
            return;
        };
        let style = self.session.style();
        let screen_pos = self.image_to_screen(canvas_rect, egui::pos2(entry.at.x, entry.at.y));
        let font_px = (style.size * TEXT_SCALE * self.zoom).max(8.0);
        let mut buffer = entry.buffer.clone();
        let mut confirm = false;

        egui::Area::new(egui::Id::new("text_input"))
            .fixed_pos(screen_pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.set_max_width(300.0);
                let te = ui.add(
                    egui::TextEdit::singleline(&mut buffer)
                        .font(egui::FontId::proportional(font_px))
                        .text_color(to_egui(style.color)),
                );
                if te.lost_focus() {
                    confirm = true;
                } else {
                    te.request_focus();
                }
            });

        if buffer != entry.buffer {
            self.session.set_text_entry(&buffer);
        }
        if confirm {
            self.session.confirm_text_entry();
        }
    }

    fn handle_pan_zoom(&mut self, ctx: &egui::Context, response: &egui::Response) {
        // Handle pan (middle mouse button)
        if ctx.input(|i| i.pointer.middle_down()) {
            self.pan += ctx.input(|i| i.pointer.delta());
            self.panning = true;
        } else {
            self.panning = false;
        }

        // Handle zoom (scroll wheel)
        let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
        if scroll_delta != 0.0 && response.hovered() {
            let zoom_factor = 1.0 + scroll_delta * 0.002;
            let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
            if let Some(cursor) = response.hover_pos() {
                let cursor_rel = cursor - response.rect.center() - self.pan;
                self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
            }
            self.zoom = new_zoom;
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let canvas_rect = response.rect;
        let (pressed, released, latest) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.latest_pos(),
            )
        });

        if pressed && !self.panning {
            if let Some(screen) = response.hover_pos() {
                let pos = self.screen_to_image(canvas_rect, screen);
                self.session
                    .set_crop_grab_radius(self.config.crop_handle_radius / self.zoom);
                self.session.pointer_down(pos);
                self.pointer_held = true;
                self.last_pointer = Some(pos);
            }
        }

        if self.pointer_held {
            if let Some(screen) = latest {
                let pos = self.screen_to_image(canvas_rect, screen);
                if self.last_pointer != Some(pos) {
                    self.session.pointer_move(pos);
                    self.last_pointer = Some(pos);
                }
            }
        }

        if released && self.pointer_held {
            self.session.pointer_up();
            self.pointer_held = false;
            self.last_pointer = None;
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for SnapmarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_load();
        self.poll_exports(ctx);
        if !self.exports.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            if self.allow_close {
                if self.session.is_loaded() {
                    self.persist_style();
                }
            } else {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                let mut host = WindowHost {
                    ctx,
                    allow_close: &mut self.allow_close,
                };
                self.session.request_close(&mut host);
            }
        }

        if !self.session.is_loaded() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| match &self.load_error {
                    Some(e) => ui.colored_label(ui.visuals().error_fg_color, e),
                    None => ui.label("Loading..."),
                });
            });
            if self.load.is_some() {
                ctx.request_repaint_after(Duration::from_millis(50));
            }
            return;
        }

        for action in self.keyboard_actions(ctx) {
            self.perform(ctx, action);
        }

        let mut toolbar_actions = Vec::new();
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui, &mut toolbar_actions);
        });
        for action in toolbar_actions {
            self.perform(ctx, action);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            self.handle_pan_zoom(ctx, &response);
            self.handle_pointer(ctx, &response);
            self.refresh_texture(ctx);

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));
            if let Some(tex) = &self.texture {
                painter.image(
                    tex.id(),
                    self.image_rect_on_screen(canvas_rect),
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            if self.session.tool() == Tool::Crop {
                self.draw_crop_overlay(&painter, canvas_rect);
            }
            self.show_text_entry(ctx, canvas_rect);
        });
    }
}

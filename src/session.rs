//! The editing session: one document, its history, and the interaction state
//! machine that turns pointer and keyboard input into edits.
//!
//! All coordinates handed to a session are raster pixels; converting from
//! screen space is the host's job.

use std::ops::RangeInclusive;
use std::sync::Arc;

use ab_glyph::FontArc;
use image::RgbaImage;
use tracing::{debug, info};

use crate::crop::{self, CropDrag, CropHandle, CropRect};
use crate::error::EditorError;
use crate::export;
use crate::hit_test;
use crate::history::{History, Snapshot};
use crate::model::{Annotation, AnnotationId, Color, Point, Shape};
use crate::render::{FrameScheduler, Scene, TEXT_SCALE};
use crate::surface::{ImageSurface, Raster};

/// Collaborator the session calls when it needs the outside world.
pub trait SessionHost {
    /// Ask whether unsaved annotations may be thrown away.
    fn confirm_discard(&mut self) -> bool;
    fn close(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Select,
    Pen,
    Rectangle,
    Arrow,
    Text,
    Crop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub color: Color,
    pub size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Color::RED,
            size: 4.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawKind {
    Freehand,
    Rectangle,
    Arrow,
}

/// An open text box; `at` is where the user clicked (the box's top-left).
#[derive(Clone, Debug, PartialEq)]
pub struct TextEntry {
    pub at: Point,
    pub buffer: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    Idle,
    DraggingSelection { last: Point, moved: bool },
    Drawing(DrawKind),
    EditingText(TextEntry),
    ResizingCrop(CropDrag),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    Cancelled,
}

pub struct EditorSession {
    surface: ImageSurface,
    history: Option<History>,
    annotations: Vec<Annotation>,
    pending: Option<Annotation>,
    selected: Option<AnnotationId>,
    tool: Tool,
    style: Style,
    size_range: RangeInclusive<f32>,
    interaction: Interaction,
    crop: Option<CropRect>,
    crop_grab_radius: f32,
    frames: FrameScheduler,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(Style::default(), 1.0..=20.0)
    }
}

impl EditorSession {
    pub fn new(style: Style, size_range: RangeInclusive<f32>) -> Self {
        Self {
            surface: ImageSurface::new(),
            history: None,
            annotations: Vec::new(),
            pending: None,
            selected: None,
            tool: Tool::Select,
            style,
            size_range,
            interaction: Interaction::Idle,
            crop: None,
            crop_grab_radius: 10.0,
            frames: FrameScheduler::default(),
        }
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Completion of the initial raster load. Starts a fresh history rooted
    /// at the unannotated image.
    pub fn load_raster(&mut self, raster: Raster) {
        let (width, height) = raster.dimensions();
        info!(width, height, "session raster loaded");
        self.surface.set(raster.clone());
        self.history = Some(History::new(Snapshot::new(Vec::new(), raster)));
        self.annotations.clear();
        self.pending = None;
        self.selected = None;
        self.interaction = Interaction::Idle;
        self.crop = Some(CropRect::full(width, height));
        self.frames.request();
    }

    pub fn is_loaded(&self) -> bool {
        self.surface.is_loaded()
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn raster(&self) -> Option<&Raster> {
        self.surface.raster()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.surface.dimensions()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn pending(&self) -> Option<&Annotation> {
        self.pending.as_ref()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn size_range(&self) -> RangeInclusive<f32> {
        self.size_range.clone()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn text_entry(&self) -> Option<&TextEntry> {
        match &self.interaction {
            Interaction::EditingText(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn crop_rect(&self) -> Option<CropRect> {
        self.crop
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(History::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(History::can_redo)
    }

    pub fn has_unsaved_annotations(&self) -> bool {
        !self.annotations.is_empty()
    }

    /// The frame to draw, including the pending annotation and selection.
    pub fn scene(&self) -> Option<Scene<'_>> {
        Some(Scene {
            raster: self.surface.raster()?,
            annotations: &self.annotations,
            pending: self.pending.as_ref(),
            selected: self.selected,
        })
    }

    /// True at most once per batch of changes; call once per display tick.
    pub fn take_frame_request(&mut self) -> bool {
        self.frames.take()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames.frames()
    }

    // ── Tools & style ───────────────────────────────────────────────────────

    pub fn select_tool(&mut self, tool: Tool) {
        self.finish_text_entry();
        self.pending = None;
        self.interaction = Interaction::Idle;
        self.tool = tool;
        if tool == Tool::Crop {
            self.crop = self.full_crop();
        }
        debug!(?tool, "tool selected");
        self.frames.request();
    }

    /// Sets the active color; recolors the selection if there is one.
    pub fn set_color(&mut self, color: Color) {
        self.style.color = color;
        self.edit_selected(|a| {
            let changed = a.color != color;
            a.color = color;
            changed
        });
    }

    /// Sets the active size; resizes the selection if there is one.
    pub fn set_size(&mut self, size: f32) {
        let size = size.clamp(*self.size_range.start(), *self.size_range.end());
        self.style.size = size;
        self.edit_selected(|a| {
            let changed = a.size != size;
            a.size = size;
            changed
        });
    }

    /// Grab radius for crop handles, in raster pixels. Hosts that zoom keep
    /// this in step with their scale factor.
    pub fn set_crop_grab_radius(&mut self, radius: f32) {
        self.crop_grab_radius = radius.max(1.0);
    }

    /// Replaces the crop rectangle, e.g. from a numeric entry.
    pub fn set_crop_rect(&mut self, rect: CropRect) {
        if self.is_loaded() {
            self.crop = Some(rect.clamped());
            self.frames.request();
        }
    }

    // ── Pointer input ───────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, pos: Point) {
        if !self.is_loaded() {
            return;
        }
        self.finish_text_entry();

        match self.tool {
            Tool::Select => match hit_test::topmost(&self.annotations, pos) {
                Some(index) => {
                    let hit = &self.annotations[index];
                    self.selected = Some(hit.id);
                    self.style = Style {
                        color: hit.color,
                        size: hit.size,
                    };
                    self.interaction = Interaction::DraggingSelection {
                        last: pos,
                        moved: false,
                    };
                }
                None => {
                    self.selected = None;
                    self.interaction = Interaction::Idle;
                }
            },
            Tool::Pen => self.begin_drawing(
                DrawKind::Freehand,
                Shape::Freehand { points: vec![pos] },
            ),
            Tool::Rectangle => self.begin_drawing(
                DrawKind::Rectangle,
                Shape::Rectangle {
                    x: pos.x,
                    y: pos.y,
                    width: 0.0,
                    height: 0.0,
                },
            ),
            Tool::Arrow => self.begin_drawing(DrawKind::Arrow, Shape::Arrow { from: pos, to: pos }),
            Tool::Text => {
                self.interaction = Interaction::EditingText(TextEntry {
                    at: pos,
                    buffer: String::new(),
                });
            }
            Tool::Crop => {
                let rect = self.crop.or_else(|| self.full_crop());
                if let Some(rect) = rect {
                    if let Some(handle) = CropHandle::pick(&rect, pos, self.crop_grab_radius) {
                        self.interaction =
                            Interaction::ResizingCrop(CropDrag::begin(handle, pos, rect));
                    }
                }
            }
        }
        self.frames.request();
    }

    pub fn pointer_move(&mut self, pos: Point) {
        match &mut self.interaction {
            Interaction::DraggingSelection { last, moved } => {
                let (dx, dy) = (pos.x - last.x, pos.y - last.y);
                if dx == 0.0 && dy == 0.0 {
                    return;
                }
                let Some(id) = self.selected else {
                    return;
                };
                if let Some(target) = self.annotations.iter_mut().find(|a| a.id == id) {
                    target.translate(dx, dy);
                    *moved = true;
                }
                *last = pos;
            }
            Interaction::Drawing(_) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.shape.extend_to(pos);
                }
            }
            Interaction::ResizingCrop(drag) => {
                self.crop = Some(drag.update(pos));
            }
            Interaction::Idle | Interaction::EditingText(_) => return,
        }
        self.frames.request();
    }

    pub fn pointer_up(&mut self) {
        let interaction = std::mem::replace(&mut self.interaction, Interaction::Idle);

        if let Some(annotation) = self.pending.take() {
            match annotation.shape.validate() {
                Ok(()) => {
                    debug!(kind = annotation.shape.kind_name(), id = %annotation.id, "annotation committed");
                    let mut next = self.annotations.clone();
                    next.push(annotation);
                    self.commit(next, None);
                }
                Err(e) => debug!("dropping pending annotation: {e}"),
            }
            self.frames.request();
            return;
        }

        match interaction {
            Interaction::DraggingSelection { moved: true, .. } => {
                debug!(id = ?self.selected, "selection moved");
                self.commit(self.annotations.clone(), None);
            }
            // a text box stays open until confirmed
            Interaction::EditingText(entry) => {
                self.interaction = Interaction::EditingText(entry);
            }
            Interaction::Idle
            | Interaction::DraggingSelection { moved: false, .. }
            | Interaction::Drawing(_)
            | Interaction::ResizingCrop(_) => {}
        }
        self.frames.request();
    }

    // ── Commands ────────────────────────────────────────────────────────────

    pub fn delete_selection(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        let next: Vec<Annotation> = self
            .annotations
            .iter()
            .filter(|a| a.id != id)
            .cloned()
            .collect();
        self.selected = None;
        if matches!(self.interaction, Interaction::DraggingSelection { .. }) {
            self.interaction = Interaction::Idle;
        }
        if next.len() != self.annotations.len() {
            debug!(%id, "annotation deleted");
            self.commit(next, None);
        }
        self.frames.request();
    }

    pub fn undo(&mut self) {
        self.abandon_interaction();
        let snapshot = self.history.as_mut().and_then(|h| h.undo().cloned());
        if let Some(snapshot) = snapshot {
            debug!("undo");
            self.restore(&snapshot);
        }
    }

    pub fn redo(&mut self) {
        self.abandon_interaction();
        let snapshot = self.history.as_mut().and_then(|h| h.redo().cloned());
        if let Some(snapshot) = snapshot {
            debug!("redo");
            self.restore(&snapshot);
        }
    }

    pub fn set_text_entry(&mut self, text: &str) {
        if let Interaction::EditingText(entry) = &mut self.interaction {
            entry.buffer.clear();
            entry.buffer.push_str(text);
        }
    }

    /// Commits the open text box as a text annotation. Blank text is
    /// discarded.
    pub fn confirm_text_entry(&mut self) {
        self.finish_text_entry();
        self.frames.request();
    }

    pub fn cancel_text_entry(&mut self) {
        if matches!(self.interaction, Interaction::EditingText(_)) {
            self.interaction = Interaction::Idle;
            self.frames.request();
        }
    }

    /// Escape: closes an open text box first, otherwise asks to close.
    pub fn escape(&mut self, host: &mut dyn SessionHost) -> Option<CloseOutcome> {
        if matches!(self.interaction, Interaction::EditingText(_)) {
            self.cancel_text_entry();
            return None;
        }
        Some(self.request_close(host))
    }

    pub fn request_close(&mut self, host: &mut dyn SessionHost) -> CloseOutcome {
        if self.has_unsaved_annotations() && !host.confirm_discard() {
            debug!("close cancelled by user");
            return CloseOutcome::Cancelled;
        }
        host.close();
        CloseOutcome::Closed
    }

    /// Cuts the raster to the crop rectangle and re-bases every annotation,
    /// as a single history step. Returns whether a crop was committed.
    pub fn apply_crop(&mut self) -> bool {
        self.finish_text_entry();
        let Some(raster) = self.surface.raster().cloned() else {
            return false;
        };
        let (width, height) = raster.dimensions();
        let rect = self
            .crop
            .unwrap_or_else(|| CropRect::full(width, height))
            .snap();

        self.pending = None;
        self.interaction = Interaction::Idle;
        self.tool = Tool::Select;
        self.frames.request();

        if rect.covers_exactly(width, height) {
            self.crop = Some(CropRect::full(width, height));
            return false;
        }
        let cropped = match crop::crop_raster(&raster, rect) {
            Ok(cropped) => cropped,
            Err(e) => {
                debug!("crop dropped: {e}");
                self.crop = Some(CropRect::full(width, height));
                return false;
            }
        };

        let shifted = crop::shift_annotations(&self.annotations, rect.x as f32, rect.y as f32);
        info!(
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "crop applied"
        );
        self.commit(shifted, Some(Arc::new(cropped)));
        true
    }

    /// The document as it would be exported: raster plus committed
    /// annotations, without the pending shape or selection glow.
    pub fn export_image(&self, font: Option<&FontArc>) -> Result<RgbaImage, EditorError> {
        let raster = self.surface.raster().ok_or(EditorError::EmptyExport)?;
        Ok(export::compose(raster, &self.annotations, font))
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn full_crop(&self) -> Option<CropRect> {
        self.surface
            .dimensions()
            .map(|(w, h)| CropRect::full(w, h))
    }

    fn begin_drawing(&mut self, kind: DrawKind, shape: Shape) {
        self.pending = Some(Annotation::new(shape, self.style.color, self.style.size));
        self.interaction = Interaction::Drawing(kind);
    }

    /// Drops whatever is in flight without committing it.
    fn abandon_interaction(&mut self) {
        self.pending = None;
        self.interaction = Interaction::Idle;
    }

    fn finish_text_entry(&mut self) {
        let Interaction::EditingText(entry) =
            std::mem::replace(&mut self.interaction, Interaction::Idle)
        else {
            return;
        };
        let shape = Shape::Text {
            at: entry.at.offset(0.0, self.style.size * TEXT_SCALE),
            content: entry.buffer,
        };
        if let Err(e) = shape.validate() {
            debug!("text entry dropped: {e}");
            return;
        }
        let mut next = self.annotations.clone();
        next.push(Annotation::new(shape, self.style.color, self.style.size));
        self.commit(next, None);
    }

    fn edit_selected(&mut self, edit: impl FnOnce(&mut Annotation) -> bool) {
        let Some(id) = self.selected else {
            self.frames.request();
            return;
        };
        let mut next = self.annotations.clone();
        let changed = next.iter_mut().find(|a| a.id == id).is_some_and(edit);
        if changed {
            // the snapshot already holds any drag offset; release must not push it again
            if let Interaction::DraggingSelection { moved, .. } = &mut self.interaction {
                *moved = false;
            }
            self.commit(next, None);
        }
        self.frames.request();
    }

    /// Pushes one snapshot and makes it the live state.
    fn commit(&mut self, annotations: Vec<Annotation>, raster: Option<Raster>) {
        let Some(history) = self.history.as_mut() else {
            return;
        };
        let raster = raster.unwrap_or_else(|| history.current().raster().clone());
        let snapshot = history.push(Snapshot::new(annotations, raster)).clone();
        self.restore(&snapshot);
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.annotations = snapshot.annotations().to_vec();
        if !self.surface.holds(snapshot.raster()) {
            let (width, height) = snapshot.raster().dimensions();
            self.surface.set(snapshot.raster().clone());
            self.crop = Some(CropRect::full(width, height));
        }
        if let Some(id) = self.selected {
            if !self.annotations.iter().any(|a| a.id == id) {
                self.selected = None;
            }
        }
        self.frames.request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn loaded(width: u32, height: u32) -> EditorSession {
        let mut session = EditorSession::default();
        session.load_raster(Arc::new(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        )));
        session
    }

    fn drag(session: &mut EditorSession, from: Point, to: Point) {
        session.pointer_down(from);
        session.pointer_move(to);
        session.pointer_up();
    }

    #[derive(Default)]
    struct RecordingHost {
        answer: bool,
        asked: usize,
        closed: bool,
    }

    impl SessionHost for RecordingHost {
        fn confirm_discard(&mut self) -> bool {
            self.asked += 1;
            self.answer
        }
        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn drawing_stays_pending_until_pointer_up() {
        let mut s = loaded(100, 100);
        s.select_tool(Tool::Arrow);
        s.pointer_down(Point::new(1.0, 1.0));
        s.pointer_move(Point::new(40.0, 40.0));
        assert!(s.pending().is_some());
        assert!(s.annotations().is_empty());
        assert!(matches!(s.interaction(), Interaction::Drawing(DrawKind::Arrow)));

        s.pointer_up();
        assert!(s.pending().is_none());
        assert_eq!(s.annotations().len(), 1);
        assert_eq!(s.history().map(History::depth), Some(1));
    }

    #[test]
    fn pointer_up_without_pending_is_no_op() {
        let mut s = loaded(100, 100);
        s.pointer_up();
        assert_eq!(s.history().map(History::depth), Some(0));
    }

    #[test]
    fn zero_length_stroke_is_dropped() {
        let mut s = loaded(100, 100);
        s.select_tool(Tool::Pen);
        s.pointer_down(Point::new(5.0, 5.0));
        s.pointer_up();
        assert!(s.annotations().is_empty());
        assert!(!s.can_undo());
    }

    #[test]
    fn selecting_copies_style_and_style_edits_apply_to_selection() {
        let mut s = loaded(100, 100);
        s.select_tool(Tool::Rectangle);
        s.set_color(Color::BLACK);
        s.set_size(9.0);
        drag(&mut s, Point::new(10.0, 10.0), Point::new(50.0, 50.0));

        s.select_tool(Tool::Select);
        s.set_color(Color::RED);
        s.set_size(2.0);
        s.pointer_down(Point::new(30.0, 30.0));
        s.pointer_up();
        assert_eq!(s.style().color, Color::BLACK);
        assert_eq!(s.style().size, 9.0);

        let depth = s.history().map(History::depth);
        s.set_color(Color::WHITE);
        assert_eq!(s.annotations()[0].color, Color::WHITE);
        assert_eq!(s.history().map(History::depth), depth.map(|d| d + 1));

        // unchanged value pushes nothing
        s.set_color(Color::WHITE);
        assert_eq!(s.history().map(History::depth), depth.map(|d| d + 1));
    }

    #[test]
    fn moving_a_selection_is_one_undoable_step() {
        let mut s = loaded(200, 200);
        s.select_tool(Tool::Arrow);
        drag(&mut s, Point::new(10.0, 10.0), Point::new(60.0, 10.0));
        s.select_tool(Tool::Select);

        s.pointer_down(Point::new(30.0, 12.0));
        s.pointer_move(Point::new(35.0, 22.0));
        s.pointer_move(Point::new(40.0, 32.0));
        s.pointer_up();
        assert_eq!(
            s.annotations()[0].shape,
            Shape::Arrow {
                from: Point::new(20.0, 30.0),
                to: Point::new(70.0, 30.0),
            }
        );
        assert_eq!(s.history().map(History::depth), Some(2));

        s.undo();
        assert_eq!(
            s.annotations()[0].shape,
            Shape::Arrow {
                from: Point::new(10.0, 10.0),
                to: Point::new(60.0, 10.0),
            }
        );
    }

    #[test]
    fn delete_selection_pushes_and_clears() {
        let mut s = loaded(100, 100);
        s.delete_selection();
        assert_eq!(s.history().map(History::depth), Some(0));

        s.select_tool(Tool::Rectangle);
        drag(&mut s, Point::new(10.0, 10.0), Point::new(20.0, 20.0));
        s.select_tool(Tool::Select);
        s.pointer_down(Point::new(15.0, 15.0));
        s.pointer_up();
        s.delete_selection();
        assert!(s.annotations().is_empty());
        assert!(s.selected().is_none());
        assert_eq!(s.history().map(History::depth), Some(2));
    }

    #[test]
    fn delete_during_drag_is_a_single_step() {
        let mut s = loaded(100, 100);
        s.select_tool(Tool::Rectangle);
        drag(&mut s, Point::new(10.0, 10.0), Point::new(40.0, 40.0));
        s.select_tool(Tool::Select);
        s.pointer_down(Point::new(10.0, 20.0));
        s.pointer_move(Point::new(15.0, 25.0));
        s.delete_selection();
        s.pointer_up();
        assert!(s.annotations().is_empty());
        assert_eq!(s.history().map(History::depth), Some(2));

        s.undo();
        assert_eq!(s.annotations().len(), 1);
    }

    #[test]
    fn recolor_during_drag_is_a_single_step() {
        let mut s = loaded(100, 100);
        s.select_tool(Tool::Rectangle);
        drag(&mut s, Point::new(10.0, 10.0), Point::new(40.0, 40.0));
        s.select_tool(Tool::Select);
        s.pointer_down(Point::new(10.0, 20.0));
        s.pointer_move(Point::new(15.0, 25.0));
        s.set_color(Color::BLACK);
        s.pointer_up();
        assert_eq!(s.history().map(History::depth), Some(2));

        s.pointer_down(Point::new(15.0, 25.0));
        s.pointer_move(Point::new(20.0, 25.0));
        s.set_size(9.0);
        s.pointer_move(Point::new(30.0, 25.0));
        s.pointer_up();
        assert_eq!(s.history().map(History::depth), Some(4));
        match &s.annotations()[0].shape {
            Shape::Rectangle { x, y, .. } => assert_eq!((*x, *y), (30.0, 15.0)),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn text_entry_commits_below_click_point() {
        let mut s = loaded(300, 100);
        s.select_tool(Tool::Text);
        s.set_size(5.0);
        s.pointer_down(Point::new(10.0, 20.0));
        s.pointer_up();
        assert!(s.text_entry().is_some());
        s.set_text_entry("hello");
        s.confirm_text_entry();

        assert_eq!(
            s.annotations()[0].shape,
            Shape::Text {
                at: Point::new(10.0, 40.0),
                content: "hello".into(),
            }
        );
        assert!(s.text_entry().is_none());
    }

    #[test]
    fn switching_tools_commits_open_text_and_blank_text_is_dropped() {
        let mut s = loaded(300, 100);
        s.select_tool(Tool::Text);
        s.pointer_down(Point::new(10.0, 20.0));
        s.set_text_entry("   ");
        s.select_tool(Tool::Select);
        assert!(s.annotations().is_empty());

        s.select_tool(Tool::Text);
        s.pointer_down(Point::new(10.0, 20.0));
        s.set_text_entry("note");
        s.select_tool(Tool::Pen);
        assert_eq!(s.annotations().len(), 1);
    }

    #[test]
    fn close_asks_only_with_annotations() {
        let mut s = loaded(100, 100);
        let mut host = RecordingHost::default();
        assert_eq!(s.request_close(&mut host), CloseOutcome::Closed);
        assert_eq!(host.asked, 0);

        s.select_tool(Tool::Arrow);
        drag(&mut s, Point::new(1.0, 1.0), Point::new(9.0, 9.0));
        let mut host = RecordingHost::default();
        assert_eq!(s.request_close(&mut host), CloseOutcome::Cancelled);
        assert_eq!(host.asked, 1);
        assert!(!host.closed);

        let mut host = RecordingHost {
            answer: true,
            ..RecordingHost::default()
        };
        assert_eq!(s.escape(&mut host), Some(CloseOutcome::Closed));
        assert!(host.closed);
    }

    #[test]
    fn escape_cancels_text_entry_first() {
        let mut s = loaded(100, 100);
        s.select_tool(Tool::Text);
        s.pointer_down(Point::new(5.0, 5.0));
        s.set_text_entry("draft");
        let mut host = RecordingHost::default();
        assert_eq!(s.escape(&mut host), None);
        assert!(s.text_entry().is_none());
        assert!(s.annotations().is_empty());
        assert!(!host.closed);
    }

    #[test]
    fn unloaded_session_ignores_input_and_refuses_export() {
        let mut s = EditorSession::default();
        s.select_tool(Tool::Pen);
        s.pointer_down(Point::new(1.0, 1.0));
        s.pointer_move(Point::new(5.0, 5.0));
        s.pointer_up();
        assert!(s.annotations().is_empty());
        assert!(!s.apply_crop());
        assert_eq!(s.export_image(None), Err(EditorError::EmptyExport));
    }

    #[test]
    fn crop_handle_drag_updates_rect() {
        let mut s = loaded(200, 150);
        s.select_tool(Tool::Crop);
        s.set_crop_grab_radius(8.0);
        s.pointer_down(Point::new(0.0, 0.0));
        s.pointer_move(Point::new(20.0, 20.0));
        s.pointer_up();
        assert_eq!(s.crop_rect(), Some(CropRect::new(20.0, 20.0, 180.0, 130.0)));
        assert_eq!(s.history().map(History::depth), Some(0));
    }
}

use image::{imageops, RgbaImage};

use crate::error::EditorError;
use crate::model::{Annotation, Point};

/// Smallest width/height the interactive crop rectangle may shrink to.
pub const MIN_CROP_SIZE: f32 = 10.0;
/// Largest side, in pixels, an applied crop may produce.
pub const MAX_CROP_SIDE: u32 = 16_384;

/// Interactive crop rectangle in raster pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
        .clamped()
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn clamped(self) -> Self {
        Self {
            width: self.width.max(MIN_CROP_SIZE),
            height: self.height.max(MIN_CROP_SIZE),
            ..self
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Handle anchor points, corners first so they win over edges when the
    /// rectangle is small.
    pub fn handle_positions(&self) -> [(CropHandle, Point); 8] {
        let (cx, cy) = (self.x + self.width / 2.0, self.y + self.height / 2.0);
        [
            (CropHandle::NorthWest, Point::new(self.x, self.y)),
            (CropHandle::NorthEast, Point::new(self.right(), self.y)),
            (CropHandle::SouthWest, Point::new(self.x, self.bottom())),
            (CropHandle::SouthEast, Point::new(self.right(), self.bottom())),
            (CropHandle::North, Point::new(cx, self.y)),
            (CropHandle::South, Point::new(cx, self.bottom())),
            (CropHandle::West, Point::new(self.x, cy)),
            (CropHandle::East, Point::new(self.right(), cy)),
        ]
    }

    /// Rounds to whole pixels after applying the size floor.
    pub fn snap(self) -> PixelRect {
        let r = self.clamped();
        PixelRect {
            x: r.x.round() as i64,
            y: r.y.round() as i64,
            width: r.width.round().max(MIN_CROP_SIZE) as u32,
            height: r.height.round().max(MIN_CROP_SIZE) as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn covers_exactly(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }

    fn overlaps(&self, width: u32, height: u32) -> bool {
        self.x < width as i64
            && self.y < height as i64
            && self.x.saturating_add(self.width as i64) > 0
            && self.y.saturating_add(self.height as i64) > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropHandle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Move,
}

impl CropHandle {
    fn west(self) -> bool {
        matches!(
            self,
            CropHandle::West | CropHandle::NorthWest | CropHandle::SouthWest
        )
    }

    fn east(self) -> bool {
        matches!(
            self,
            CropHandle::East | CropHandle::NorthEast | CropHandle::SouthEast
        )
    }

    fn north(self) -> bool {
        matches!(
            self,
            CropHandle::North | CropHandle::NorthEast | CropHandle::NorthWest
        )
    }

    fn south(self) -> bool {
        matches!(
            self,
            CropHandle::South | CropHandle::SouthEast | CropHandle::SouthWest
        )
    }

    /// Handle under `pos`, or `Move` inside the body. `grab_radius` is in
    /// raster pixels.
    pub fn pick(rect: &CropRect, pos: Point, grab_radius: f32) -> Option<CropHandle> {
        rect.handle_positions()
            .into_iter()
            .find(|(_, anchor)| anchor.distance(pos) <= grab_radius)
            .map(|(handle, _)| handle)
            .or_else(|| rect.contains(pos).then_some(CropHandle::Move))
    }

    /// Rectangle produced by dragging this handle `(dx, dy)` away from where
    /// the drag started. The edge opposite a dragged edge stays put, even
    /// when the size floor kicks in.
    pub fn resize(self, start: CropRect, dx: f32, dy: f32) -> CropRect {
        let mut r = start;
        if self == CropHandle::Move {
            r.x += dx;
            r.y += dy;
            return r.clamped();
        }
        if self.west() {
            r.x += dx;
            r.width -= dx;
        }
        if self.east() {
            r.width += dx;
        }
        if self.north() {
            r.y += dy;
            r.height -= dy;
        }
        if self.south() {
            r.height += dy;
        }
        if self.west() && r.width < MIN_CROP_SIZE {
            r.x = start.right() - MIN_CROP_SIZE;
        }
        if self.north() && r.height < MIN_CROP_SIZE {
            r.y = start.bottom() - MIN_CROP_SIZE;
        }
        r.clamped()
    }
}

/// A crop handle drag: the rectangle and pointer captured at drag start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropDrag {
    pub handle: CropHandle,
    pub origin: Point,
    pub start_rect: CropRect,
}

impl CropDrag {
    pub fn begin(handle: CropHandle, origin: Point, start_rect: CropRect) -> Self {
        Self {
            handle,
            origin,
            start_rect,
        }
    }

    pub fn update(&self, pos: Point) -> CropRect {
        self.handle.resize(
            self.start_rect,
            pos.x - self.origin.x,
            pos.y - self.origin.y,
        )
    }
}

/// Copies the pixels under `rect` into a new raster of `rect`'s size, as if
/// `raster` were drawn at `(-x, -y)`. Area outside `raster` stays
/// transparent.
pub fn crop_raster(raster: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, EditorError> {
    let (width, height) = raster.dimensions();
    if rect.width > MAX_CROP_SIDE || rect.height > MAX_CROP_SIDE {
        return Err(EditorError::InvalidGeometry(format!(
            "crop {rect:?} exceeds {MAX_CROP_SIDE}px"
        )));
    }
    if !rect.overlaps(width, height) {
        return Err(EditorError::InvalidGeometry(format!(
            "crop {rect:?} lies outside the {width}x{height} image"
        )));
    }
    let mut out = RgbaImage::new(rect.width, rect.height);
    imageops::replace(&mut out, raster, -rect.x, -rect.y);
    Ok(out)
}

/// Re-bases every annotation onto a raster whose origin moved to `(x, y)`.
pub fn shift_annotations(annotations: &[Annotation], x: f32, y: f32) -> Vec<Annotation> {
    annotations.iter().map(|a| a.translated(-x, -y)).collect()
}

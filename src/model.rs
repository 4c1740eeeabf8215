use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EditorError;

// ── Geometry ────────────────────────────────────────────────────────────────

/// A position in raster pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ── Color ───────────────────────────────────────────────────────────────────

/// 8-bit RGBA color, written as `#rrggbb` or `#rrggbbaa` in config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const RED: Self = Self::rgb(0xef, 0x44, 0x44);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Scales the alpha channel by `factor` (0.0..=1.0).
    pub fn fade(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value).ok_or_else(|| format!("invalid color {value:?}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Swatches offered by the toolbar when no palette is configured.
pub const DEFAULT_PALETTE: [Color; 6] = [
    Color::RED,
    Color::rgb(0x3b, 0x82, 0xf6),
    Color::rgb(0x22, 0xc5, 0x5e),
    Color::rgb(0xea, 0xb3, 0x08),
    Color::WHITE,
    Color::BLACK,
];

// ── Annotations ─────────────────────────────────────────────────────────────

/// Session-unique annotation identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Freehand {
        points: Vec<Point>,
    },
    /// Anchored at (`x`, `y`); `width` and `height` keep the drag direction.
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Arrow {
        from: Point,
        to: Point,
    },
    /// `at` is the baseline-left origin of the string.
    Text {
        at: Point,
        content: String,
    },
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Freehand { .. } => "freehand",
            Shape::Rectangle { .. } => "rectangle",
            Shape::Arrow { .. } => "arrow",
            Shape::Text { .. } => "text",
        }
    }

    /// Uniform translation of every coordinate.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Shape::Freehand { points } => {
                for p in points.iter_mut() {
                    *p = p.offset(dx, dy);
                }
            }
            Shape::Rectangle { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Shape::Arrow { from, to } => {
                *from = from.offset(dx, dy);
                *to = to.offset(dx, dy);
            }
            Shape::Text { at, .. } => {
                *at = at.offset(dx, dy);
            }
        }
    }

    /// Grows a shape that is being drawn towards `pos`.
    pub fn extend_to(&mut self, pos: Point) {
        match self {
            Shape::Freehand { points } => points.push(pos),
            Shape::Rectangle {
                x,
                y,
                width,
                height,
            } => {
                *width = pos.x - *x;
                *height = pos.y - *y;
            }
            Shape::Arrow { to, .. } => *to = pos,
            Shape::Text { .. } => {}
        }
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        let degenerate = match self {
            Shape::Freehand { points } => match points.split_first() {
                Some((first, rest)) => rest.iter().all(|p| p == first),
                None => true,
            },
            Shape::Rectangle { width, height, .. } => *width == 0.0 || *height == 0.0,
            Shape::Arrow { from, to } => from == to,
            Shape::Text { content, .. } => content.trim().is_empty(),
        };
        if degenerate {
            Err(EditorError::InvalidGeometry(format!(
                "zero-extent {}",
                self.kind_name()
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub color: Color,
    pub size: f32,
    pub shape: Shape,
}

impl Annotation {
    pub fn new(shape: Shape, color: Color, size: f32) -> Self {
        Self {
            id: AnnotationId::new(),
            color,
            size,
            shape,
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.shape.translate(dx, dy);
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let mut moved = self.clone();
        moved.translate(dx, dy);
        moved
    }
}

//! Software `Canvas` that paints into an `RgbaImage`. Used for the live
//! frame shown by the window and for every export.

use std::path::Path;

use ab_glyph::{point, Font, FontArc, ScaleFont};
use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgba, RgbaImage};
use tracing::debug;

use crate::model::{Color, Point};
use crate::render::{Canvas, PaintStyle};

/// Extra radius of the white glow drawn behind a highlighted annotation.
const GLOW_RADIUS: f32 = 5.0;
const GLOW_ALPHA: f32 = 0.5;
/// Opacity of the annotation itself while highlighted.
const HIGHLIGHT_ALPHA: f32 = 0.8;

/// Loads the proportional font bundled with egui.
pub fn bundled_font() -> Option<FontArc> {
    let defs = egui::FontDefinitions::default();
    let data = defs
        .font_data
        .get("Ubuntu-Light")
        .or_else(|| defs.font_data.values().next())?;
    FontArc::try_from_vec(data.font.to_vec()).ok()
}

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read font {}", path.display()))?;
    FontArc::try_from_vec(bytes).map_err(|e| anyhow!("parse font {}: {e}", path.display()))
}

pub struct PixelCanvas {
    image: RgbaImage,
    style: PaintStyle,
    font: Option<FontArc>,
}

impl PixelCanvas {
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            style: PaintStyle {
                color: Color::BLACK,
                width: 1.0,
                highlighted: false,
            },
            font,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn stroke_with(&mut self, points: &[Point], radius: f32, color: Color) {
        let Some(mut mask) = CoverageMask::around(points, radius, &self.image) else {
            return;
        };
        if let [only] = points {
            mask.stamp_segment(*only, *only, radius);
        }
        for pair in points.windows(2) {
            mask.stamp_segment(pair[0], pair[1], radius);
        }
        mask.blend_into(&mut self.image, color);
    }

    fn fill_with(&mut self, points: &[Point], color: Color) {
        let Some(mut mask) = CoverageMask::around(points, 0.0, &self.image) else {
            return;
        };
        mask.fill_polygon(points);
        mask.blend_into(&mut self.image, color);
    }

    fn text_with(&mut self, origin: Point, text: &str, font_px: f32, color: Color) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let scaled = font.as_scaled(font_px);
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        let mut cursor = origin.x;
        let mut last = None;
        for ch in text.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = last {
                cursor += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(font_px, point(cursor, origin.y));
            cursor += scaled.h_advance(id);
            last = Some(id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            let image = &mut self.image;
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px >= 0 && px < w && py >= 0 && py < h {
                    blend(image.get_pixel_mut(px as u32, py as u32), color, coverage);
                }
            });
        }
    }
}

impl Canvas for PixelCanvas {
    fn begin_frame(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            debug!(width, height, "resizing frame surface");
            self.image = RgbaImage::new(width, height);
        } else {
            self.image.fill(0);
        }
    }

    fn draw_raster(&mut self, raster: &RgbaImage) {
        imageops::replace(&mut self.image, raster, 0, 0);
    }

    fn set_style(&mut self, style: PaintStyle) {
        self.style = style;
    }

    fn stroke_polyline(&mut self, points: &[Point]) {
        let style = self.style;
        let radius = style.width / 2.0;
        if style.highlighted {
            self.stroke_with(points, radius + GLOW_RADIUS, Color::WHITE.fade(GLOW_ALPHA));
            self.stroke_with(points, radius, style.color.fade(HIGHLIGHT_ALPHA));
        } else {
            self.stroke_with(points, radius, style.color);
        }
    }

    fn fill_polygon(&mut self, points: &[Point]) {
        let style = self.style;
        if style.highlighted {
            let mut outline = points.to_vec();
            if let Some(first) = points.first() {
                outline.push(*first);
            }
            self.stroke_with(&outline, GLOW_RADIUS, Color::WHITE.fade(GLOW_ALPHA));
            self.fill_with(points, style.color.fade(HIGHLIGHT_ALPHA));
        } else {
            self.fill_with(points, style.color);
        }
    }

    fn fill_text(&mut self, baseline_left: Point, text: &str, font_px: f32) {
        let style = self.style;
        if style.highlighted {
            let glow = Color::WHITE.fade(GLOW_ALPHA);
            for (dx, dy) in [(-1.5, 0.0), (1.5, 0.0), (0.0, -1.5), (0.0, 1.5)] {
                self.text_with(baseline_left.offset(dx, dy), text, font_px, glow);
            }
            self.text_with(baseline_left, text, font_px, style.color.fade(HIGHLIGHT_ALPHA));
        } else {
            self.text_with(baseline_left, text, font_px, style.color);
        }
    }
}

/// Per-pixel coverage for one primitive, clipped to the target image. Each
/// pixel is blended once, so overlapping segments of a translucent stroke
/// don't darken at the joins.
struct CoverageMask {
    x0: i32,
    y0: i32,
    width: usize,
    height: usize,
    coverage: Vec<f32>,
}

impl CoverageMask {
    fn around(points: &[Point], pad: f32, target: &RgbaImage) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let pad = pad + 1.0;
        let x0 = ((min_x - pad).floor() as i32).max(0);
        let y0 = ((min_y - pad).floor() as i32).max(0);
        let x1 = ((max_x + pad).ceil() as i32).min(target.width() as i32);
        let y1 = ((max_y + pad).ceil() as i32).min(target.height() as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let (width, height) = ((x1 - x0) as usize, (y1 - y0) as usize);
        Some(Self {
            x0,
            y0,
            width,
            height,
            coverage: vec![0.0; width * height],
        })
    }

    /// Round-capped capsule from `a` to `b`.
    fn stamp_segment(&mut self, a: Point, b: Point, radius: f32) {
        let radius = radius.max(0.5);
        let lo_x = ((a.x.min(b.x) - radius - 1.0).floor() as i32 - self.x0).max(0);
        let lo_y = ((a.y.min(b.y) - radius - 1.0).floor() as i32 - self.y0).max(0);
        let hi_x = ((a.x.max(b.x) + radius + 1.0).ceil() as i32 - self.x0).min(self.width as i32);
        let hi_y = ((a.y.max(b.y) + radius + 1.0).ceil() as i32 - self.y0).min(self.height as i32);
        for my in lo_y..hi_y {
            for mx in lo_x..hi_x {
                let center = Point::new(
                    (self.x0 + mx) as f32 + 0.5,
                    (self.y0 + my) as f32 + 0.5,
                );
                let d = crate::hit_test::point_to_segment_dist(center, a, b);
                let cov = (radius + 0.5 - d).clamp(0.0, 1.0);
                let slot = &mut self.coverage[my as usize * self.width + mx as usize];
                *slot = slot.max(cov);
            }
        }
    }

    /// Even-odd fill sampled at pixel centers.
    fn fill_polygon(&mut self, points: &[Point]) {
        if points.len() < 3 {
            return;
        }
        for my in 0..self.height {
            let cy = (self.y0 + my as i32) as f32 + 0.5;
            for mx in 0..self.width {
                let cx = (self.x0 + mx as i32) as f32 + 0.5;
                let mut inside = false;
                let mut j = points.len() - 1;
                for i in 0..points.len() {
                    let (pi, pj) = (points[i], points[j]);
                    if (pi.y > cy) != (pj.y > cy)
                        && cx < (pj.x - pi.x) * (cy - pi.y) / (pj.y - pi.y) + pi.x
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                if inside {
                    self.coverage[my * self.width + mx] = 1.0;
                }
            }
        }
    }

    fn blend_into(&self, image: &mut RgbaImage, color: Color) {
        for my in 0..self.height {
            for mx in 0..self.width {
                let cov = self.coverage[my * self.width + mx];
                if cov > 0.0 {
                    let px = (self.x0 + mx as i32) as u32;
                    let py = (self.y0 + my as i32) as u32;
                    blend(image.get_pixel_mut(px, py), color, cov);
                }
            }
        }
    }
}

/// Source-over with straight alpha.
fn blend(dst: &mut Rgba<u8>, color: Color, coverage: f32) {
    let sa = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| -> u8 {
        let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(color.r, dst[0]),
        mix(color.g, dst[1]),
        mix(color.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]);
}

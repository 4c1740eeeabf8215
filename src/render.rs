use std::f32::consts::FRAC_PI_6;

use image::RgbaImage;

use crate::model::{Annotation, AnnotationId, Color, Point, Shape};

/// Arrowhead length relative to the stroke size.
pub const ARROW_HEAD_SCALE: f32 = 4.0;
/// Angle between each arrowhead wing and the shaft.
pub const ARROW_WING_ANGLE: f32 = FRAC_PI_6;
/// Text is drawn at this multiple of the annotation size.
pub const TEXT_SCALE: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintStyle {
    pub color: Color,
    pub width: f32,
    /// Draw with the selection glow.
    pub highlighted: bool,
}

/// Drawing target for one frame. Coordinates are raster pixels.
pub trait Canvas {
    /// Resizes the surface if needed and clears it.
    fn begin_frame(&mut self, width: u32, height: u32);
    fn draw_raster(&mut self, raster: &RgbaImage);
    fn set_style(&mut self, style: PaintStyle);
    fn stroke_polyline(&mut self, points: &[Point]);
    fn fill_polygon(&mut self, points: &[Point]);
    fn fill_text(&mut self, baseline_left: Point, text: &str, font_px: f32);

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.stroke_polyline(&[
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
            Point::new(x, y),
        ]);
    }
}

/// Everything one frame shows.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub raster: &'a RgbaImage,
    pub annotations: &'a [Annotation],
    pub pending: Option<&'a Annotation>,
    pub selected: Option<AnnotationId>,
}

/// Tip, left wing and right wing of an arrowhead ending at `to`.
pub fn arrow_head(from: Point, to: Point, size: f32) -> [Point; 3] {
    let len = size * ARROW_HEAD_SCALE;
    let angle = (to.y - from.y).atan2(to.x - from.x);
    let wing = |a: f32| Point::new(to.x - len * a.cos(), to.y - len * a.sin());
    [
        to,
        wing(angle - ARROW_WING_ANGLE),
        wing(angle + ARROW_WING_ANGLE),
    ]
}

/// One full draw pass: raster, committed annotations in creation order,
/// then the pending annotation on top.
pub fn draw_scene<C: Canvas + ?Sized>(canvas: &mut C, scene: &Scene<'_>) {
    let (width, height) = scene.raster.dimensions();
    canvas.begin_frame(width, height);
    canvas.draw_raster(scene.raster);
    for annotation in scene.annotations {
        draw_annotation(canvas, annotation, scene.selected == Some(annotation.id));
    }
    if let Some(pending) = scene.pending {
        draw_annotation(canvas, pending, false);
    }
}

pub fn draw_annotation<C: Canvas + ?Sized>(canvas: &mut C, annotation: &Annotation, highlighted: bool) {
    let style = PaintStyle {
        color: annotation.color,
        width: annotation.size,
        highlighted,
    };
    canvas.set_style(style);
    match &annotation.shape {
        Shape::Freehand { points } => {
            if !points.is_empty() {
                canvas.stroke_polyline(points);
            }
        }
        Shape::Rectangle {
            x,
            y,
            width,
            height,
        } => canvas.stroke_rect(*x, *y, *width, *height),
        Shape::Arrow { from, to } => {
            canvas.stroke_polyline(&[*from, *to]);
            canvas.fill_polygon(&arrow_head(*from, *to, annotation.size));
        }
        Shape::Text { at, content } => {
            canvas.fill_text(*at, content, annotation.size * TEXT_SCALE);
        }
    }
    if highlighted {
        canvas.set_style(PaintStyle {
            highlighted: false,
            ..style
        });
    }
}

/// Coalesces model changes into at most one redraw per display tick.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    requested: bool,
    frames: u64,
}

impl FrameScheduler {
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Called once per tick; true when a frame should be drawn now.
    pub fn take(&mut self) -> bool {
        if !self.requested {
            return false;
        }
        self.requested = false;
        self.frames += 1;
        true
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Op {
        Begin(u32, u32),
        Raster,
        Style(PaintStyle),
        Polyline(Vec<Point>),
        Polygon(Vec<Point>),
        Text(Point, String, f32),
    }

    #[derive(Default)]
    pub(crate) struct Recorder {
        pub ops: Vec<Op>,
    }

    impl Canvas for Recorder {
        fn begin_frame(&mut self, width: u32, height: u32) {
            self.ops.push(Op::Begin(width, height));
        }
        fn draw_raster(&mut self, _raster: &RgbaImage) {
            self.ops.push(Op::Raster);
        }
        fn set_style(&mut self, style: PaintStyle) {
            self.ops.push(Op::Style(style));
        }
        fn stroke_polyline(&mut self, points: &[Point]) {
            self.ops.push(Op::Polyline(points.to_vec()));
        }
        fn fill_polygon(&mut self, points: &[Point]) {
            self.ops.push(Op::Polygon(points.to_vec()));
        }
        fn fill_text(&mut self, baseline_left: Point, text: &str, font_px: f32) {
            self.ops.push(Op::Text(baseline_left, text.to_string(), font_px));
        }
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn horizontal_arrow_head_is_symmetric() {
        let [tip, left, right] = arrow_head(Point::ZERO, Point::new(100.0, 0.0), 4.0);
        assert_eq!(tip, Point::new(100.0, 0.0));
        // wings sit 16 px back along the shaft, rotated by ±30°
        let back = 16.0 * FRAC_PI_6.cos();
        let side = 16.0 * FRAC_PI_6.sin();
        assert!(close(left, Point::new(100.0 - back, side)));
        assert!(close(right, Point::new(100.0 - back, -side)));
        assert!((tip.distance(left) - 16.0).abs() < 1e-4);
        assert!((tip.distance(right) - 16.0).abs() < 1e-4);
    }

    #[test]
    fn pending_is_drawn_last_and_highlight_is_reset() {
        let raster = RgbaImage::new(30, 20);
        let selected = Annotation::new(
            Shape::Rectangle {
                x: 1.0,
                y: 1.0,
                width: 5.0,
                height: 5.0,
            },
            Color::RED,
            2.0,
        );
        let other = Annotation::new(
            Shape::Text {
                at: Point::new(3.0, 15.0),
                content: "hi".into(),
            },
            Color::BLACK,
            3.0,
        );
        let pending = Annotation::new(
            Shape::Arrow {
                from: Point::ZERO,
                to: Point::new(10.0, 0.0),
            },
            Color::WHITE,
            1.0,
        );
        let annotations = vec![selected.clone(), other];
        let mut rec = Recorder::default();
        draw_scene(
            &mut rec,
            &Scene {
                raster: &raster,
                annotations: &annotations,
                pending: Some(&pending),
                selected: Some(selected.id),
            },
        );

        assert_eq!(rec.ops[0], Op::Begin(30, 20));
        assert_eq!(rec.ops[1], Op::Raster);
        assert!(matches!(rec.ops[2], Op::Style(s) if s.highlighted && s.color == Color::RED));
        assert!(matches!(rec.ops[3], Op::Polyline(ref pts) if pts.len() == 5));
        assert!(matches!(rec.ops[4], Op::Style(s) if !s.highlighted));
        assert!(matches!(rec.ops[5], Op::Style(s) if s.color == Color::BLACK));
        assert_eq!(rec.ops[6], Op::Text(Point::new(3.0, 15.0), "hi".into(), 12.0));
        assert!(matches!(rec.ops[7], Op::Style(s) if s.color == Color::WHITE));
        assert!(matches!(rec.ops[8], Op::Polyline(_)));
        assert!(matches!(rec.ops.last(), Some(Op::Polygon(pts)) if pts.len() == 3));
    }

    #[test]
    fn scheduler_coalesces_requests() {
        let mut frames = FrameScheduler::default();
        assert!(!frames.take());
        frames.request();
        frames.request();
        frames.request();
        assert!(frames.take());
        assert!(!frames.take());
        assert_eq!(frames.frames(), 1);
    }
}

//! Point-in-annotation queries in raster space.
//!
//! The text box is a character-count heuristic rather than real glyph
//! metrics, and every shape uses the same fixed tolerance.

use crate::model::{Annotation, Point, Shape};

pub const HIT_TOLERANCE: f32 = 15.0;

/// Padding below the text baseline covered by the text hit box.
const TEXT_DESCENT_PAD: f32 = 10.0;

pub fn hits(annotation: &Annotation, pos: Point) -> bool {
    let size = annotation.size;
    match &annotation.shape {
        Shape::Rectangle {
            x,
            y,
            width,
            height,
        } => {
            let left = x.min(x + width) - HIT_TOLERANCE;
            let top = y.min(y + height) - HIT_TOLERANCE;
            let right = x.max(x + width) + HIT_TOLERANCE;
            let bottom = y.max(y + height) + HIT_TOLERANCE;
            pos.x >= left && pos.x <= right && pos.y >= top && pos.y <= bottom
        }
        Shape::Text { at, content } => {
            let height = size * 4.0;
            let width = content.chars().count() as f32 * size * 3.0;
            pos.x >= at.x
                && pos.x <= at.x + width
                && pos.y >= at.y - height
                && pos.y <= at.y + TEXT_DESCENT_PAD
        }
        Shape::Arrow { from, to } => point_to_segment_dist(pos, *from, *to) < HIT_TOLERANCE,
        Shape::Freehand { points } => match points.as_slice() {
            [] => false,
            [only] => pos.distance(*only) < HIT_TOLERANCE,
            _ => points
                .windows(2)
                .any(|pair| point_to_segment_dist(pos, pair[0], pair[1]) < HIT_TOLERANCE),
        },
    }
}

/// Index of the topmost annotation under `pos`. Later entries paint on top,
/// so the search runs newest first.
pub fn topmost(annotations: &[Annotation], pos: Point) -> Option<usize> {
    annotations.iter().rposition(|a| hits(a, pos))
}

pub fn point_to_segment_dist(p: Point, a: Point, b: Point) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;

    fn ann(shape: Shape) -> Annotation {
        Annotation::new(shape, Color::RED, 4.0)
    }

    fn rect(x: f32, y: f32, width: f32, height: f32) -> Annotation {
        ann(Shape::Rectangle {
            x,
            y,
            width,
            height,
        })
    }

    #[test]
    fn rectangle_uses_normalized_box_with_tolerance() {
        let r = rect(100.0, 100.0, -50.0, -50.0);
        assert!(hits(&r, Point::new(75.0, 75.0)));
        assert!(hits(&r, Point::new(36.0, 50.0)));
        assert!(hits(&r, Point::new(115.0, 115.0)));
        assert!(!hits(&r, Point::new(116.0, 100.0)));
        assert!(!hits(&r, Point::new(34.0, 75.0)));
    }

    #[test]
    fn text_box_spans_above_the_baseline() {
        let t = ann(Shape::Text {
            at: Point::new(10.0, 100.0),
            content: "abc".into(),
        });
        // width = 3 * 12 = 36, height = 16
        assert!(hits(&t, Point::new(10.0, 84.0)));
        assert!(hits(&t, Point::new(46.0, 110.0)));
        assert!(!hits(&t, Point::new(9.0, 95.0)));
        assert!(!hits(&t, Point::new(47.0, 95.0)));
        assert!(!hits(&t, Point::new(20.0, 83.0)));
        assert!(!hits(&t, Point::new(20.0, 111.0)));
    }

    #[test]
    fn arrow_hits_within_tolerance_of_segment() {
        let a = ann(Shape::Arrow {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 0.0),
        });
        assert!(hits(&a, Point::new(50.0, 14.9)));
        assert!(!hits(&a, Point::new(50.0, 15.0)));
        assert!(hits(&a, Point::new(-10.0, 0.0)));
        assert!(!hits(&a, Point::new(120.0, 0.0)));
    }

    #[test]
    fn freehand_checks_every_segment() {
        let pen = ann(Shape::Freehand {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
            ],
        });
        assert!(hits(&pen, Point::new(110.0, 60.0)));
        assert!(!hits(&pen, Point::new(50.0, 50.0)));
    }

    #[test]
    fn newest_overlapping_annotation_wins() {
        let older = rect(0.0, 0.0, 100.0, 100.0);
        let newer = rect(50.0, 50.0, 100.0, 100.0);
        let list = vec![older, newer.clone()];
        let idx = topmost(&list, Point::new(75.0, 75.0)).expect("hit");
        assert_eq!(list[idx].id, newer.id);
        assert_eq!(topmost(&list, Point::new(10.0, 10.0)), Some(0));
        assert_eq!(topmost(&list, Point::new(400.0, 400.0)), None);
    }

    #[test]
    fn degenerate_segment_uses_point_distance() {
        let d = point_to_segment_dist(Point::new(3.0, 4.0), Point::ZERO, Point::ZERO);
        assert!((d - 5.0).abs() < f32::EPSILON);
    }
}

use std::sync::Arc;

use crate::model::Annotation;
use crate::surface::Raster;

/// One immutable point in the document's history.
#[derive(Debug, Clone)]
pub struct Snapshot {
    annotations: Arc<[Annotation]>,
    raster: Raster,
}

impl Snapshot {
    pub fn new(annotations: Vec<Annotation>, raster: Raster) -> Self {
        Self {
            annotations: annotations.into(),
            raster,
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Same annotations and the same raster allocation.
    pub fn same_state(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.raster, &other.raster) && self.annotations == other.annotations
    }
}

/// Linear undo/redo over whole-document snapshots.
///
/// The first snapshot is the document as loaded and is never discarded, so
/// `position < snapshots.len()` holds at all times.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    position: usize,
}

impl History {
    pub fn new(root: Snapshot) -> Self {
        Self {
            snapshots: vec![root],
            position: 0,
        }
    }

    /// Drops any redo branch, appends `snapshot` and makes it current.
    pub fn push(&mut self, snapshot: Snapshot) -> &Snapshot {
        self.snapshots.truncate(self.position + 1);
        self.snapshots.push(snapshot);
        self.position = self.snapshots.len() - 1;
        &self.snapshots[self.position]
    }

    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        Some(&self.snapshots[self.position])
    }

    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.position + 1 >= self.snapshots.len() {
            return None;
        }
        self.position += 1;
        Some(&self.snapshots[self.position])
    }

    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.position]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of recorded edits above the loaded document.
    pub fn depth(&self) -> usize {
        self.snapshots.len() - 1
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Color, Point, Shape};
    use image::RgbaImage;

    fn raster() -> Raster {
        Arc::new(RgbaImage::new(4, 4))
    }

    fn stroke(x: f32) -> Annotation {
        Annotation::new(
            Shape::Arrow {
                from: Point::new(x, x),
                to: Point::new(x + 1.0, x + 1.0),
            },
            Color::RED,
            4.0,
        )
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let base = raster();
        let mut history = History::new(Snapshot::new(vec![], base.clone()));
        history.push(Snapshot::new(vec![stroke(0.0)], base.clone()));
        history.push(Snapshot::new(vec![stroke(0.0), stroke(1.0)], base.clone()));
        assert!(history.undo().is_some());
        assert!(history.can_redo());

        history.push(Snapshot::new(vec![stroke(5.0)], base));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
        assert_eq!(history.depth(), 2);
        assert_eq!(history.position(), 2);
    }

    #[test]
    fn boundaries_are_no_ops() {
        let base = raster();
        let mut history = History::new(Snapshot::new(vec![], base.clone()));
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.position(), 0);

        history.push(Snapshot::new(vec![stroke(0.0)], base));
        assert!(history.redo().is_none());
        assert_eq!(history.position(), 1);
        assert_eq!(history.depth(), 1);
    }

    #[test]
    fn undo_then_redo_returns_identical_snapshots() {
        let base = raster();
        let mut history = History::new(Snapshot::new(vec![], base.clone()));
        for i in 0..5 {
            let mut annotations = history.current().annotations().to_vec();
            annotations.push(stroke(i as f32));
            history.push(Snapshot::new(annotations, base.clone()));
        }
        let last = history.current().clone();

        while history.undo().is_some() {}
        assert_eq!(history.position(), 0);
        assert!(history.current().annotations().is_empty());

        while history.redo().is_some() {}
        assert!(history.current().same_state(&last));
    }
}

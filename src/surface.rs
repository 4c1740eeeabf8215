use std::sync::Arc;

use image::RgbaImage;

/// Shared, immutable background pixels. History snapshots hold their own
/// clone of the `Arc`, so replacing the raster never invalidates them.
pub type Raster = Arc<RgbaImage>;

/// Holds the current background raster.
#[derive(Debug, Clone, Default)]
pub struct ImageSurface {
    raster: Option<Raster>,
}

impl ImageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, raster: Raster) {
        self.raster = Some(raster);
    }

    pub fn raster(&self) -> Option<&Raster> {
        self.raster.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.raster.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.raster.as_ref().map(|r| r.dimensions())
    }

    /// True when `raster` is the very same allocation as the current one.
    pub fn holds(&self, raster: &Raster) -> bool {
        self.raster
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, raster))
    }
}

use std::fmt::{self, Display};
use std::path::PathBuf;

/// Failures raised by the editor core. Each one is local to the action that
/// triggered it and leaves pushed history untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorError {
    /// The background raster could not be read or decoded.
    Load { path: PathBuf, reason: String },
    /// Copy/save/share was requested before a raster was loaded.
    EmptyExport,
    /// Geometry that must never reach history (zero-length strokes,
    /// crops that miss the raster).
    InvalidGeometry(String),
}

impl Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::Load { path, reason } => {
                write!(f, "failed to load {}: {reason}", path.display())
            }
            EditorError::EmptyExport => write!(f, "nothing to export: no image is loaded"),
            EditorError::InvalidGeometry(what) => write!(f, "invalid geometry: {what}"),
        }
    }
}

impl std::error::Error for EditorError {}

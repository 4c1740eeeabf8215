use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::error::EditorError;
use crate::surface::Raster;

type LoadResult = Result<Raster, EditorError>;

/// Decodes `path` into a fully loaded RGBA raster.
pub fn decode(path: &Path) -> LoadResult {
    let image = image::open(path).map_err(|e| EditorError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgba = image.to_rgba8();
    info!(
        path = %path.display(),
        width = rgba.width(),
        height = rgba.height(),
        "decoded background image"
    );
    Ok(Arc::new(rgba))
}

/// One-shot background decode of the initial raster.
///
/// The result is delivered exactly once through [`RasterLoad::poll`].
/// Dropping the task cancels it; a decode that finishes after cancellation
/// is discarded.
pub struct RasterLoad {
    path: PathBuf,
    rx: Receiver<LoadResult>,
    cancelled: Arc<AtomicBool>,
    finished: bool,
}

impl RasterLoad {
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_path = path.clone();
        let worker_cancelled = Arc::clone(&cancelled);
        let spawned = thread::Builder::new()
            .name("raster-load".into())
            .spawn(move || {
                if worker_cancelled.load(Ordering::Acquire) {
                    return;
                }
                let result = decode(&worker_path);
                if worker_cancelled.load(Ordering::Acquire) {
                    debug!(path = %worker_path.display(), "load finished after cancel; dropped");
                    return;
                }
                let _ = tx.send(result);
            });

        let rx = match spawned {
            Ok(_) => rx,
            Err(e) => {
                warn!("could not start loader thread: {e}");
                // the sender went down with the closure; report through a fresh channel
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(Err(EditorError::Load {
                    path: path.clone(),
                    reason: format!("could not start loader: {e}"),
                }));
                rx
            }
        };

        Self {
            path,
            rx,
            cancelled,
            finished: false,
        }
    }

    /// Non-blocking check for completion. Returns `Some` exactly once.
    pub fn poll(&mut self) -> Option<LoadResult> {
        if self.finished || self.is_cancelled() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(EditorError::Load {
                    path: self.path.clone(),
                    reason: "loader stopped without a result".into(),
                }))
            }
        }
    }

    /// Blocks until the decode completes.
    pub fn wait(mut self) -> LoadResult {
        self.finished = true;
        self.rx.recv().unwrap_or_else(|_| {
            Err(EditorError::Load {
                path: self.path.clone(),
                reason: "loader stopped without a result".into(),
            })
        })
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for RasterLoad {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

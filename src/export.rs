use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use ab_glyph::FontArc;
use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use tracing::{error, info};

use crate::model::Annotation;
use crate::raster_canvas::PixelCanvas;
use crate::render::{draw_scene, Scene};

/// Flattens `annotations` onto a copy of `raster`.
pub fn compose(raster: &RgbaImage, annotations: &[Annotation], font: Option<&FontArc>) -> RgbaImage {
    let mut canvas = PixelCanvas::new(font.cloned());
    draw_scene(
        &mut canvas,
        &Scene {
            raster,
            annotations,
            pending: None,
            selected: None,
        },
    );
    canvas.into_image()
}

/// `shot.png` → `shot_annotated.png`
pub fn suggested_file_name(source: &Path) -> String {
    format!(
        "{}_annotated.png",
        source
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("out")
    )
}

pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write {}", path.display()))
}

pub fn copy_to_clipboard(image: &RgbaImage) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
    clipboard
        .set_image(arboard::ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        })
        .context("put image on clipboard")
}

/// Writes a temporary PNG and hands it to the system opener.
pub fn share(image: &RgbaImage) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("snapmark-{}.png", uuid::Uuid::new_v4()));
    write_png(image, &path)?;
    open::that(&path).with_context(|| format!("open {}", path.display()))?;
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Clipboard,
    File(PathBuf),
    Share,
}

impl ExportTarget {
    fn run(&self, image: &RgbaImage) -> Result<String> {
        match self {
            ExportTarget::Clipboard => {
                copy_to_clipboard(image)?;
                Ok("Copied to clipboard".to_string())
            }
            ExportTarget::File(path) => {
                write_png(image, path)?;
                Ok(format!("Saved to {}", path.display()))
            }
            ExportTarget::Share => {
                let path = share(image)?;
                Ok(format!("Shared {}", path.display()))
            }
        }
    }
}

/// An export running off the UI thread. Reports exactly once; there is no
/// retry.
pub struct ExportJob {
    target: ExportTarget,
    rx: Receiver<Result<String>>,
    finished: bool,
}

impl ExportJob {
    pub fn spawn(target: ExportTarget, image: RgbaImage) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker_target = target.clone();
        let spawned = thread::Builder::new()
            .name("export".into())
            .spawn(move || {
                let _ = tx.send(worker_target.run(&image));
            });
        if let Err(e) = spawned {
            error!("could not start export thread: {e}");
        }
        Self {
            target,
            rx,
            finished: false,
        }
    }

    pub fn target(&self) -> &ExportTarget {
        &self.target
    }

    /// `Some` once the export has finished (or its worker died).
    pub fn poll(&mut self) -> Option<Result<String>> {
        if self.finished {
            return None;
        }
        let outcome = match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(anyhow!("export worker stopped")),
        };
        self.finished = true;
        match &outcome {
            Ok(message) => info!("{message}"),
            Err(e) => error!(sink = ?self.target, "export failed: {e:#}"),
        }
        Some(outcome)
    }
}

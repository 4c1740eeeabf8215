//! Screenshot annotation editor: an image surface with freehand, rectangle,
//! arrow and text annotations, snapshot undo/redo, cropping, and a software
//! renderer shared by the live view and export.

pub mod app;
pub mod cli;
pub mod config;
pub mod crop;
pub mod error;
pub mod export;
pub mod hit_test;
pub mod history;
pub mod loader;
pub mod logging;
pub mod model;
pub mod raster_canvas;
pub mod render;
pub mod session;
pub mod surface;

pub use error::EditorError;
pub use model::{Annotation, AnnotationId, Color, Point, Shape};
pub use session::{EditorSession, SessionHost, Tool};

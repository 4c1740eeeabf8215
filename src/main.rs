use anyhow::{anyhow, bail, Result};
use clap::Parser;
use eframe::egui;
use tracing::{debug, warn};

use snapmark::app::SnapmarkApp;
use snapmark::cli::Cli;
use snapmark::config::{self, LoadedConfig};
use snapmark::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = config::load(cli.config.as_deref());
    logging::init(cli.debug || loaded.config.debug_logging);

    if let Some(path) = &loaded.path {
        debug!("config path: {}", path.display());
    }
    if let Some(reason) = &loaded.reset_reason {
        warn!("{reason}; using defaults");
    }

    let image_path = cli.image;
    if !image_path.exists() {
        bail!("File not found: {}", image_path.display());
    }

    let title = format!(
        "snapmark — {}",
        image_path
            .file_name()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    let LoadedConfig { config, path, .. } = loaded;
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(SnapmarkApp::new(image_path, config, path)))),
    )
    .map_err(|e| anyhow!("eframe: {e}"))
}

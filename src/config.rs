use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{Color, DEFAULT_PALETTE};
use crate::session::Style;

pub const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR: &str = "snapmark";

/// Editor preferences persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Swatches shown in the toolbar.
    pub palette: Vec<Color>,
    /// Color active when a session starts.
    pub default_color: Color,
    pub default_size: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Crop handle grab radius in screen pixels.
    pub crop_handle_radius: f32,
    /// Font used for text annotations; the bundled font when unset.
    pub font_path: Option<PathBuf>,
    pub debug_logging: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.to_vec(),
            default_color: DEFAULT_PALETTE[0],
            default_size: 4.0,
            min_size: 1.0,
            max_size: 20.0,
            crop_handle_radius: 10.0,
            font_path: None,
            debug_logging: false,
        }
    }
}

impl EditorConfig {
    pub fn size_range(&self) -> RangeInclusive<f32> {
        let min = self.min_size.max(0.5);
        min..=self.max_size.max(min)
    }

    pub fn initial_style(&self) -> Style {
        Style {
            color: self.default_color,
            size: self.default_size.clamp(*self.size_range().start(), *self.size_range().end()),
        }
    }

    /// Adopts `style` as the starting style of the next session. Returns
    /// whether anything changed.
    pub fn remember_style(&mut self, style: Style) -> bool {
        let changed = self.default_color != style.color || self.default_size != style.size;
        self.default_color = style.color;
        self.default_size = style.size;
        changed
    }

    fn sanitized(mut self) -> Self {
        if self.palette.is_empty() {
            self.palette = DEFAULT_PALETTE.to_vec();
        }
        if !self.crop_handle_radius.is_finite() || self.crop_handle_radius <= 0.0 {
            self.crop_handle_radius = Self::default().crop_handle_radius;
        }
        self
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create config folder {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        std::fs::write(path, json).with_context(|| format!("write config {}", path.display()))?;
        info!("Config saved to {:?}", path);
        Ok(())
    }
}

/// Platform config location: `<config_dir>/snapmark/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Result of reading the config file.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EditorConfig,
    pub path: Option<PathBuf>,
    /// Why defaults were used instead of the file, if they were.
    pub reset_reason: Option<String>,
}

/// Reads `path` (or the platform default). A missing file yields defaults;
/// an unreadable or corrupt one yields defaults plus a reset reason.
pub fn load(path: Option<&Path>) -> LoadedConfig {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    let Some(file) = path.as_deref().filter(|p| p.exists()) else {
        info!("No config file found, using defaults");
        return LoadedConfig {
            config: EditorConfig::default(),
            path,
            reset_reason: None,
        };
    };

    let (config, reset_reason) = match std::fs::read_to_string(file) {
        Ok(json) => match serde_json::from_str::<EditorConfig>(&json) {
            Ok(config) => {
                info!("Loaded config from {:?}", file);
                (config.sanitized(), None)
            }
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                (
                    EditorConfig::default(),
                    Some(format!("Configuration file was corrupted: {}", e)),
                )
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            (
                EditorConfig::default(),
                Some(format!("Could not read configuration file: {}", e)),
            )
        }
    };

    LoadedConfig {
        config,
        path,
        reset_reason,
    }
}

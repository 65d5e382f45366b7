/// Render settings consumed by the viewport core
/// Persisted as TOML next to the viewer; missing or broken files fall back to defaults.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Unit system used for land height labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightLabelUnits {
    #[default]
    Units,
    Imperial,
    Metric,
}

impl HeightLabelUnits {
    /// Offset into the height-marker label range for this unit system
    pub const fn marker_offset(self) -> u32 {
        match self {
            HeightLabelUnits::Units => 0,
            HeightLabelUnits::Imperial => 256,
            HeightLabelUnits::Metric => 512,
        }
    }

    /// Text for a land height given in world z units (16 per height step)
    pub fn format(self, z: i32) -> String {
        let steps = z / 16;
        match self {
            HeightLabelUnits::Units => format!("{steps}"),
            HeightLabelUnits::Imperial => format!("{}ft", steps * 5),
            HeightLabelUnits::Metric => format!("{}m", steps * 3 / 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Generate, arrange and rasterize columns on the worker pool
    pub multithreading: bool,
    /// Worker count; `None` lets rayon pick one per core
    pub worker_threads: Option<usize>,
    /// New viewports start with the gridline overlay enabled
    pub always_show_gridlines: bool,
    /// Darken columns according to the weather gloom level
    pub render_weather_gloom: bool,
    pub height_labels: HeightLabelUnits,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            multithreading: true,
            worker_threads: None,
            always_show_gridlines: false,
            render_weather_gloom: true,
            height_labels: HeightLabelUnits::Units,
        }
    }
}

impl RenderSettings {
    /// Load settings from a TOML file, falling back to defaults.
    pub fn load_from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    log::info!("Render settings loaded from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Render settings file is malformed, using defaults: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No render settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Render settings saved to {}", path.display());
        Ok(())
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

//! Render configuration loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable config files. Every
//! field is optional on disk; missing ones take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rasterizer::{CameraConfig, Color, PhongMaterial, RasterSettings, ShadingMode, Vec3};

/// Error type for config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: 960, height: 720 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub viewport: ViewportConfig,
    pub camera: CameraConfig,
    /// Direction the light travels
    pub light_direction: Vec3,
    pub shading: ShadingMode,
    pub bloom: bool,
    pub material: PhongMaterial,
    /// Surface color for models without a diffuse map
    pub base_color: Color,
    /// Minimum time between two render passes
    pub frame_interval_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let raster = RasterSettings::default();
        Self {
            viewport: ViewportConfig::default(),
            camera: CameraConfig::default(),
            light_direction: raster.light_dir,
            shading: raster.shading,
            bloom: raster.bloom,
            material: raster.material,
            base_color: raster.base_color,
            frame_interval_ms: 16,
        }
    }
}

impl RenderConfig {
    /// Rasterizer settings for the first pass
    pub fn raster_settings(&self) -> RasterSettings {
        RasterSettings {
            shading: self.shading,
            light_dir: self.light_direction,
            base_color: self.base_color,
            material: self.material,
            bloom: self.bloom,
        }
    }

    /// Check ranges serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate().map_err(ConfigError::Invalid)?;
        if !self.light_direction.is_finite() || self.light_direction == Vec3::ZERO {
            return Err(ConfigError::Invalid("light_direction must be a finite non-zero vector".to_string()));
        }
        Ok(())
    }
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RenderConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    config_from_str(&contents)
}

/// Save a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &RenderConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Parse a config from a RON string
pub fn config_from_str(s: &str) -> Result<RenderConfig, ConfigError> {
    let config: RenderConfig = ron::from_str(s)?;
    config.validate()?;
    Ok(config)
}

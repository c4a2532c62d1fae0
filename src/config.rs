//! Viewer configuration
//!
//! Loaded once at startup from `viewer.ron`. Every section is
//! `#[serde(default)]`, so a file only needs the fields it changes. A missing
//! file means defaults; a malformed one is reported and also means defaults.

use serde::{Serialize, Deserialize};
use thiserror::Error;

#[cfg(any(test, target_arch = "wasm32"))]
use crate::asset::{AssetError, AssetSource};
use crate::input::InteractiveRegion;
use crate::rasterizer::{AmbientLight, Color, ToneMapper};
use crate::tween::Ease;

pub const CONFIG_PATH: &str = "viewer.ron";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {0} not found")]
    NotFound(String),
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[cfg(any(test, target_arch = "wasm32"))]
    #[error("failed to fetch config: {0}")]
    Fetch(AssetError),
    #[error("config is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[cfg(test)]
    #[error("config serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub model_path: String,
    pub environment_path: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model_path: "assets/DamagedHelmet.gltf".to_string(),
            environment_path: "assets/pond_bridge_night_1k.hdr".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Distance from the origin along +Z
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { fov_y: 48.0, near: 0.1, far: 1000.0, distance: 4.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Tilt between opposite window edges, as a fraction of π
    pub tilt_range: f32,
    /// Seconds
    pub duration: f32,
    pub ease: Ease,
    pub interactive_region: InteractiveRegion,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tilt_range: 0.12,
            duration: 0.9,
            ease: Ease::Power2Out,
            interactive_region: InteractiveRegion::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbShiftConfig {
    pub amount: f32,
    pub angle: f32,
}

impl Default for RgbShiftConfig {
    fn default() -> Self {
        Self { amount: 0.0015, angle: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub tone_mapping: ToneMapper,
    pub ambient: AmbientLight,
    /// Show the environment map behind the model instead of the clear color
    pub environment_background: bool,
    pub environment_intensity: f32,
    pub clear_color: Color,
    pub max_pixel_ratio: f32,
    /// Downscale applied on top of the pixel ratio
    pub render_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapper::default(),
            ambient: AmbientLight::default(),
            environment_background: false,
            environment_intensity: 1.0,
            clear_color: Color::TRANSPARENT,
            max_pixel_ratio: 2.0,
            render_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub controller: ControllerConfig,
    pub rgb_shift: RgbShiftConfig,
    pub render: RenderConfig,
}

impl ViewerConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Read(e),
        })?;
        Self::from_ron_str(&contents)
    }

    #[cfg(any(test, target_arch = "wasm32"))]
    pub async fn from_source<S: AssetSource>(source: &S, path: &str) -> Result<Self, ConfigError> {
        let bytes = source.read(path).await.map_err(|e| match e {
            AssetError::Fetch { .. } => ConfigError::NotFound(path.to_string()),
            other => ConfigError::Fetch(other),
        })?;
        Self::from_ron_str(&String::from_utf8(bytes)?)
    }

    /// Load the config for this platform, falling back to defaults on any failure
    pub async fn load(path: &str) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let result = Self::from_file(path);
        #[cfg(target_arch = "wasm32")]
        let result = Self::from_source(&crate::asset::FileSource, path).await;

        Self::or_default(result)
    }

    pub fn or_default(result: Result<Self, ConfigError>) -> Self {
        match result {
            Ok(config) => config,
            Err(ConfigError::NotFound(path)) => {
                log::info!("no {} found, using default settings", path);
                Self::default()
            }
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let finite = |name: &str, v: f32| {
            if v.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{} must be finite", name)))
            }
        };
        finite("camera.fov_y", self.camera.fov_y)?;
        finite("controller.tilt_range", self.controller.tilt_range)?;
        finite("rgb_shift.amount", self.rgb_shift.amount)?;
        finite("rgb_shift.angle", self.rgb_shift.angle)?;

        if !(self.camera.fov_y > 0.0 && self.camera.fov_y < 180.0) {
            return Err(ConfigError::Invalid("camera.fov_y must be between 0 and 180".into()));
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return Err(ConfigError::Invalid("camera needs 0 < near < far".into()));
        }
        if !(self.controller.duration >= 0.0) {
            return Err(ConfigError::Invalid("controller.duration must be >= 0".into()));
        }
        if !(self.render.max_pixel_ratio > 0.0) {
            return Err(ConfigError::Invalid("render.max_pixel_ratio must be > 0".into()));
        }
        if !(self.render.render_scale > 0.0 && self.render.render_scale <= 4.0) {
            return Err(ConfigError::Invalid("render.render_scale must be in (0, 4]".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::source::{block_on, MemorySource};
    use crate::rasterizer::tonemap::ToneMapping;
    use std::io::Write;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = ViewerConfig::from_ron_str("(controller: (tilt_range: 0.2), render: (environment_background: true))").unwrap();
        assert_eq!(config.controller.tilt_range, 0.2);
        assert_eq!(config.controller.duration, 0.9);
        assert!(config.render.environment_background);
        assert_eq!(config.render.tone_mapping.mode, ToneMapping::AcesFilmic);
        assert_eq!(config.assets, AssetConfig::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(ViewerConfig::from_ron_str("()").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = ViewerConfig::default();
        config.rgb_shift.amount = 0.004;
        config.controller.ease = Ease::Power3Out;
        config.render.clear_color = Color::new(1, 2, 3);
        let text = config.to_ron_string().unwrap();
        assert_eq!(ViewerConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_malformed_and_invalid() {
        assert!(matches!(ViewerConfig::from_ron_str("(camera: oops"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            ViewerConfig::from_ron_str("(camera: (near: 5.0, far: 1.0))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_ron_str("(render: (render_scale: 0.0))"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(rgb_shift: (amount: 0.01, angle: 1.0))").unwrap();
        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.rgb_shift.amount, 0.01);
        assert_eq!(config.rgb_shift.angle, 1.0);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = ViewerConfig::from_file(dir.path().join("viewer.ron"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
        assert_eq!(ViewerConfig::or_default(result), ViewerConfig::default());
    }

    #[test]
    fn test_from_source() {
        let source = MemorySource::default().with_file(CONFIG_PATH, "(camera: (distance: 6.0))");
        let config = block_on(ViewerConfig::from_source(&source, CONFIG_PATH)).unwrap();
        assert_eq!(config.camera.distance, 6.0);

        let missing = block_on(ViewerConfig::from_source(&MemorySource::default(), CONFIG_PATH));
        assert!(matches!(missing, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_falls_back_to_default() {
        let config = ViewerConfig::or_default(ViewerConfig::from_ron_str("not ron at all"));
        assert_eq!(config, ViewerConfig::default());
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;

/// Upper bound on `preset.max_particles`.
pub const MAX_PARTICLES_LIMIT: u32 = 4096;

/// Keywords accepted for `overlay.blend_mode`.
pub const BLEND_MODES: &[&str] = &[
    "normal",
    "multiply",
    "screen",
    "overlay",
    "darken",
    "lighten",
    "color-dodge",
    "color-burn",
    "hard-light",
    "soft-light",
    "difference",
    "exclusion",
    "hue",
    "saturation",
    "color",
    "luminosity",
    "plus-lighter",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config field `{field}` {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

/// Particle behavior for one trail look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailPreset {
    pub name: String,
    /// Pool cap. Spawning stops while the pool is full.
    pub max_particles: u32,
    /// Life removed from every particle per frame.
    pub life_decay: f64,
    /// Per-frame velocity multiplier.
    pub friction: f64,
    /// Spawn velocity is sampled per axis in `[-max_speed, max_speed)`.
    pub max_speed: f64,
    pub radius_min: f64,
    pub radius_max: f64,
    pub color: Color,
}

impl Default for TrailPreset {
    fn default() -> Self {
        Self {
            name: "Ember".into(),
            max_particles: 20,
            life_decay: 0.02,
            friction: 0.95,
            max_speed: 2.0,
            radius_min: 2.0,
            radius_max: 5.0,
            color: Color::EMBER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowStyle {
    /// Gradient radius; the glow is fully transparent past it.
    pub radius: f64,
    /// Half the side of the square the gradient is painted into.
    pub extent: f64,
    /// Peak opacity at the pointer.
    pub alpha: f64,
    pub color: Color,
}

impl Default for GlowStyle {
    fn default() -> Self {
        Self {
            radius: 30.0,
            extent: 40.0,
            alpha: 0.3,
            color: Color::EMBER,
        }
    }
}

/// How the host layers the overlay above page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub z_index: i32,
    /// CSS `mix-blend-mode` for hosts that composite with the page.
    pub blend_mode: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            z_index: 9999,
            blend_mode: "screen".into(),
        }
    }
}

impl OverlayStyle {
    /// Inline CSS for a fixed, full-viewport, input-transparent canvas.
    pub fn to_css(&self) -> String {
        format!(
            "position: fixed; top: 0; left: 0; z-index: {}; width: 100%; height: 100%; \
             mix-blend-mode: {}; pointer-events: none;",
            self.z_index, self.blend_mode
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub enabled: bool,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub preset: TrailPreset,
    pub glow: GlowStyle,
    pub overlay: OverlayStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: None,
            preset: TrailPreset::default(),
            glow: GlowStyle::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("loaded trail config `{}` from {}", config.preset.name, path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        let preset = &self.preset;
        if preset.max_particles == 0 {
            return invalid("preset.max_particles", "must be at least 1");
        }
        if preset.max_particles > MAX_PARTICLES_LIMIT {
            return invalid("preset.max_particles", "must not exceed 4096");
        }
        if !(preset.life_decay > 0.0 && preset.life_decay.is_finite()) {
            return invalid("preset.life_decay", "must be a positive number");
        }
        if !(preset.friction > 0.0 && preset.friction < 1.0) {
            return invalid("preset.friction", "must be between 0 and 1 (exclusive)");
        }
        // The sampled span is twice the speed and must stay finite.
        if !(preset.max_speed >= 0.0 && (preset.max_speed * 2.0).is_finite()) {
            return invalid("preset.max_speed", "must be zero or positive");
        }
        if !(preset.radius_min > 0.0 && preset.radius_min.is_finite()) {
            return invalid("preset.radius_min", "must be positive");
        }
        if !(preset.radius_max >= preset.radius_min && preset.radius_max.is_finite()) {
            return invalid("preset.radius_max", "must not be below radius_min");
        }
        let glow = &self.glow;
        if !(glow.radius > 0.0 && glow.radius.is_finite()) {
            return invalid("glow.radius", "must be positive");
        }
        if !(glow.extent >= 0.0 && glow.extent.is_finite()) {
            return invalid("glow.extent", "must be zero or positive");
        }
        if !(0.0..=1.0).contains(&glow.alpha) {
            return invalid("glow.alpha", "must be within 0..=1");
        }
        if !BLEND_MODES.contains(&self.overlay.blend_mode.as_str()) {
            return invalid("overlay.blend_mode", "must be a CSS mix-blend-mode keyword");
        }
        Ok(())
    }
}

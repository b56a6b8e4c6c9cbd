//! Embertrail core engine: platform-agnostic logic for the cursor glow, the
//! particle trail, and its configuration.

mod color;
mod config;
mod draw;
mod engine;
mod particle;

pub use color::{Color, ColorError};
pub use config::{ConfigError, EngineConfig, GlowStyle, OverlayStyle, TrailPreset};
pub use draw::DrawCommand;
pub use engine::TrailEngine;
pub use particle::{Particle, ParticlePool};

pub use glam::DVec2;

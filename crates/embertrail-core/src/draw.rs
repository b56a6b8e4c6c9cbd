use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Immediate-mode primitives the engine plans each frame and a host context
/// executes in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// Wipe the whole surface to transparent.
    Clear { width: u32, height: u32 },
    /// Radial gradient from `color` at `center` to transparent at `radius`,
    /// painted into the square `center ± extent` at global opacity `alpha`.
    Glow {
        center: DVec2,
        radius: f64,
        extent: f64,
        color: Color,
        alpha: f64,
    },
    /// Filled circle.
    Dot {
        center: DVec2,
        radius: f64,
        color: Color,
        alpha: f64,
    },
}

impl DrawCommand {
    pub fn is_glow(&self) -> bool {
        matches!(self, DrawCommand::Glow { .. })
    }

    pub fn is_dot(&self) -> bool {
        matches!(self, DrawCommand::Dot { .. })
    }
}

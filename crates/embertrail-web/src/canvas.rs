use std::f64::consts::TAU;

use embertrail_core::DrawCommand;
use embertrail_platform::{DrawContext, HostError, Result};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

/// Canvas 2D context of the trail overlay.
pub struct CanvasContext {
    ctx: CanvasRenderingContext2d,
}

impl CanvasContext {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl DrawContext for CanvasContext {
    #[allow(deprecated)]
    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        let ctx = &self.ctx;
        match *command {
            DrawCommand::Clear { width, height } => {
                ctx.clear_rect(0.0, 0.0, f64::from(width), f64::from(height));
            }
            DrawCommand::Glow {
                center,
                radius,
                extent,
                color,
                alpha,
            } => {
                let gradient = ctx
                    .create_radial_gradient(center.x, center.y, 0.0, center.x, center.y, radius)
                    .map_err(draw_err)?;
                gradient.add_color_stop(0.0, &color.to_hex()).map_err(draw_err)?;
                gradient.add_color_stop(1.0, "transparent").map_err(draw_err)?;
                ctx.save();
                ctx.set_global_alpha(alpha);
                ctx.set_fill_style(&gradient);
                ctx.fill_rect(center.x - extent, center.y - extent, extent * 2.0, extent * 2.0);
                ctx.restore();
            }
            DrawCommand::Dot {
                center,
                radius,
                color,
                alpha,
            } => {
                ctx.save();
                ctx.set_global_alpha(alpha);
                ctx.set_fill_style(&JsValue::from_str(&color.to_hex()));
                ctx.begin_path();
                let arc = ctx.arc(center.x, center.y, radius, 0.0, TAU);
                if arc.is_ok() {
                    ctx.fill();
                }
                ctx.restore();
                arc.map_err(draw_err)?;
            }
        }
        Ok(())
    }
}

fn draw_err(err: JsValue) -> HostError {
    HostError::Draw(format!("{err:?}"))
}

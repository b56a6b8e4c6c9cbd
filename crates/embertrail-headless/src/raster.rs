use bytemuck::{Pod, Zeroable};
use embertrail_core::{Color, DrawCommand};
use glam::DVec2;
use image::RgbaImage;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 0 };
}

/// Straight-alpha software canvas with source-over blending.
#[derive(Debug, Clone, Default)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba8::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resizing discards the contents, as a canvas does.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
    }

    pub fn execute(&mut self, command: &DrawCommand) {
        match *command {
            DrawCommand::Clear { width, height } => self.clear(width, height),
            DrawCommand::Glow {
                center,
                radius,
                extent,
                color,
                alpha,
            } => self.glow(center, radius, extent, color, alpha),
            DrawCommand::Dot {
                center,
                radius,
                color,
                alpha,
            } => self.dot(center, radius, color, alpha),
        }
    }

    fn clear(&mut self, width: u32, height: u32) {
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                let index = self.index(x, y);
                self.pixels[index] = Rgba8::TRANSPARENT;
            }
        }
    }

    fn glow(&mut self, center: DVec2, radius: f64, extent: f64, color: Color, alpha: f64) {
        let (min, max) = (center - DVec2::splat(extent), center + DVec2::splat(extent));
        self.for_pixels_in(min, max, color, |pixel_center| {
            let t = (pixel_center.distance(center) / radius).min(1.0);
            alpha * (1.0 - t)
        });
    }

    fn dot(&mut self, center: DVec2, radius: f64, color: Color, alpha: f64) {
        let (min, max) = (center - DVec2::splat(radius), center + DVec2::splat(radius));
        let radius_sq = radius * radius;
        self.for_pixels_in(min, max, color, |pixel_center| {
            if pixel_center.distance_squared(center) <= radius_sq {
                alpha
            } else {
                0.0
            }
        });
    }

    /// Blends `color` into every pixel whose center lies in `[min, max)`,
    /// at the opacity `coverage` returns for that center.
    fn for_pixels_in(&mut self, min: DVec2, max: DVec2, color: Color, coverage: impl Fn(DVec2) -> f64) {
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(self.width)) as u32;
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(self.height)) as u32;
        let (x0, x1) = (clamp_x(min.x.floor()), clamp_x(max.x.ceil()));
        let (y0, y1) = (clamp_y(min.y.floor()), clamp_y(max.y.ceil()));
        for y in y0..y1 {
            for x in x0..x1 {
                let pixel_center = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let inside = pixel_center.cmpge(min).all() && pixel_center.cmplt(max).all();
                if !inside {
                    continue;
                }
                let opacity = coverage(pixel_center).clamp(0.0, 1.0);
                if opacity > 0.0 {
                    let index = self.index(x, y);
                    self.pixels[index] = blend_over(self.pixels[index], color, opacity as f32);
                }
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

fn blend_over(dst: Rgba8, color: Color, src_alpha: f32) -> Rgba8 {
    let dst_alpha = f32::from(dst.a) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= 0.0 {
        return Rgba8::TRANSPARENT;
    }
    let [sr, sg, sb] = color.to_unit();
    let mix = |src: f32, dst: u8| {
        let dst = f32::from(dst) / 255.0;
        let value = (src * src_alpha + dst * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgba8 {
        r: mix(sr, dst.r),
        g: mix(sg, dst.g),
        b: mix(sb, dst.b),
        a: (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot_at(x: f64, y: f64, radius: f64, alpha: f64) -> DrawCommand {
        DrawCommand::Dot {
            center: DVec2::new(x, y),
            radius,
            color: Color::EMBER,
            alpha,
        }
    }

    #[test]
    fn opaque_dot_fills_its_center_only() {
        let mut fb = Framebuffer::new(20, 20);
        fb.execute(&dot_at(10.0, 10.0, 3.0, 1.0));
        assert_eq!(fb.pixel(10, 10), Some(Rgba8 { r: 0xFF, g: 0x6B, b: 0x35, a: 255 }));
        assert_eq!(fb.pixel(0, 0), Some(Rgba8::TRANSPARENT));
        assert_eq!(fb.pixel(10, 15), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn dot_opacity_sets_alpha() {
        let mut fb = Framebuffer::new(8, 8);
        fb.execute(&dot_at(4.0, 4.0, 2.0, 0.5));
        assert_eq!(fb.pixel(4, 4).map(|p| p.a), Some(128));
    }

    #[test]
    fn clipped_dot_does_not_panic() {
        let mut fb = Framebuffer::new(4, 4);
        fb.execute(&dot_at(-1.0, 2.0, 3.0, 1.0));
        fb.execute(&dot_at(100.0, 100.0, 3.0, 1.0));
        assert_eq!(fb.pixel(0, 2).map(|p| p.a), Some(255));
    }

    #[test]
    fn clear_resets_pixels() {
        let mut fb = Framebuffer::new(8, 8);
        fb.execute(&dot_at(4.0, 4.0, 4.0, 1.0));
        fb.execute(&DrawCommand::Clear { width: 8, height: 8 });
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn glow_fades_with_distance_and_stops_at_extent() {
        let mut fb = Framebuffer::new(100, 100);
        fb.execute(&DrawCommand::Glow {
            center: DVec2::new(50.0, 50.0),
            radius: 30.0,
            extent: 40.0,
            color: Color::EMBER,
            alpha: 0.3,
        });
        let near = fb.pixel(50, 50).unwrap().a;
        let mid = fb.pixel(65, 50).unwrap().a;
        assert!(near > mid && mid > 0);
        assert!(near <= 77);
        assert_eq!(fb.pixel(85, 50).unwrap().a, 0);
        assert_eq!(fb.pixel(95, 50).unwrap().a, 0);
    }

    #[test]
    fn image_export_matches_dimensions() {
        let fb = Framebuffer::new(16, 9);
        let image = fb.to_image().unwrap();
        assert_eq!(image.dimensions(), (16, 9));
    }
}

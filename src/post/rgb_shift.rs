//! Chromatic RGB shift
//!
//! Red is sampled ahead of each pixel along the shift direction and blue
//! behind it; green and alpha stay in place.

use super::{FrameContext, Pass};
use crate::rasterizer::Framebuffer;

#[derive(Debug, Clone, Copy)]
pub struct RgbShiftPass {
    /// Shift distance in UV units
    pub amount: f32,
    /// Shift direction in radians, 0 = along +x
    pub angle: f32,
}

impl RgbShiftPass {
    pub fn new(amount: f32, angle: f32) -> Self {
        Self { amount, angle }
    }

    /// UV offset for the red channel (blue uses the negation).
    /// UV y grows downward here, so a positive angle is negated to shift upward.
    pub fn offset(&self) -> (f32, f32) {
        (self.amount * self.angle.cos(), -self.amount * self.angle.sin())
    }
}

impl Default for RgbShiftPass {
    fn default() -> Self {
        Self::new(0.0015, 0.0)
    }
}

impl Pass for RgbShiftPass {
    fn name(&self) -> &str {
        "RgbShiftPass"
    }

    fn reads_input(&self) -> bool {
        true
    }

    fn render(&mut self, _ctx: &mut FrameContext, read: &Framebuffer, write: &mut Framebuffer) {
        let (w, h) = (write.width, write.height);
        let (ox, oy) = self.offset();
        let inv_w = 1.0 / w as f32;
        let inv_h = 1.0 / h as f32;

        for y in 0..h {
            let v = (y as f32 + 0.5) * inv_h;
            for x in 0..w {
                let u = (x as f32 + 0.5) * inv_w;
                let red = read.sample_bilinear(u + ox, v + oy);
                let center = read.sample_bilinear(u, v);
                let blue = read.sample_bilinear(u - ox, v - oy);

                let idx = (y * w + x) * 4;
                write.pixels[idx] = (red[0] + 0.5) as u8;
                write.pixels[idx + 1] = (center[1] + 0.5) as u8;
                write.pixels[idx + 2] = (blue[2] + 0.5) as u8;
                write.pixels[idx + 3] = (center[3] + 0.5) as u8;
            }
        }
    }
}

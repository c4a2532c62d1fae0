//! Tone mapping and output encoding
//!
//! Shading happens in linear HDR; every pixel passes through here exactly
//! once on its way into the 8-bit framebuffer.

use serde::{Serialize, Deserialize};
use super::types::{linear_to_srgb, Color, LinearColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Clamp only
    None,
    /// Multiply by exposure, then clamp
    Linear,
    /// ACES filmic curve (RRT + ODT fit)
    AcesFilmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMapper {
    pub mode: ToneMapping,
    pub exposure: f32,
}

impl Default for ToneMapper {
    fn default() -> Self {
        Self { mode: ToneMapping::AcesFilmic, exposure: 0.7 }
    }
}

impl ToneMapper {
    pub fn map(&self, c: LinearColor) -> LinearColor {
        match self.mode {
            ToneMapping::None => saturate(c),
            ToneMapping::Linear => saturate(c.scale(self.exposure)),
            ToneMapping::AcesFilmic => aces_filmic(c, self.exposure),
        }
    }

    /// Tone map, then encode to 8-bit sRGB
    pub fn encode(&self, c: LinearColor, alpha: f32) -> Color {
        let mapped = self.map(c);
        Color::with_alpha(
            to_u8(linear_to_srgb(mapped.r)),
            to_u8(linear_to_srgb(mapped.g)),
            to_u8(linear_to_srgb(mapped.b)),
            to_u8(alpha),
        )
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

fn saturate(c: LinearColor) -> LinearColor {
    LinearColor::new(c.r.clamp(0.0, 1.0), c.g.clamp(0.0, 1.0), c.b.clamp(0.0, 1.0))
}

fn rrt_and_odt_fit(v: f32) -> f32 {
    let a = v * (v + 0.024_578_6) - 0.000_090_537;
    let b = v * (0.983_729 * v + 0.432_951) + 0.238_081;
    a / b
}

fn aces_filmic(c: LinearColor, exposure: f32) -> LinearColor {
    let c = c.scale(exposure / 0.6);

    // sRGB => AP1 with the RRT saturation folded in
    let r = 0.597_19 * c.r + 0.354_58 * c.g + 0.048_23 * c.b;
    let g = 0.076_00 * c.r + 0.908_34 * c.g + 0.015_66 * c.b;
    let b = 0.028_40 * c.r + 0.133_83 * c.g + 0.837_77 * c.b;

    let (r, g, b) = (rrt_and_odt_fit(r), rrt_and_odt_fit(g), rrt_and_odt_fit(b));

    // ODT back to sRGB primaries
    saturate(LinearColor::new(
        1.604_75 * r - 0.531_08 * g - 0.073_67 * b,
        -0.102_08 * r + 1.108_13 * g - 0.006_05 * b,
        -0.003_27 * r - 0.072_76 * g + 1.076_02 * b,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aces_black_stays_black() {
        let tm = ToneMapper::default();
        let out = tm.encode(LinearColor::BLACK, 1.0);
        assert!(out.r <= 1 && out.g <= 1 && out.b <= 1);
        assert_eq!(out.a, 255);
    }

    #[test]
    fn test_aces_is_monotonic_and_bounded() {
        let tm = ToneMapper::default();
        let mut last = 0.0;
        for i in 0..50 {
            let v = tm.map(LinearColor::splat(i as f32 * 0.5)).g;
            assert!(v >= last - 1e-6);
            assert!(v <= 1.0);
            last = v;
        }
        assert!(last > 0.9);
    }

    #[test]
    fn test_linear_applies_exposure() {
        let tm = ToneMapper { mode: ToneMapping::Linear, exposure: 0.5 };
        let out = tm.map(LinearColor::splat(1.0));
        assert!((out.r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_is_encoded_linearly() {
        let tm = ToneMapper { mode: ToneMapping::None, exposure: 1.0 };
        assert_eq!(tm.encode(LinearColor::WHITE, 0.0).a, 0);
        assert_eq!(tm.encode(LinearColor::WHITE, 1.0).to_bytes(), [255, 255, 255, 255]);
    }
}

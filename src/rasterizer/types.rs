//! Core rasterizer types: colors, textures, vertices, faces

use serde::{Serialize, Deserialize};
use super::math::{Vec2, Vec3};

// =============================================================================
// Display Color (8-bit RGBA, what the framebuffer stores)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque_alpha")]
    pub a: u8,
}

fn opaque_alpha() -> u8 {
    255
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self { r: bytes[0], g: bytes[1], b: bytes[2], a: bytes[3] }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::TRANSPARENT
    }
}

// =============================================================================
// Linear (HDR) color used during shading
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl LinearColor {
    pub const BLACK: LinearColor = LinearColor { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: LinearColor = LinearColor { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn splat(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }

    pub fn scale(self, s: f32) -> Self {
        Self { r: self.r * s, g: self.g * s, b: self.b * s }
    }

    pub fn add(self, o: LinearColor) -> Self {
        Self { r: self.r + o.r, g: self.g + o.g, b: self.b + o.b }
    }

    pub fn mul(self, o: LinearColor) -> Self {
        Self { r: self.r * o.r, g: self.g * o.g, b: self.b * o.b }
    }

    pub fn lerp(self, o: LinearColor, t: f32) -> Self {
        Self {
            r: self.r + (o.r - self.r) * t,
            g: self.g + (o.g - self.g) * t,
            b: self.b + (o.b - self.b) * t,
        }
    }

    /// Decode an 8-bit sRGB color
    pub fn from_srgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: SRGB_TO_LINEAR[r as usize],
            g: SRGB_TO_LINEAR[g as usize],
            b: SRGB_TO_LINEAR[b as usize],
        }
    }
}

/// sRGB transfer function, decode direction
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB transfer function, encode direction
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

static SRGB_TO_LINEAR: std::sync::LazyLock<[f32; 256]> = std::sync::LazyLock::new(|| {
    let mut table = [0.0f32; 256];
    for (i, v) in table.iter_mut().enumerate() {
        *v = srgb_to_linear(i as f32 / 255.0);
    }
    table
});

// =============================================================================
// Textures
// =============================================================================

/// How texel values are encoded. Color textures (base color, emissive) are
/// sRGB; data textures (metallic-roughness) are linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[255, 255, 255, 255]; width * height],
            name: String::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        })
    }

    /// Nearest-neighbour sample with repeat wrapping
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [255, 255, 255, 255];
        }
        let u_wrapped = u.rem_euclid(1.0);
        let v_wrapped = v.rem_euclid(1.0);
        let tx = ((u_wrapped * self.width as f32) as usize).min(self.width - 1);
        let ty = ((v_wrapped * self.height as f32) as usize).min(self.height - 1);
        self.pixels[ty * self.width + tx]
    }

    /// Sample and decode to linear color plus alpha (0.0-1.0)
    pub fn sample_linear(&self, u: f32, v: f32, space: ColorSpace) -> (LinearColor, f32) {
        let [r, g, b, a] = self.sample(u, v);
        let color = match space {
            ColorSpace::Srgb => LinearColor::from_srgb8(r, g, b),
            ColorSpace::Linear => LinearColor::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0),
        };
        (color, a as f32 / 255.0)
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// A vertex with position, texture coordinate and normal
#[derive(Debug, Clone, Copy, Default)]
pub struct Vertex {
    pub pos: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(pos: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self { pos, uv, normal }
    }
}

/// A triangle face (indices into vertex array), counter-clockwise front face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

impl Face {
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self { v0, v1, v2 }
    }
}

// =============================================================================
// Lights
// =============================================================================

/// Uniform light applied to every surface regardless of orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: LinearColor,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn radiance(&self) -> LinearColor {
        self.color.scale(self.intensity)
    }
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self { color: LinearColor::WHITE, intensity: 0.9 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_roundtrip_midpoint() {
        let lin = srgb_to_linear(0.5);
        assert!((lin - 0.214).abs() < 0.001);
        assert!((linear_to_srgb(lin) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_srgb_lut_endpoints() {
        let black = LinearColor::from_srgb8(0, 0, 0);
        let white = LinearColor::from_srgb8(255, 255, 255);
        assert_eq!(black, LinearColor::BLACK);
        assert!((white.r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_texture_sample_wraps() {
        let mut tex = Texture::new(2, 2);
        tex.pixels[0] = [255, 0, 0, 255];
        tex.pixels[1] = [0, 0, 255, 255];
        assert_eq!(tex.sample(0.0, 0.0), [255, 0, 0, 255]);
        assert_eq!(tex.sample(1.0, 1.0), tex.sample(0.0, 0.0));
        assert_eq!(tex.sample(0.6, 0.0), [0, 0, 255, 255]);
        assert_eq!(tex.sample(-0.4, 0.0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_linear_sample_keeps_data_values() {
        let mut tex = Texture::new(1, 1);
        tex.pixels[0] = [0, 128, 255, 255];
        let (c, a) = tex.sample_linear(0.5, 0.5, ColorSpace::Linear);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert!((c.b - 1.0).abs() < 1e-6);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn test_color_deserializes_without_alpha() {
        let c: Color = ron::from_str("(r: 10, g: 20, b: 30)").unwrap();
        assert_eq!(c, Color::new(10, 20, 30));
    }
}

//! Equirectangular HDR environment maps
//!
//! The decoded panorama is reduced once, at load time, into three levels:
//! a radiance map for the background and mirror reflections, a blurred map
//! for rough reflections, and a cosine-convolved irradiance map for diffuse
//! light. The full-resolution source is dropped afterwards.

use std::f32::consts::PI;

use image::ImageFormat;

use super::source::{AssetSource, ProgressTracker};
use super::AssetError;
use crate::rasterizer::{LinearColor, Vec3};

const RADIANCE_SIZE: (usize, usize) = (256, 128);
const GLOSSY_SIZE: (usize, usize) = (32, 16);
const IRRADIANCE_SIZE: (usize, usize) = (16, 8);

/// Map a direction to equirect (u, v). `v = 1` is straight up.
pub fn direction_to_uv(dir: Vec3) -> (f32, f32) {
    let d = dir.normalize();
    let u = d.z.atan2(d.x) / (2.0 * PI) + 0.5;
    let v = d.y.clamp(-1.0, 1.0).asin() / PI + 0.5;
    (u, v)
}

fn uv_to_direction(u: f32, v: f32) -> Vec3 {
    let phi = (u - 0.5) * 2.0 * PI;
    let lat = (v - 0.5) * PI;
    Vec3::new(lat.cos() * phi.cos(), lat.sin(), lat.cos() * phi.sin())
}

/// One level of the map. Row 0 is the top of the panorama.
#[derive(Debug, Clone)]
struct EquirectImage {
    width: usize,
    height: usize,
    texels: Vec<LinearColor>,
}

impl EquirectImage {
    fn texel(&self, x: usize, y: usize) -> LinearColor {
        self.texels[y * self.width + x]
    }

    /// Direction through the centre of texel (x, y)
    fn texel_direction(&self, x: usize, y: usize) -> Vec3 {
        let u = (x as f32 + 0.5) / self.width as f32;
        let v = 1.0 - (y as f32 + 0.5) / self.height as f32;
        uv_to_direction(u, v)
    }

    /// Bilinear lookup, wrapping horizontally and clamping at the poles
    fn sample(&self, dir: Vec3) -> LinearColor {
        let (u, v) = direction_to_uv(dir);
        let fx = u * self.width as f32 - 0.5;
        let fy = ((1.0 - v) * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);

        let x0f = fx.floor();
        let tx = fx - x0f;
        let x0 = (x0f as i64).rem_euclid(self.width as i64) as usize;
        let x1 = (x0 + 1) % self.width;
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(self.height - 1);
        let ty = fy - y0 as f32;

        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), tx);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), tx);
        top.lerp(bottom, ty)
    }

    /// Box-filter down to at most `max` in each dimension
    fn downsample(&self, max: (usize, usize)) -> EquirectImage {
        let tw = self.width.min(max.0).max(1);
        let th = self.height.min(max.1).max(1);
        if tw == self.width && th == self.height {
            return self.clone();
        }

        let mut texels = Vec::with_capacity(tw * th);
        for ty in 0..th {
            let y_start = ty * self.height / th;
            let y_end = ((ty + 1) * self.height / th).max(y_start + 1);
            for tx in 0..tw {
                let x_start = tx * self.width / tw;
                let x_end = ((tx + 1) * self.width / tw).max(x_start + 1);

                let mut sum = LinearColor::BLACK;
                for y in y_start..y_end {
                    for x in x_start..x_end {
                        sum = sum.add(self.texel(x, y));
                    }
                }
                let count = ((y_end - y_start) * (x_end - x_start)) as f32;
                texels.push(sum.scale(1.0 / count));
            }
        }
        EquirectImage { width: tw, height: th, texels }
    }

    /// Cosine-weighted convolution over the sphere. Stored as irradiance / π,
    /// so a uniform environment of radiance L yields L.
    fn irradiance(&self, size: (usize, usize)) -> EquirectImage {
        // Solid angle of each source row shrinks toward the poles
        let d_phi = 2.0 * PI / self.width as f32;
        let d_theta = PI / self.height as f32;
        let mut samples: Vec<(Vec3, LinearColor)> = Vec::with_capacity(self.texels.len());
        for y in 0..self.height {
            for x in 0..self.width {
                let dir = self.texel_direction(x, y);
                let solid_angle = d_phi * d_theta * (1.0 - dir.y * dir.y).max(0.0).sqrt();
                samples.push((dir, self.texel(x, y).scale(solid_angle)));
            }
        }

        let mut out = EquirectImage {
            width: size.0,
            height: size.1,
            texels: vec![LinearColor::BLACK; size.0 * size.1],
        };
        for y in 0..size.1 {
            for x in 0..size.0 {
                let normal = out.texel_direction(x, y);
                let mut sum = LinearColor::BLACK;
                for (dir, weighted) in &samples {
                    let cos = normal.dot(*dir);
                    if cos > 0.0 {
                        sum = sum.add(weighted.scale(cos));
                    }
                }
                out.texels[y * size.0 + x] = sum.scale(1.0 / PI);
            }
        }
        out
    }
}

/// Prefiltered environment lighting
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    radiance: EquirectImage,
    glossy: EquirectImage,
    irradiance: EquirectImage,
}

impl EnvironmentMap {
    /// Build from row-major linear texels, top row first. Missing texels read as black.
    pub fn from_equirect(width: usize, height: usize, mut texels: Vec<LinearColor>) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        texels.resize(width * height, LinearColor::BLACK);

        let source = EquirectImage { width, height, texels };
        let radiance = source.downsample(RADIANCE_SIZE);
        let glossy = radiance.downsample(GLOSSY_SIZE);
        let irradiance = glossy.irradiance(IRRADIANCE_SIZE);

        Self { radiance, glossy, irradiance }
    }

    /// Radiance seen along `dir`
    pub fn background(&self, dir: Vec3) -> LinearColor {
        self.radiance.sample(dir)
    }

    /// Diffuse light arriving at a surface with normal `normal`, divided by π
    pub fn irradiance(&self, normal: Vec3) -> LinearColor {
        self.irradiance.sample(normal)
    }

    /// Reflected light along `dir`, blurred according to `roughness` (0.0-1.0)
    pub fn specular(&self, dir: Vec3, roughness: f32) -> LinearColor {
        let r = roughness.clamp(0.0, 1.0);
        if r < 0.5 {
            self.radiance.sample(dir).lerp(self.glossy.sample(dir), r * 2.0)
        } else {
            self.glossy.sample(dir).lerp(self.irradiance.sample(dir), (r - 0.5) * 2.0)
        }
    }

    #[cfg(test)]
    pub fn radiance_size(&self) -> (usize, usize) {
        (self.radiance.width, self.radiance.height)
    }
}

/// Fetch and decode a Radiance HDR panorama, then prefilter it
pub async fn load_environment<S: AssetSource>(
    source: &S,
    path: &str,
    progress: &ProgressTracker,
) -> Result<EnvironmentMap, AssetError> {
    progress.add_work(2);
    let bytes = source.read(path).await?;
    progress.complete_step();

    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Hdr)?.into_rgb32f();
    let (width, height) = image.dimensions();
    let texels = image
        .pixels()
        .map(|p| LinearColor::new(p.0[0], p.0[1], p.0[2]))
        .collect();

    let env = EnvironmentMap::from_equirect(width as usize, height as usize, texels);
    progress.complete_step();
    log::info!("environment {} decoded ({}x{})", path, width, height);
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::source::{block_on, MemorySource};

    fn split_map(top: LinearColor, bottom: LinearColor) -> EnvironmentMap {
        let (w, h) = (8, 4);
        let texels = (0..w * h)
            .map(|i| if i / w < h / 2 { top } else { bottom })
            .collect();
        EnvironmentMap::from_equirect(w, h, texels)
    }

    #[test]
    fn test_up_maps_to_top_row() {
        let (_, v) = direction_to_uv(Vec3::UP);
        assert!((v - 1.0).abs() < 1e-6);
        let env = split_map(LinearColor::new(1.0, 0.0, 0.0), LinearColor::new(0.0, 0.0, 1.0));
        let up = env.background(Vec3::UP);
        let down = env.background(Vec3::new(0.0, -1.0, 0.0));
        assert!(up.r > 0.99 && up.b < 0.01);
        assert!(down.b > 0.99 && down.r < 0.01);
    }

    #[test]
    fn test_uv_direction_roundtrip() {
        let dir = Vec3::new(0.3, 0.5, -0.8).normalize();
        let (u, v) = direction_to_uv(dir);
        assert!((uv_to_direction(u, v) - dir).len() < 1e-4);
    }

    #[test]
    fn test_uniform_environment_irradiance_matches_radiance() {
        let env = EnvironmentMap::from_equirect(64, 32, vec![LinearColor::splat(2.0); 64 * 32]);
        for n in [Vec3::UP, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -0.6, 0.8)] {
            let e = env.irradiance(n);
            assert!((e.g - 2.0).abs() < 0.1, "irradiance {:?} for {:?}", e, n);
        }
    }

    #[test]
    fn test_irradiance_favours_facing_hemisphere() {
        let env = split_map(LinearColor::splat(1.0), LinearColor::BLACK);
        assert!(env.irradiance(Vec3::UP).r > env.irradiance(Vec3::new(0.0, -1.0, 0.0)).r);
    }

    #[test]
    fn test_specular_spans_mirror_to_diffuse() {
        let env = split_map(LinearColor::splat(1.0), LinearColor::BLACK);
        let dir = Vec3::new(1.0, 0.2, 0.3);
        assert_eq!(env.specular(dir, 0.0), env.background(dir));
        assert_eq!(env.specular(dir, 1.0), env.irradiance(dir));
        // Rough reflections near the horizon pick up light from above
        assert!(env.specular(Vec3::new(1.0, -0.1, 0.0), 1.0).r > 0.0);
    }

    #[test]
    fn test_large_source_is_reduced() {
        let env = EnvironmentMap::from_equirect(512, 256, vec![LinearColor::BLACK; 512 * 256]);
        assert_eq!(env.radiance_size(), RADIANCE_SIZE);
    }

    #[test]
    fn test_load_environment_decodes_hdr() {
        let pixels = vec![image::Rgb([0.5f32, 1.0, 2.0]); 4 * 2];
        let mut bytes = Vec::new();
        image::codecs::hdr::HdrEncoder::new(&mut bytes)
            .encode(&pixels, 4, 2)
            .unwrap();

        let source = MemorySource::default().with_file("env.hdr", bytes);
        let progress = ProgressTracker::new();
        let env = block_on(load_environment(&source, "env.hdr", &progress)).unwrap();
        let c = env.background(Vec3::new(1.0, 0.0, 0.0));
        assert!((c.b - 2.0).abs() < 0.05);
        assert_eq!(progress.get().percent(), 100.0);
    }

    #[test]
    fn test_load_environment_rejects_garbage() {
        let source = MemorySource::default().with_file("env.hdr", b"not an hdr".to_vec());
        let err = block_on(load_environment(&source, "env.hdr", &ProgressTracker::new())).unwrap_err();
        assert!(matches!(err, AssetError::Image(_)));
    }
}

//! Viewport and drawing surface sizes

/// Window size in logical units (the units pointer positions arrive in)
/// and the device pixel ratio in effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    /// Zero or invalid sizes clamp to 1; the pixel ratio is capped at `max_pixel_ratio`.
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        let sane = |v: f32, fallback: f32| if v.is_finite() && v > 0.0 { v } else { fallback };
        Self {
            width: sane(width, 1.0).max(1.0),
            height: sane(height, 1.0).max(1.0),
            pixel_ratio: sane(device_pixel_ratio, 1.0).min(sane(max_pixel_ratio, 1.0)),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0, 1.0, 2.0)
    }
}

/// The drawing surface. Its pixel buffer is the viewport size times the
/// pixel ratio and the render scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSurface {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
    /// Extra downscale for the software rasterizer (1.0 = native resolution)
    pub render_scale: f32,
}

impl RenderSurface {
    pub fn new(viewport: &Viewport, render_scale: f32) -> Self {
        let mut surface = Self {
            width: viewport.width,
            height: viewport.height,
            pixel_ratio: viewport.pixel_ratio,
            render_scale: if render_scale.is_finite() && render_scale > 0.0 { render_scale } else { 1.0 },
        };
        surface.set_size(viewport.width, viewport.height);
        surface
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    /// Framebuffer dimensions in pixels, at least 1x1
    pub fn buffer_size(&self) -> (usize, usize) {
        let scale = self.pixel_ratio * self.render_scale;
        let w = (self.width * scale).round().max(1.0) as usize;
        let h = (self.height * scale).round().max(1.0) as usize;
        (w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_is_capped() {
        let vp = Viewport::new(100.0, 50.0, 3.0, 2.0);
        assert_eq!(vp.pixel_ratio, 2.0);
        assert_eq!(vp.aspect(), 2.0);
    }

    #[test]
    fn test_degenerate_sizes_clamp() {
        let vp = Viewport::new(0.0, f32::NAN, -1.0, 2.0);
        assert_eq!((vp.width, vp.height, vp.pixel_ratio), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_buffer_size_scales() {
        let vp = Viewport::new(640.0, 360.0, 2.0, 2.0);
        let surface = RenderSurface::new(&vp, 0.5);
        assert_eq!(surface.buffer_size(), (640, 360));
        let tiny = RenderSurface::new(&Viewport::new(1.0, 1.0, 1.0, 2.0), 0.25);
        assert_eq!(tiny.buffer_size(), (1, 1));
    }
}

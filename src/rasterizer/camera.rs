//! Perspective camera for 3D rendering
//!
//! Orientation is stored as pitch/yaw with computed basis vectors. The
//! camera basis uses -Y as up so camera-space Y already matches screen rows.

use super::math::{perspective_transform, Vec3};

/// Camera state for 3D rendering
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub rotation_x: f32, // Pitch
    pub rotation_y: f32, // Yaw

    // Computed basis vectors
    pub basis_x: Vec3,
    pub basis_y: Vec3,
    pub basis_z: Vec3,

    /// Vertical field of view in degrees
    pub fov_y: f32,
    /// Width / height of the drawing surface
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    /// 1 / tan(fov_y / 2), refreshed by `update_projection`
    focal: f32,
}

impl Camera {
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            position: Vec3::ZERO,
            rotation_x: 0.0,
            rotation_y: 0.0,
            basis_x: Vec3::new(1.0, 0.0, 0.0),
            basis_y: Vec3::new(0.0, 1.0, 0.0),
            basis_z: Vec3::new(0.0, 0.0, 1.0),
            fov_y,
            aspect,
            near,
            far,
            focal: 1.0,
        };
        cam.update_basis();
        cam.update_projection();
        cam
    }

    /// Place the camera on the +Z axis looking back at the origin
    pub fn looking_down_neg_z(mut self, distance: f32) -> Self {
        self.position = Vec3::new(0.0, 0.0, distance);
        self.rotation_x = 0.0;
        self.rotation_y = std::f32::consts::PI;
        self.update_basis();
        self
    }

    pub fn update_basis(&mut self) {
        let upward = Vec3::new(0.0, -1.0, 0.0);  // Use -Y as up to match screen coordinates

        self.basis_z = Vec3 {
            x: self.rotation_x.cos() * self.rotation_y.sin(),
            y: -self.rotation_x.sin(),
            z: self.rotation_x.cos() * self.rotation_y.cos(),
        };

        self.basis_x = upward.cross(self.basis_z).normalize();
        self.basis_y = self.basis_z.cross(self.basis_x);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    /// Recompute cached projection terms after changing fov or aspect
    pub fn update_projection(&mut self) {
        let half = (self.fov_y.to_radians() * 0.5).tan();
        self.focal = if half > 0.0 { 1.0 / half } else { 1.0 };
    }

    pub fn to_camera_space(&self, world: Vec3) -> Vec3 {
        perspective_transform(world - self.position, self.basis_x, self.basis_y, self.basis_z)
    }

    /// Project a camera-space point to framebuffer coordinates.
    /// Returned z is the camera-space depth, kept for perspective-correct interpolation.
    pub fn project(&self, cam: Vec3, width: usize, height: usize) -> Vec3 {
        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        if cam.z.abs() < 1e-6 {
            return Vec3::new(half_w, half_h, cam.z);
        }
        let ndc_x = cam.x * self.focal / (self.aspect * cam.z);
        let ndc_y = cam.y * self.focal / cam.z;
        Vec3::new(ndc_x * half_w + half_w, ndc_y * half_h + half_h, cam.z)
    }

    /// World-space direction of the view ray through framebuffer pixel (sx, sy)
    pub fn view_ray(&self, sx: f32, sy: f32, width: usize, height: usize) -> Vec3 {
        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        let ndc_x = (sx - half_w) / half_w;
        let ndc_y = (sy - half_h) / half_h;
        let cx = ndc_x * self.aspect / self.focal;
        let cy = ndc_y / self.focal;
        (self.basis_x.scale(cx) + self.basis_y.scale(cy) + self.basis_z).normalize()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(48.0, 16.0 / 9.0, 0.1, 1000.0).looking_down_neg_z(4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_looks_at_origin() {
        let cam = Camera::default();
        let c = cam.to_camera_space(Vec3::ZERO);
        assert!(c.x.abs() < 1e-4 && c.y.abs() < 1e-4);
        assert!((c.z - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_world_up_projects_above_center() {
        let cam = Camera::default();
        let screen = cam.project(cam.to_camera_space(Vec3::new(0.0, 1.0, 0.0)), 200, 100);
        assert!(screen.y < 50.0);
        let screen = cam.project(cam.to_camera_space(Vec3::new(1.0, 0.0, 0.0)), 200, 100);
        assert!(screen.x > 100.0);
    }

    #[test]
    fn test_view_ray_through_projected_point() {
        let cam = Camera::default();
        let target = Vec3::new(0.5, -0.3, 0.2);
        let screen = cam.project(cam.to_camera_space(target), 320, 180);
        let ray = cam.view_ray(screen.x, screen.y, 320, 180);
        let expected = (target - cam.position).normalize();
        assert!((ray - expected).len() < 1e-3);
    }

    #[test]
    fn test_set_aspect_changes_horizontal_scale() {
        let mut cam = Camera::default();
        let p = cam.to_camera_space(Vec3::new(1.0, 0.0, 0.0));
        let wide = cam.project(p, 100, 100).x;
        cam.set_aspect(1.0);
        let square = cam.project(p, 100, 100).x;
        assert!(square > wide);
    }
}

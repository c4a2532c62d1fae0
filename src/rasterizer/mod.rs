//! Software rasterizer
//!
//! Perspective-correct triangle rasterization into an RGBA framebuffer,
//! shaded with a metallic-roughness model lit by ambient light and a
//! prefiltered environment map.
//!
//! # Module Organization
//!
//! - `types` - Color, LinearColor, Texture, Vertex, Face, AmbientLight
//! - `math` - Vec3, Vec2, 4x4 matrices
//! - `camera` - Perspective camera
//! - `tonemap` - HDR to display encoding
//! - `render` - Framebuffer and scene rendering

pub mod camera;
pub mod math;
pub mod render;
pub mod tonemap;
pub mod types;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use types::{AmbientLight, Color, Face, LinearColor, Texture, Vertex};

pub use math::{
    Vec2, Vec3, Mat4,
    mat4_identity, mat4_mul, mat4_from_cols, mat4_from_position_rotation_scale,
    mat4_transform_point, mat4_transform_vector, mat4_normal_matrix,
};

pub use camera::Camera;

pub use tonemap::ToneMapper;

pub use render::{render_scene, Framebuffer, RenderStats};

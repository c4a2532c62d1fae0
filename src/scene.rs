//! Scene graph host
//!
//! Holds the camera, lights, the optional environment map and, once the
//! asynchronous load finishes, exactly one model node.

use crate::asset::EnvironmentMap;
use crate::rasterizer::{
    mat4_from_position_rotation_scale, AmbientLight, Camera, Color, Face, LinearColor, Mat4,
    Texture, ToneMapper, Vec3, Vertex,
};
use crate::tween::Lerp;

/// Model rotation in radians about the X and Y axes (Euler XYZ order, Z fixed at 0)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub x: f32,
    pub y: f32,
}

impl Orientation {
    pub const NEUTRAL: Orientation = Orientation { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Lerp for Orientation {
    fn lerp(self, to: Self, t: f32) -> Self {
        Orientation {
            x: self.x.lerp(to.x, t),
            y: self.y.lerp(to.y, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaMode {
    Opaque,
    /// Discard fragments with alpha below the cutoff
    Mask(f32),
    /// Blend over what is already drawn, without writing depth
    Blend,
}

/// Metallic-roughness material. Texture fields index `ModelNode::textures`.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Linear RGBA
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    /// Roughness in G, metalness in B
    pub metallic_roughness_texture: Option<usize>,
    pub emissive_factor: LinearColor,
    pub emissive_texture: Option<usize>,
    pub double_sided: bool,
    pub alpha_mode: AlphaMode,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            emissive_factor: LinearColor::BLACK,
            emissive_texture: None,
            double_sided: false,
            alpha_mode: AlphaMode::Opaque,
        }
    }
}

/// Triangle list sharing one material, in model space
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
    pub material: usize,
}

/// The loaded model: geometry with node transforms baked in, plus its materials
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub position: Vec3,
    pub scale: f32,
    /// The only animated property
    pub rotation: Orientation,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            position: Vec3::ZERO,
            scale: 1.0,
            rotation: Orientation::NEUTRAL,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        mat4_from_position_rotation_scale(
            self.position,
            Vec3::new(self.rotation.x, self.rotation.y, 0.0),
            self.scale,
        )
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.faces.len()).sum()
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }
}

/// What fills pixels not covered by the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Solid clear color (transparent by default so the page shows through)
    Clear(Color),
    /// The environment map seen along each view ray; falls back to the clear color until loaded
    Environment { fallback: Color },
}

pub struct Scene {
    pub camera: Camera,
    pub ambient: AmbientLight,
    /// Image-based lighting, present once the HDR load completes
    pub environment: Option<EnvironmentMap>,
    pub environment_intensity: f32,
    pub background: Background,
    pub tone_mapping: ToneMapper,
    model: Option<ModelNode>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ambient: AmbientLight::default(),
            environment: None,
            environment_intensity: 1.0,
            background: Background::Clear(Color::TRANSPARENT),
            tone_mapping: ToneMapper::default(),
            model: None,
        }
    }

    /// Install the loaded model. The slot is written once; later attaches are ignored.
    pub fn attach_model(&mut self, model: ModelNode) -> bool {
        if self.model.is_some() {
            log::warn!("model already attached, ignoring {}", model.name);
            return false;
        }
        log::info!(
            "attached model {} ({} meshes, {} triangles)",
            model.name,
            model.meshes.len(),
            model.triangle_count()
        );
        self.model = Some(model);
        true
    }

    pub fn model(&self) -> Option<&ModelNode> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut ModelNode> {
        self.model.as_mut()
    }

    pub fn set_environment(&mut self, environment: EnvironmentMap) {
        self.environment = Some(environment);
    }
}

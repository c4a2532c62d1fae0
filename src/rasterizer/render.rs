//! Core rendering functions
//! Framebuffer plus perspective-correct triangle rasterization with PBR-lite shading

use super::camera::Camera;
use super::math::{mat4_normal_matrix, mat4_transform_point, mat4_transform_vector, Vec2, Vec3};
use super::tonemap::ToneMapper;
use super::types::{ColorSpace, Color, LinearColor, Texture};
use crate::asset::EnvironmentMap;
use crate::scene::{AlphaMode, Background, Material, ModelNode, Scene};

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>,    // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>,  // Depth buffer
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![f32::MAX; width * height],
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height * 4];
            self.zbuffer = vec![f32::MAX; width * height];
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.clear_depth();
    }

    pub fn clear_depth(&mut self) {
        self.zbuffer.fill(f32::MAX);
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            Some(Color::from_bytes([
                self.pixels[idx],
                self.pixels[idx + 1],
                self.pixels[idx + 2],
                self.pixels[idx + 3],
            ]))
        } else {
            None
        }
    }

    /// Write pixel if it passes the depth test, updating depth
    pub fn set_pixel_with_depth(&mut self, x: usize, y: usize, z: f32, color: Color) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if z < self.zbuffer[idx] {
                self.zbuffer[idx] = z;
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Source-over composite of `color` (its alpha is coverage) onto the stored pixel
    pub fn blend_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 4;
        let a = color.a as f32 / 255.0;
        let src = color.to_bytes();
        for c in 0..3 {
            let back = self.pixels[idx + c] as f32;
            self.pixels[idx + c] = (src[c] as f32 * a + back * (1.0 - a) + 0.5) as u8;
        }
        let back_a = self.pixels[idx + 3] as f32 / 255.0;
        let out_a = a + back_a * (1.0 - a);
        self.pixels[idx + 3] = (out_a * 255.0 + 0.5) as u8;
    }

    /// Bilinear sample at normalized (u, v), clamped to edge.
    /// Returns RGBA channels in 0.0-255.0.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let fx = (u * self.width as f32 - 0.5).clamp(0.0, max_x);
        let fy = (v * self.height as f32 - 0.5).clamp(0.0, max_y);

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let texel = |x: usize, y: usize, c: usize| self.pixels[(y * self.width + x) * 4 + c] as f32;

        let mut out = [0.0; 4];
        for (c, slot) in out.iter_mut().enumerate() {
            let top = texel(x0, y0, c) * (1.0 - tx) + texel(x1, y0, c) * tx;
            let bottom = texel(x0, y1, c) * (1.0 - tx) + texel(x1, y1, c) * tx;
            *slot = top * (1.0 - ty) + bottom * ty;
        }
        out
    }
}

/// Per-frame counters
///
/// Culling is whole-triangle: there is no near-plane clipping, so a triangle
/// with one vertex closer than `near` is dropped along with its visible part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub triangles_drawn: usize,
    /// Back faces, and triangles touching the near plane or wholly beyond the far plane
    pub triangles_culled: usize,
}

/// Lighting inputs shared by every fragment of a frame
struct ShadeContext<'a> {
    camera_pos: Vec3,
    ambient: LinearColor,
    environment: Option<&'a EnvironmentMap>,
    environment_intensity: f32,
    tone: ToneMapper,
}

/// Triangle ready for rasterization
struct Surface {
    v1: Vec3, // Screen-space vertex 1 (z = camera depth)
    v2: Vec3,
    v3: Vec3,
    w1: Vec3, // World-space positions
    w2: Vec3,
    w3: Vec3,
    n1: Vec3, // World-space normals, flipped for visible back faces
    n2: Vec3,
    n3: Vec3,
    uv1: Vec2,
    uv2: Vec2,
    uv3: Vec2,
    material: usize,
    depth: f32, // Mean camera depth, for back-to-front blending
}

/// Render the scene into `fb`: background first, then the model if attached
pub fn render_scene(fb: &mut Framebuffer, scene: &Scene) -> RenderStats {
    draw_background(fb, scene);

    match scene.model() {
        Some(model) => {
            let ctx = ShadeContext {
                camera_pos: scene.camera.position,
                ambient: scene.ambient.radiance(),
                environment: scene.environment.as_ref(),
                environment_intensity: scene.environment_intensity,
                tone: scene.tone_mapping,
            };
            render_model(fb, model, &scene.camera, &ctx)
        }
        None => RenderStats::default(),
    }
}

fn draw_background(fb: &mut Framebuffer, scene: &Scene) {
    match (scene.background, scene.environment.as_ref()) {
        (Background::Clear(color), _) => fb.clear(color),
        (Background::Environment { fallback }, None) => fb.clear(fallback),
        (Background::Environment { .. }, Some(env)) => {
            let (w, h) = (fb.width, fb.height);
            for y in 0..h {
                for x in 0..w {
                    let dir = scene.camera.view_ray(x as f32 + 0.5, y as f32 + 0.5, w, h);
                    let radiance = env.background(dir).scale(scene.environment_intensity);
                    fb.set_pixel(x, y, scene.tone_mapping.encode(radiance, 1.0));
                }
            }
            fb.clear_depth();
        }
    }
}

/// Transform, cull and rasterize every mesh of the model.
/// Opaque and masked surfaces go first; blended surfaces follow, far to near.
fn render_model(fb: &mut Framebuffer, model: &ModelNode, camera: &Camera, ctx: &ShadeContext) -> RenderStats {
    let mut stats = RenderStats::default();
    let model_matrix = model.model_matrix();
    let normal_matrix = mat4_normal_matrix(&model_matrix);
    let default_material = Material::default();

    let mut opaque: Vec<Surface> = Vec::new();
    let mut blended: Vec<Surface> = Vec::new();

    for mesh in &model.meshes {
        let material = model.material(mesh.material).unwrap_or(&default_material);

        // === TRANSFORM PHASE ===
        let mut world_positions: Vec<Vec3> = Vec::with_capacity(mesh.vertices.len());
        let mut world_normals: Vec<Vec3> = Vec::with_capacity(mesh.vertices.len());
        let mut cam_positions: Vec<Vec3> = Vec::with_capacity(mesh.vertices.len());
        let mut projected: Vec<Vec3> = Vec::with_capacity(mesh.vertices.len());

        for v in &mesh.vertices {
            let world = mat4_transform_point(&model_matrix, v.pos);
            let cam = camera.to_camera_space(world);
            world_positions.push(world);
            world_normals.push(mat4_transform_vector(&normal_matrix, v.normal).normalize());
            cam_positions.push(cam);
            projected.push(camera.project(cam, fb.width, fb.height));
        }

        // === CULL PHASE ===
        for face in &mesh.faces {
            let (i1, i2, i3) = (face.v0, face.v1, face.v2);
            if i1 >= mesh.vertices.len() || i2 >= mesh.vertices.len() || i3 >= mesh.vertices.len() {
                stats.triangles_culled += 1;
                continue;
            }

            let c1 = cam_positions[i1];
            let c2 = cam_positions[i2];
            let c3 = cam_positions[i3];

            // Whole-triangle cull: any vertex in front of the near plane, or all past the far plane
            if c1.z <= camera.near || c2.z <= camera.near || c3.z <= camera.near {
                stats.triangles_culled += 1;
                continue;
            }
            if c1.z > camera.far && c2.z > camera.far && c3.z > camera.far {
                stats.triangles_culled += 1;
                continue;
            }

            let v1 = projected[i1];
            let v2 = projected[i2];
            let v3 = projected[i3];

            // Screen y points down, so counter-clockwise front faces have negative area
            let signed_area = (v2.x - v1.x) * (v3.y - v1.y) - (v3.x - v1.x) * (v2.y - v1.y);
            let is_backface = signed_area >= 0.0;
            if is_backface && !material.double_sided {
                stats.triangles_culled += 1;
                continue;
            }

            let flip = if is_backface { -1.0 } else { 1.0 };
            let surface = Surface {
                v1,
                v2,
                v3,
                w1: world_positions[i1],
                w2: world_positions[i2],
                w3: world_positions[i3],
                n1: world_normals[i1].scale(flip),
                n2: world_normals[i2].scale(flip),
                n3: world_normals[i3].scale(flip),
                uv1: mesh.vertices[i1].uv,
                uv2: mesh.vertices[i2].uv,
                uv3: mesh.vertices[i3].uv,
                material: mesh.material,
                depth: (c1.z + c2.z + c3.z) / 3.0,
            };

            if material.alpha_mode == AlphaMode::Blend {
                blended.push(surface);
            } else {
                opaque.push(surface);
            }
        }
    }

    // === DRAW PHASE ===
    blended.sort_by(|a, b| b.depth.total_cmp(&a.depth));

    for surface in opaque.iter().chain(blended.iter()) {
        let material = model.material(surface.material).unwrap_or(&default_material);
        rasterize_triangle(fb, surface, material, &model.textures, ctx);
        stats.triangles_drawn += 1;
    }

    stats
}

fn rasterize_triangle(
    fb: &mut Framebuffer,
    surface: &Surface,
    material: &Material,
    textures: &[Texture],
    ctx: &ShadeContext,
) {
    // Bounding box
    let min_x = surface.v1.x.min(surface.v2.x).min(surface.v3.x).max(0.0) as usize;
    let max_x = (surface.v1.x.max(surface.v2.x).max(surface.v3.x) + 1.0).min(fb.width as f32) as usize;
    let min_y = surface.v1.y.min(surface.v2.y).min(surface.v3.y).max(0.0) as usize;
    let max_y = (surface.v1.y.max(surface.v2.y).max(surface.v3.y) + 1.0).min(fb.height as f32) as usize;

    // Early exit for degenerate/off-screen triangles
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    // === EDGE FUNCTION SETUP ===
    // For barycentric: bc.x = E23/area, bc.y = E31/area, bc.z = 1 - bc.x - bc.y

    let v1 = surface.v1;
    let v2 = surface.v2;
    let v3 = surface.v3;

    let area = (v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y);
    if area.abs() < 0.00001 {
        return; // Degenerate triangle
    }
    let inv_area = 1.0 / area;

    let a0 = v2.y - v3.y;
    let b0 = v3.x - v2.x;
    let a1 = v3.y - v1.y;
    let b1 = v1.x - v3.x;

    let inv_z1 = 1.0 / v1.z;
    let inv_z2 = 1.0 / v2.z;
    let inv_z3 = 1.0 / v3.z;

    let blend = material.alpha_mode == AlphaMode::Blend;

    // Sample at pixel centers
    let start_x = min_x as f32 + 0.5;
    let start_y = min_y as f32 + 0.5;

    let mut w0_row = a0 * (start_x - v3.x) + b0 * (start_y - v3.y);
    let mut w1_row = a1 * (start_x - v3.x) + b1 * (start_y - v3.y);

    for y in min_y..max_y {
        let mut w0 = w0_row;
        let mut w1 = w1_row;

        for x in min_x..max_x {
            let bc_x = w0 * inv_area;
            let bc_y = w1 * inv_area;
            let bc_z = 1.0 - bc_x - bc_y;

            const ERR: f32 = -0.0001;
            if bc_x >= ERR && bc_y >= ERR && bc_z >= ERR {
                // 1/z interpolates linearly in screen space
                let inv_z_interp = bc_x * inv_z1 + bc_y * inv_z2 + bc_z * inv_z3;
                let z = 1.0 / inv_z_interp;
                let idx = y * fb.width + x;

                if z < fb.zbuffer[idx] {
                    // Perspective-correct attribute weights
                    let p1 = bc_x * inv_z1 * z;
                    let p2 = bc_y * inv_z2 * z;
                    let p3 = bc_z * inv_z3 * z;

                    let uv = Vec2::new(
                        p1 * surface.uv1.x + p2 * surface.uv2.x + p3 * surface.uv3.x,
                        p1 * surface.uv1.y + p2 * surface.uv2.y + p3 * surface.uv3.y,
                    );
                    let world = surface.w1.scale(p1) + surface.w2.scale(p2) + surface.w3.scale(p3);
                    let normal = (surface.n1.scale(p1) + surface.n2.scale(p2) + surface.n3.scale(p3)).normalize();

                    if let Some((color, alpha)) = shade_fragment(material, textures, uv, world, normal, ctx) {
                        if blend {
                            fb.blend_pixel(x, y, ctx.tone.encode(color, alpha));
                        } else {
                            fb.zbuffer[idx] = z;
                            fb.set_pixel(x, y, ctx.tone.encode(color, 1.0));
                        }
                    }
                }
            }

            w0 += a0;
            w1 += a1;
        }

        w0_row += b0;
        w1_row += b1;
    }
}

fn sample_texture(
    textures: &[Texture],
    index: Option<usize>,
    uv: Vec2,
    space: ColorSpace,
) -> Option<(LinearColor, f32)> {
    index
        .and_then(|i| textures.get(i))
        .map(|tex| tex.sample_linear(uv.x, uv.y, space))
}

/// Metallic-roughness shading against ambient light and the environment.
/// Returns linear radiance and coverage, or None when alpha-masked away.
fn shade_fragment(
    material: &Material,
    textures: &[Texture],
    uv: Vec2,
    world: Vec3,
    normal: Vec3,
    ctx: &ShadeContext,
) -> Option<(LinearColor, f32)> {
    let [fr, fg, fb, fa] = material.base_color_factor;
    let mut base = LinearColor::new(fr, fg, fb);
    let mut alpha = fa;
    if let Some((texel, texel_alpha)) = sample_texture(textures, material.base_color_texture, uv, ColorSpace::Srgb) {
        base = base.mul(texel);
        alpha *= texel_alpha;
    }

    match material.alpha_mode {
        AlphaMode::Mask(cutoff) if alpha < cutoff => return None,
        AlphaMode::Mask(_) | AlphaMode::Opaque => alpha = 1.0,
        AlphaMode::Blend => {}
    }

    let mut metallic = material.metallic_factor;
    let mut roughness = material.roughness_factor;
    if let Some((mr, _)) = sample_texture(textures, material.metallic_roughness_texture, uv, ColorSpace::Linear) {
        roughness *= mr.g;
        metallic *= mr.b;
    }
    let metallic = metallic.clamp(0.0, 1.0);
    let roughness = roughness.clamp(0.04, 1.0);

    let mut emissive = material.emissive_factor;
    if let Some((texel, _)) = sample_texture(textures, material.emissive_texture, uv, ColorSpace::Srgb) {
        emissive = emissive.mul(texel);
    }

    let view = (ctx.camera_pos - world).normalize();
    let n_dot_v = normal.dot(view).clamp(0.0, 1.0);

    // Diffuse: ambient plus environment irradiance
    let mut irradiance = ctx.ambient;
    if let Some(env) = ctx.environment {
        irradiance = irradiance.add(env.irradiance(normal).scale(ctx.environment_intensity));
    }
    let diffuse = base.scale(1.0 - metallic).mul(irradiance);

    // Specular: prefiltered environment along the reflection vector, Schlick fresnel
    let specular = match ctx.environment {
        Some(env) => {
            let f0 = LinearColor::splat(0.04).lerp(base, metallic);
            let grazing = (1.0 - n_dot_v).powi(5);
            let f90 = LinearColor::splat((1.0 - roughness).max(0.04));
            let fresnel = f0.lerp(f90, grazing);
            let reflected = (-view).reflect(normal);
            env.specular(reflected, roughness)
                .scale(ctx.environment_intensity)
                .mul(fresnel)
        }
        None => LinearColor::BLACK,
    };

    Some((diffuse.add(specular).add(emissive), alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Face, Vertex};
    use crate::scene::Mesh;

    fn scene_with_triangle(reversed: bool, material: Material) -> Scene {
        let mut scene = Scene::new(Camera::default());
        let mut model = ModelNode::new("tri");
        let n = Vec3::new(0.0, 0.0, 1.0);
        let vertices = vec![
            Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec2::default(), n),
            Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec2::default(), n),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec2::default(), n),
        ];
        let face = if reversed { Face::new(0, 2, 1) } else { Face::new(0, 1, 2) };
        model.meshes.push(Mesh { name: "tri".into(), vertices, faces: vec![face], material: 0 });
        model.materials.push(material);
        scene.attach_model(model);
        scene
    }

    fn dielectric() -> Material {
        Material { metallic_factor: 0.0, ..Material::default() }
    }

    #[test]
    fn test_clear_and_get_pixel() {
        let mut fb = Framebuffer::new(4, 3);
        fb.clear(Color::new(10, 20, 30));
        assert_eq!(fb.get_pixel(3, 2), Some(Color::new(10, 20, 30)));
        assert_eq!(fb.get_pixel(4, 0), None);
        assert!(fb.zbuffer.iter().all(|z| *z == f32::MAX));
    }

    #[test]
    fn test_resize_reallocates() {
        let mut fb = Framebuffer::new(2, 2);
        fb.resize(5, 4);
        assert_eq!(fb.pixels.len(), 5 * 4 * 4);
        assert_eq!(fb.zbuffer.len(), 20);
    }

    #[test]
    fn test_front_facing_triangle_is_drawn() {
        let scene = scene_with_triangle(false, dielectric());
        let mut fb = Framebuffer::new(64, 36);
        let stats = render_scene(&mut fb, &scene);
        assert_eq!(stats.triangles_drawn, 1);
        let center = fb.get_pixel(32, 18).unwrap();
        assert_eq!(center.a, 255);
        assert!(center.r > 0);
        // Corners stay transparent
        assert_eq!(fb.get_pixel(0, 0), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_back_face_culled_unless_double_sided() {
        let scene = scene_with_triangle(true, dielectric());
        let mut fb = Framebuffer::new(64, 36);
        let stats = render_scene(&mut fb, &scene);
        assert_eq!(stats.triangles_drawn, 0);
        assert_eq!(stats.triangles_culled, 1);
        assert_eq!(fb.get_pixel(32, 18), Some(Color::TRANSPARENT));

        let scene = scene_with_triangle(true, Material { double_sided: true, ..dielectric() });
        let stats = render_scene(&mut fb, &scene);
        assert_eq!(stats.triangles_drawn, 1);
        assert_eq!(fb.get_pixel(32, 18).map(|c| c.a), Some(255));
    }

    #[test]
    fn test_triangle_behind_camera_is_culled() {
        let mut scene = scene_with_triangle(false, dielectric());
        if let Some(model) = scene.model_mut() {
            model.position = Vec3::new(0.0, 0.0, 10.0);
        }
        let mut fb = Framebuffer::new(32, 18);
        let stats = render_scene(&mut fb, &scene);
        assert_eq!(stats.triangles_drawn, 0);
        assert_eq!(stats.triangles_culled, 1);
    }

    #[test]
    fn test_triangle_crossing_near_plane_is_dropped_whole() {
        let mut scene = scene_with_triangle(false, dielectric());
        if let Some(model) = scene.model_mut() {
            // Camera sits at z = 4 with near = 0.1; this vertex is 0.05 in front of it
            model.meshes[0].vertices[2].pos.z = 3.95;
        }
        let mut fb = Framebuffer::new(32, 18);
        let stats = render_scene(&mut fb, &scene);
        assert_eq!(stats.triangles_drawn, 0);
        assert_eq!(stats.triangles_culled, 1);
        assert!(fb.pixels.chunks_exact(4).all(|px| px[3] == 0));
    }

    #[test]
    fn test_blend_material_composites_over_background() {
        let material = Material {
            base_color_factor: [1.0, 1.0, 1.0, 0.5],
            alpha_mode: AlphaMode::Blend,
            ..dielectric()
        };
        let scene = scene_with_triangle(false, material);
        let mut fb = Framebuffer::new(64, 36);
        render_scene(&mut fb, &scene);
        let center = fb.get_pixel(32, 18).unwrap();
        assert!(center.a > 100 && center.a < 160);
        // Blended surfaces do not write depth
        assert_eq!(fb.zbuffer[18 * 64 + 32], f32::MAX);
    }

    #[test]
    fn test_mask_discards_below_cutoff() {
        let material = Material {
            base_color_factor: [1.0, 1.0, 1.0, 0.2],
            alpha_mode: AlphaMode::Mask(0.5),
            ..dielectric()
        };
        let scene = scene_with_triangle(false, material);
        let mut fb = Framebuffer::new(64, 36);
        render_scene(&mut fb, &scene);
        assert_eq!(fb.get_pixel(32, 18), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut fb = Framebuffer::new(2, 1);
        fb.set_pixel_with_depth(0, 0, 5.0, Color::new(255, 0, 0));
        fb.set_pixel_with_depth(0, 0, 9.0, Color::new(0, 255, 0));
        assert_eq!(fb.get_pixel(0, 0), Some(Color::new(255, 0, 0)));
    }

    #[test]
    fn test_bilinear_sample_blends_neighbours() {
        let mut fb = Framebuffer::new(2, 1);
        fb.set_pixel(0, 0, Color::new(0, 0, 0));
        fb.set_pixel(1, 0, Color::new(200, 0, 0));
        let mid = fb.sample_bilinear(0.5, 0.5);
        assert!((mid[0] - 100.0).abs() < 0.01);
        // Clamped beyond the edge
        assert_eq!(fb.sample_bilinear(-1.0, 0.5)[0], 0.0);
        assert_eq!(fb.sample_bilinear(2.0, 0.5)[0], 200.0);
    }

    #[test]
    fn test_environment_background_fills_frame() {
        let mut scene = Scene::new(Camera::default());
        scene.background = Background::Environment { fallback: Color::TRANSPARENT };
        let mut fb = Framebuffer::new(8, 4);
        render_scene(&mut fb, &scene);
        assert_eq!(fb.get_pixel(0, 0), Some(Color::TRANSPARENT));

        scene.set_environment(EnvironmentMap::from_equirect(4, 2, vec![LinearColor::splat(1.0); 8]));
        render_scene(&mut fb, &scene);
        assert!(fb.pixels.chunks_exact(4).all(|px| px[3] == 255 && px[0] > 0));
    }
}

//! glTF 2.0 model loading
//!
//! Parses `.gltf` (embedded data URIs or relative URIs) and `.glb` files with
//! the `gltf` crate, fetching external buffers and images through the same
//! [`AssetSource`] as the document. The default scene is flattened into one
//! [`ModelNode`]: node transforms are baked into vertex positions and
//! normals, and every triangle primitive becomes a [`Mesh`].

use base64::Engine;
use gltf::Gltf;

use super::source::{AssetSource, ProgressTracker};
use super::AssetError;
use crate::rasterizer::{
    mat4_from_cols, mat4_identity, mat4_mul, mat4_normal_matrix, mat4_transform_point,
    mat4_transform_vector, Face, LinearColor, Mat4, Texture, Vec2, Vec3, Vertex,
};
use crate::scene::{AlphaMode, Material, Mesh, ModelNode};

/// Load a glTF model and everything it references
pub async fn load_model<S: AssetSource>(
    source: &S,
    path: &str,
    progress: &ProgressTracker,
) -> Result<ModelNode, AssetError> {
    progress.add_work(1);
    let bytes = source.read(path).await?;
    let gltf = Gltf::from_slice(&bytes)?;
    progress.complete_step();

    let base_dir = parent_dir(path);
    progress.add_work((gltf.buffers().len() + gltf.images().len()) as u32);

    let buffers = load_buffers(source, &gltf, base_dir, progress).await?;
    let textures = load_images(source, &gltf, &buffers, base_dir, progress).await;

    let mut model = ModelNode::new(model_name(path));
    model.materials = gltf.materials().map(|m| convert_material(&m)).collect();
    let default_material = model.materials.len();
    model.materials.push(Material::default());
    model.textures = textures;

    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            collect_node(&node, &mat4_identity(), &buffers, default_material, &mut model.meshes);
        }
    }

    if model.triangle_count() == 0 {
        return Err(AssetError::NoGeometry(path.to_string()));
    }

    log::debug!(
        "{}: {} meshes, {} materials, {} textures",
        path,
        model.meshes.len(),
        model.materials.len(),
        model.textures.len()
    );
    Ok(model)
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn model_name(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split('.').next().unwrap_or(file).to_string()
}

fn join_path(base_dir: &str, relative: &str) -> String {
    if base_dir.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", base_dir, relative)
    }
}

/// Decode a `data:` URI payload (base64 or percent-encoded)
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| AssetError::DataUri("missing ',' separator".to_string()))?;

    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| AssetError::DataUri(e.to_string()))
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

/// Resolve a buffer or image URI: inline data, or a path relative to the model
async fn read_uri<S: AssetSource>(source: &S, base_dir: &str, uri: &str) -> Result<Vec<u8>, AssetError> {
    if uri.starts_with("data:") {
        decode_data_uri(uri)
    } else {
        let relative = urlencoding::decode(uri)?;
        source.read(&join_path(base_dir, &relative)).await
    }
}

async fn load_buffers<S: AssetSource>(
    source: &S,
    gltf: &Gltf,
    base_dir: &str,
    progress: &ProgressTracker,
) -> Result<Vec<Vec<u8>>, AssetError> {
    let mut buffers = Vec::with_capacity(gltf.buffers().len());
    for buffer in gltf.buffers() {
        let index = buffer.index();
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone().ok_or(AssetError::MissingBuffer { index })?,
            gltf::buffer::Source::Uri(uri) => read_uri(source, base_dir, uri).await?,
        };
        if data.len() < buffer.length() {
            return Err(AssetError::MissingBuffer { index });
        }
        buffers.push(data);
        progress.complete_step();
    }
    Ok(buffers)
}

/// Decode every image. A failed image is replaced by a white texel so
/// material texture indices stay valid.
async fn load_images<S: AssetSource>(
    source: &S,
    gltf: &Gltf,
    buffers: &[Vec<u8>],
    base_dir: &str,
    progress: &ProgressTracker,
) -> Vec<Texture> {
    let mut textures = Vec::with_capacity(gltf.images().len());
    for image in gltf.images() {
        let name = image
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("image{}", image.index()));

        let bytes = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..end))
                    .map(<[u8]>::to_vec)
                    .ok_or(AssetError::MissingBuffer { index: view.buffer().index() })
            }
            gltf::image::Source::Uri { uri, .. } => read_uri(source, base_dir, uri).await,
        };

        let texture = bytes.and_then(|b| Texture::from_bytes(&b, name.clone()).map_err(AssetError::from));
        match texture {
            Ok(texture) => textures.push(texture),
            Err(e) => {
                log::warn!("texture {} unavailable: {}", name, e);
                let mut placeholder = Texture::new(1, 1);
                placeholder.name = name;
                textures.push(placeholder);
            }
        }
        progress.complete_step();
    }
    textures
}

fn texture_index(info: Option<gltf::texture::Info<'_>>) -> Option<usize> {
    info.map(|i| i.texture().source().index())
}

fn convert_material(material: &gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [er, eg, eb] = material.emissive_factor();
    let alpha_mode = match material.alpha_mode() {
        gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
        gltf::material::AlphaMode::Mask => AlphaMode::Mask(material.alpha_cutoff().unwrap_or(0.5)),
        gltf::material::AlphaMode::Blend => AlphaMode::Blend,
    };

    Material {
        name: material.name().unwrap_or("unnamed").to_string(),
        base_color_factor: pbr.base_color_factor(),
        base_color_texture: texture_index(pbr.base_color_texture()),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        metallic_roughness_texture: texture_index(pbr.metallic_roughness_texture()),
        emissive_factor: LinearColor::new(er, eg, eb),
        emissive_texture: texture_index(material.emissive_texture()),
        double_sided: material.double_sided(),
        alpha_mode,
    }
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: &Mat4,
    buffers: &[Vec<u8>],
    default_material: usize,
    out: &mut Vec<Mesh>,
) {
    let world = mat4_mul(parent, &mat4_from_cols(node.transform().matrix()));

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("skipping non-triangle primitive in {:?}", mesh.name());
                continue;
            }
            let material = primitive.material().index().unwrap_or(default_material);
            let name = mesh.name().unwrap_or("mesh").to_string();
            if let Some(converted) = read_primitive(&primitive, &world, buffers, name, material) {
                out.push(converted);
            }
        }
    }

    for child in node.children() {
        collect_node(&child, &world, buffers, default_material, out);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    world: &Mat4,
    buffers: &[Vec<u8>],
    name: String,
    material: usize,
) -> Option<Mesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.as_slice()));

    let positions: Vec<Vec3> = reader.read_positions()?.map(|p| Vec3::new(p[0], p[1], p[2])).collect();
    if positions.is_empty() {
        return None;
    }
    let normals: Option<Vec<Vec3>> = reader
        .read_normals()
        .map(|iter| iter.map(|n| Vec3::new(n[0], n[1], n[2])).collect());
    let uvs: Vec<Vec2> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().map(|uv| Vec2::new(uv[0], uv[1])).collect())
        .unwrap_or_default();
    let indices: Vec<usize> = match reader.read_indices() {
        Some(indices) => indices.into_u32().map(|i| i as usize).collect(),
        None => (0..positions.len()).collect(),
    };

    // A mirroring transform reverses winding
    let mirrored = {
        let row = |r: usize| Vec3::new(world[r][0], world[r][1], world[r][2]);
        row(0).dot(row(1).cross(row(2))) < 0.0
    };

    let faces: Vec<Face> = indices
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|&i| i < positions.len()))
        .map(|tri| {
            if mirrored {
                Face::new(tri[0], tri[2], tri[1])
            } else {
                Face::new(tri[0], tri[1], tri[2])
            }
        })
        .collect();
    if faces.is_empty() {
        return None;
    }

    let normal_matrix = mat4_normal_matrix(world);
    let mut vertices: Vec<Vertex> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i))
                .map(|n| mat4_transform_vector(&normal_matrix, *n).normalize())
                .unwrap_or(Vec3::ZERO);
            Vertex::new(
                mat4_transform_point(world, *p),
                uvs.get(i).copied().unwrap_or_default(),
                normal,
            )
        })
        .collect();

    if normals.is_none() {
        compute_vertex_normals(&mut vertices, &faces);
    }

    Some(Mesh { name, vertices, faces, material })
}

/// Area-weighted average of adjacent face normals
fn compute_vertex_normals(vertices: &mut [Vertex], faces: &[Face]) {
    let mut sums = vec![Vec3::ZERO; vertices.len()];
    for face in faces {
        let p0 = vertices[face.v0].pos;
        let p1 = vertices[face.v1].pos;
        let p2 = vertices[face.v2].pos;
        let n = (p1 - p0).cross(p2 - p0);
        sums[face.v0] = sums[face.v0] + n;
        sums[face.v1] = sums[face.v1] + n;
        sums[face.v2] = sums[face.v2] + n;
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = sum.normalize();
    }
}

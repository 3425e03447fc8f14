// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Direct-format (glTF / GLB) loading
//!
//! Nodes keep the glTF hierarchy and local transforms. A node whose mesh has a
//! single triangle primitive becomes drawable itself; meshes with several
//! primitives get one drawable child per primitive, named `<mesh>_<index>`.

use crate::error::LoadError;
use crate::fetch::{join_relative, Fetch, ProgressFn};
use base64::Engine;
use buildview_geometry::{calculate_normals, Mesh};
use buildview_scene::{Material, SceneNode};
use bytes::Bytes;
use gltf::mesh::Mode;
use nalgebra::Matrix4;

/// Deeper node chains are treated as malformed and cut off
const MAX_NODE_DEPTH: usize = 64;

/// Color for primitives without a material
const DEFAULT_BASE_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Fetch and decode a glTF or GLB model
pub async fn load_direct(fetcher: &dyn Fetch, url: &str, progress: Option<ProgressFn>) -> Result<SceneNode, LoadError> {
    let bytes = fetcher.fetch(url, progress).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;
    let buffers = load_buffers(fetcher, url, &gltf).await?;
    build_scene(&gltf.document, &buffers)
}

/// Resolve every buffer: the GLB binary chunk, base64 data URIs, or
/// files relative to the model URL.
async fn load_buffers(fetcher: &dyn Fetch, url: &str, gltf: &gltf::Gltf) -> Result<Vec<Bytes>, LoadError> {
    let mut buffers = Vec::with_capacity(gltf.buffers().len());
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .map(Bytes::copy_from_slice)
                .ok_or_else(|| LoadError::Gltf("missing binary chunk".to_string()))?,
            gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri)? {
                Some(data) => Bytes::from(data),
                None => fetcher.fetch(&join_relative(url, uri), None).await?,
            },
        };
        if data.len() < buffer.length() {
            return Err(LoadError::Gltf(format!(
                "buffer {} holds {} bytes, expected {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }
    Ok(buffers)
}

/// Decode a base64 `data:` URI; `None` for any other URI
fn decode_data_uri(uri: &str) -> Result<Option<Vec<u8>>, LoadError> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Ok(None);
    };
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return Err(LoadError::Gltf("only base64 data URIs are supported".to_string()));
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map(Some)
        .map_err(|e| LoadError::Gltf(format!("invalid data URI: {e}")))
}

/// Scene tree of the default scene, or the first one
pub fn build_scene(document: &gltf::Document, buffers: &[Bytes]) -> Result<SceneNode, LoadError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::Gltf("document has no scenes".to_string()))?;

    let mut root = SceneNode::group(scene.name().unwrap_or("Scene"));
    for node in scene.nodes() {
        root.add_child(convert_node(&node, buffers, 0));
    }
    tracing::info!(
        nodes = root.node_count(),
        drawables = root.drawable_count(),
        "Built glTF scene"
    );
    Ok(root)
}

fn convert_node(node: &gltf::Node, buffers: &[Bytes], depth: usize) -> SceneNode {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));
    let transform = Matrix4::from(node.transform().matrix());

    let mut primitives: Vec<(usize, Mesh, Material)> = Vec::new();
    let mut mesh_name = String::new();
    if let Some(mesh) = node.mesh() {
        mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        for primitive in mesh.primitives() {
            if let Some(converted) = convert_primitive(&primitive, buffers) {
                primitives.push((primitive.index(), converted, material_of(&primitive)));
            }
        }
    }

    let mut out = if primitives.len() == 1 {
        let (_, mesh, material) = primitives.remove(0);
        SceneNode::drawable(name, mesh, material)
    } else {
        let mut group = SceneNode::group(name);
        for (index, mesh, material) in primitives {
            group.add_child(
                SceneNode::drawable(format!("{mesh_name}_{index}"), mesh, material).with_type_label("primitive"),
            );
        }
        group
    }
    .with_transform(transform)
    .with_type_label(if node.mesh().is_some() { "mesh" } else { "node" });

    if let Some(secondary_id) = extras_name(node) {
        out = out.with_secondary_id(secondary_id);
    }

    if depth >= MAX_NODE_DEPTH {
        tracing::warn!(node = node.index(), "glTF node hierarchy too deep, dropping children");
        return out;
    }
    for child in node.children() {
        out.add_child(convert_node(&child, buffers, depth + 1));
    }
    out
}

/// The `name` entry of a node's extras, used as its semantic identifier
fn extras_name(node: &gltf::Node) -> Option<String> {
    let raw = node.extras().as_ref()?;
    let extras: serde_json::Value = serde_json::from_str(raw.get()).ok()?;
    extras.get("name")?.as_str().map(str::to_string)
}

fn material_of(primitive: &gltf::Primitive) -> Material {
    let material = primitive.material();
    // The implicit default material has no index
    if material.index().is_none() {
        return Material::new(DEFAULT_BASE_COLOR);
    }
    let color = material.pbr_metallic_roughness().base_color_factor();
    match material.name() {
        Some(name) => Material::named(name, color),
        None => Material::new(color),
    }
}

fn convert_primitive(primitive: &gltf::Primitive, buffers: &[Bytes]) -> Option<Mesh> {
    if primitive.mode() != Mode::Triangles {
        tracing::warn!(mode = ?primitive.mode(), "Skipping non-triangle glTF primitive");
        return None;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));
    let positions: Vec<f32> = reader.read_positions()?.flatten().collect();
    let vertex_count = positions.len() / 3;

    let mut mesh = Mesh {
        positions,
        normals: Vec::new(),
        indices: match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertex_count as u32).collect(),
        },
    };
    mesh.indices.truncate(mesh.indices.len() - mesh.indices.len() % 3);
    let dropped = mesh.retain_valid_triangles();
    if dropped > 0 {
        tracing::warn!(dropped, "Dropped glTF triangles with out-of-range indices");
    }

    match reader.read_normals() {
        Some(normals) => {
            mesh.normals = normals.flatten().collect();
            if mesh.normals.len() != mesh.positions.len() {
                calculate_normals(&mut mesh);
            }
        }
        None => calculate_normals(&mut mesh),
    }

    (!mesh.is_empty()).then_some(mesh)
}

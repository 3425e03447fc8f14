// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene graph nodes

use crate::Rgba;
use buildview_geometry::{Aabb, Mesh};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Process-assigned unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Surface material of a drawable node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: Option<String>,
    pub color: Rgba,
}

impl Material {
    pub fn new(color: Rgba) -> Self {
        Self { name: None, color }
    }

    pub fn named(name: impl Into<String>, color: Rgba) -> Self {
        Self {
            name: Some(name.into()),
            color,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
    }
}

/// Node of a loaded scene graph.
///
/// A node is drawable exactly when it carries a mesh, and every drawable
/// node has a material. Mesh data is immutable once loaded and shared
/// between copies; `clone` copies everything else, ids included.
#[derive(Debug, Clone)]
pub struct SceneNode {
    id: NodeId,
    /// Display name
    pub name: String,
    /// Semantic name distinct from the display name (IFC GlobalId, glTF extras name)
    pub secondary_id: Option<String>,
    /// Source type, e.g. `IFCWALL` or `mesh`
    pub type_label: Option<String>,
    /// Transform relative to the parent
    pub transform: Matrix4<f32>,
    drawable: Option<(Arc<Mesh>, Material)>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Non-drawable node
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            secondary_id: None,
            type_label: None,
            transform: Matrix4::identity(),
            drawable: None,
            children: Vec::new(),
        }
    }

    /// Drawable node with its original material
    pub fn drawable(name: impl Into<String>, mesh: impl Into<Arc<Mesh>>, material: Material) -> Self {
        let mut node = Self::group(name);
        node.drawable = Some((mesh.into(), material));
        node
    }

    pub fn with_secondary_id(mut self, secondary_id: impl Into<String>) -> Self {
        self.secondary_id = Some(secondary_id.into());
        self
    }

    pub fn with_type_label(mut self, type_label: impl Into<String>) -> Self {
        self.type_label = Some(type_label.into());
        self
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_drawable(&self) -> bool {
        self.drawable.is_some()
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.drawable.as_ref().map(|(mesh, _)| mesh.as_ref())
    }

    pub fn material(&self) -> Option<&Material> {
        self.drawable.as_ref().map(|(_, material)| material)
    }

    /// Replace the material of a drawable node; returns false for groups
    pub fn set_material(&mut self, material: Material) -> bool {
        match &mut self.drawable {
            Some((_, current)) => {
                *current = material;
                true
            }
            None => false,
        }
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Depth-first, pre-order traversal
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst { stack: vec![self] }
    }

    /// Depth-first, pre-order traversal with mutable access
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut SceneNode)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    pub fn drawable_count(&self) -> usize {
        self.iter().filter(|node| node.is_drawable()).count()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.iter().find(|node| node.name == name)
    }

    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Bounds of all meshes with transforms applied, None without geometry
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds_with(&Matrix4::identity())
    }

    fn bounds_with(&self, parent: &Matrix4<f32>) -> Option<Aabb> {
        let world = parent * self.transform;
        let own = self
            .mesh()
            .and_then(Mesh::bounds)
            .map(|bounds| bounds.transformed(&world));
        self.children
            .iter()
            .filter_map(|child| child.bounds_with(&world))
            .fold(own, |acc, b| Some(acc.map_or(b, |a| a.union(&b))))
    }
}

/// Pre-order iterator over a scene graph
pub struct DepthFirst<'a> {
    stack: Vec<&'a SceneNode>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a SceneNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use buildview_geometry::{Point3, Vector3};
    use nalgebra::Translation3;

    fn unit_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0), Vector3::z());
        mesh.add_vertex(Point3::new(0.0, 1.0, 0.0), Vector3::z());
        mesh.add_triangle(0, 1, 2);
        mesh
    }

    fn sample() -> SceneNode {
        SceneNode::group("root").with_children(vec![
            SceneNode::group("storey").with_children(vec![SceneNode::drawable(
                "Wall-01",
                unit_triangle(),
                Material::default(),
            )]),
            SceneNode::drawable("Slab", unit_triangle(), Material::default())
                .with_transform(Translation3::new(5.0, 0.0, 0.0).to_homogeneous()),
        ])
    }

    #[test]
    fn test_depth_first_order() {
        let scene = sample();
        let order: Vec<&str> = scene.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["root", "storey", "Wall-01", "Slab"]);
        assert_eq!(scene.node_count(), 4);
    }

    #[test]
    fn test_drawable_flag_follows_mesh() {
        let scene = sample();
        assert_eq!(scene.drawable_count(), 2);
        let mut group = SceneNode::group("g");
        assert!(!group.set_material(Material::default()));
        assert!(group.material().is_none());
    }

    #[test]
    fn test_clone_is_deep_and_keeps_ids() {
        let original = sample();
        let mut copy = original.clone();
        copy.walk_mut(&mut |node| {
            node.set_material(Material::new([1.0, 0.0, 0.0, 1.0]));
        });
        let wall = original.find_by_name("Wall-01").unwrap();
        assert_eq!(wall.material().unwrap().color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(copy.find_by_name("Wall-01").unwrap().id(), wall.id());
    }

    #[test]
    fn test_ids_are_unique() {
        let scene = sample();
        let mut ids: Vec<NodeId> = scene.iter().map(SceneNode::id).collect();
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_bounds_apply_transforms() {
        let bounds = sample().bounds().unwrap();
        assert_relative_eq!(bounds.min.x, 0.0);
        assert_relative_eq!(bounds.max.x, 6.0);
        assert!(SceneNode::group("empty").bounds().is_none());
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene tree from the IFC spatial structure
//!
//! The project is the root, followed by sites, buildings and storeys through
//! `IfcRelAggregates`, with elements hung under their container through
//! `IfcRelContainedInSpatialStructure`. Product geometry is generated in
//! parallel and baked into scene space, so every node keeps an identity
//! transform.

use crate::error::LoadError;
use buildview_core::{build_entity_index, extract_length_unit_scale, EntityDecoder, EntityScanner, IfcType};
use buildview_geometry::{calculate_normals, default_color_for_type, GeometryRouter, Mesh, Rgba, StyleIndex};
use buildview_scene::{Material, SceneNode};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Root group name for files without an IfcProject
pub const SYNTHETIC_ROOT_NAME: &str = "Model";

/// A product entity waiting for geometry
struct ProductJob {
    id: u32,
    ifc_type: IfcType,
    start: usize,
    end: usize,
}

struct Product {
    name: String,
    global_id: Option<String>,
    type_name: String,
    body: Option<(Mesh, Rgba)>,
}

impl Product {
    fn into_node(self) -> SceneNode {
        let node = match self.body {
            Some((mesh, color)) => SceneNode::drawable(self.name, mesh, Material::new(color)),
            None => SceneNode::group(self.name),
        }
        .with_type_label(self.type_name);
        match self.global_id {
            Some(global_id) => node.with_secondary_id(global_id),
            None => node,
        }
    }
}

/// Parent → children edges from the decomposition and containment relationships
#[derive(Default)]
struct Relations {
    children: FxHashMap<u32, Vec<u32>>,
    related: FxHashSet<u32>,
}

impl Relations {
    fn link(&mut self, parent: u32, children: Vec<u32>) {
        self.related.extend(children.iter().copied());
        self.children.entry(parent).or_default().extend(children);
    }
}

/// Build the scene tree of an IFC DATA section
pub fn build_scene(content: &str, pool: &rayon::ThreadPool) -> Result<SceneNode, LoadError> {
    let index = Arc::new(build_entity_index(content));
    let mut decoder = EntityDecoder::with_arc_index(content, Arc::clone(&index));

    let unit_scale = extract_length_unit_scale(&mut decoder)?;
    let styles = StyleIndex::build(&mut decoder);
    let router = GeometryRouter::with_scale(unit_scale);

    let mut relations = Relations::default();
    let mut jobs: Vec<ProductJob> = Vec::with_capacity(index.len() / 20);
    let mut scanner = EntityScanner::new(content);
    while let Some((id, type_name, start, end)) = scanner.next_entity() {
        let ifc_type = IfcType::from_name(type_name);
        match ifc_type {
            IfcType::IfcRelAggregates => {
                // RelatingObject, RelatedObjects
                let Ok(rel) = decoder.decode_at(start, end) else {
                    continue;
                };
                if let Some(parent) = rel.get_ref(4) {
                    relations.link(parent, rel.get_ref_list(5));
                }
            }
            IfcType::IfcRelContainedInSpatialStructure => {
                // RelatedElements, RelatingStructure
                let Ok(rel) = decoder.decode_at(start, end) else {
                    continue;
                };
                if let Some(parent) = rel.get_ref(5) {
                    relations.link(parent, rel.get_ref_list(4));
                }
            }
            t if t.is_spatial() || t.is_element() => jobs.push(ProductJob { id, ifc_type, start, end }),
            _ => {}
        }
    }

    // Related products of types outside the known element list
    let known: FxHashSet<u32> = jobs.iter().map(|job| job.id).collect();
    for &id in &relations.related {
        if known.contains(&id) {
            continue;
        }
        if let Some(&(start, end)) = index.get(&id) {
            jobs.push(ProductJob {
                id,
                ifc_type: IfcType::Unknown,
                start,
                end,
            });
        }
    }
    jobs.sort_unstable_by_key(|job| job.start);

    tracing::debug!(
        products = jobs.len(),
        styled_items = styles.len(),
        unit_scale = unit_scale,
        "Entity scanning complete"
    );

    let mut products: FxHashMap<u32, Product> = pool.install(|| {
        jobs.par_iter()
            .map_init(
                || EntityDecoder::with_arc_index(content, Arc::clone(&index)),
                |decoder, job| read_product(job, decoder, &router, &styles).map(|product| (job.id, product)),
            )
            .filter_map(|product| product)
            .collect()
    });

    let project = jobs
        .iter()
        .find(|job| job.ifc_type == IfcType::IfcProject)
        .map(|job| job.id);
    let mut tree = TreeBuilder {
        products: &mut products,
        relations: &relations,
    };
    let mut root = project
        .and_then(|id| tree.node(id))
        .unwrap_or_else(|| SceneNode::group(SYNTHETIC_ROOT_NAME));

    // Top-level products first so nested ones stay under their parents
    for job in jobs.iter().filter(|job| !relations.related.contains(&job.id)) {
        if let Some(node) = tree.node(job.id) {
            root.add_child(node);
        }
    }
    // Whatever is left hangs off a parent that produced no node
    for job in &jobs {
        if let Some(node) = tree.node(job.id) {
            root.add_child(node);
        }
    }

    tracing::info!(
        nodes = root.node_count(),
        drawables = root.drawable_count(),
        "Built IFC scene"
    );
    Ok(root)
}

fn read_product(
    job: &ProductJob,
    decoder: &mut EntityDecoder,
    router: &GeometryRouter,
    styles: &StyleIndex,
) -> Option<Product> {
    let entity = match decoder.decode_at(job.start, job.end) {
        Ok(entity) => entity,
        Err(err) => {
            tracing::warn!(id = job.id, error = %err, "Skipping undecodable product");
            return None;
        }
    };
    if entity.ifc_type.is_void() {
        return None;
    }

    let body = match router.process_element(&entity, decoder) {
        Ok(mut mesh) if !mesh.is_empty() => {
            if mesh.normals.len() != mesh.positions.len() {
                calculate_normals(&mut mesh);
            }
            let color = styles
                .element_color(&entity, decoder)
                .unwrap_or_else(|| default_color_for_type(entity.ifc_type));
            Some((mesh, color))
        }
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(id = job.id, error = %err, "No geometry for product");
            None
        }
    };

    // IfcRoot: GlobalId, OwnerHistory, Name
    let name = entity
        .get_string(2)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| entity.type_name.clone());
    Some(Product {
        name,
        global_id: entity.get_string(0).map(str::to_string),
        type_name: entity.type_name.clone(),
        body,
    })
}

struct TreeBuilder<'a> {
    products: &'a mut FxHashMap<u32, Product>,
    relations: &'a Relations,
}

impl TreeBuilder<'_> {
    /// Node for a product and its descendants. Each product is taken once,
    /// so cyclic relationships cannot recurse forever.
    fn node(&mut self, id: u32) -> Option<SceneNode> {
        let mut node = self.products.remove(&id)?.into_node();
        if let Some(children) = self.relations.children.get(&id) {
            for &child in children {
                if let Some(child) = self.node(child) {
                    node.add_child(child);
                }
            }
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WALL_IFC: &str = include_str!("../tests/fixtures/wall.ifc");

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn test_spatial_hierarchy() {
        let root = build_scene(WALL_IFC, &pool()).unwrap();
        assert_eq!(root.name, "Site Works");
        assert_eq!(root.type_label.as_deref(), Some("IFCPROJECT"));

        let names: Vec<&str> = root.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Site Works", "Site", "Block A", "Level 1", "Wall-01", "Slab-01", "IFCDOOR"]
        );
        assert_eq!(root.drawable_count(), 2);
        assert!(root.find_by_name("Opening").is_none());
    }

    #[test]
    fn test_wall_node() {
        let root = build_scene(WALL_IFC, &pool()).unwrap();
        let wall = root.find_by_name("Wall-01").unwrap();
        assert_eq!(wall.secondary_id.as_deref(), Some("2O2Fr_t4X7Zf8NOew3FLOH"));
        assert_eq!(wall.material().unwrap().color, default_color_for_type(IfcType::IfcWall));

        // Millimetres scaled to metres, extrusion along +Y
        let bounds = wall.mesh().unwrap().bounds().unwrap();
        assert_relative_eq!(bounds.min.x, -2.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.y, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_styled_slab() {
        let root = build_scene(WALL_IFC, &pool()).unwrap();
        let slab = root.find_by_name("Slab-01").unwrap();
        assert_eq!(slab.material().unwrap().color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_orphan_and_unnamed_product() {
        let root = build_scene(WALL_IFC, &pool()).unwrap();
        let door = root.children.last().unwrap();
        assert_eq!(door.name, "IFCDOOR");
        assert!(!door.is_drawable());
    }

    #[test]
    fn test_without_project() {
        let content = "DATA;
#1=IFCWALL('w1',$,'Loose Wall',$,$,$,$,$,$);
#2=IFCBUILDINGSTOREY('s1',$,'Level 2',$,$,$,$,$,.ELEMENT.,0.);
#3=IFCRELCONTAINEDINSPATIALSTRUCTURE('r1',$,$,$,(#4),#2);
#4=IFCFLOWSEGMENT('f1',$,'Duct',$,$,$,$,$);
ENDSEC;";
        let root = build_scene(content, &pool()).unwrap();
        assert_eq!(root.name, SYNTHETIC_ROOT_NAME);
        let children: Vec<&str> = root.children.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(children, vec!["Loose Wall", "Level 2"]);
        // Contained products of unlisted types are kept
        assert_eq!(root.children[1].children[0].type_label.as_deref(), Some("IFCFLOWSEGMENT"));
    }

    #[test]
    fn test_malformed_product_is_skipped() {
        // Unparseable wall whose text has 'ü' across byte 100 of the entity
        let broken = format!("#900=IFCWALL('{}\u{fc}',$,@);\nENDSEC;", "a".repeat(85));
        let end = WALL_IFC.rfind("ENDSEC;").unwrap();
        let content = format!("{}{}{}", &WALL_IFC[..end], broken, &WALL_IFC[end + "ENDSEC;".len()..]);

        let root = build_scene(&content, &pool()).unwrap();
        let names: Vec<&str> = root.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Site Works", "Site", "Block A", "Level 1", "Wall-01", "Slab-01", "IFCDOOR"]
        );
        assert!(root.find_by_name("Wall-01").unwrap().is_drawable());
    }

    #[test]
    fn test_cyclic_relationships_terminate() {
        let content = "DATA;
#1=IFCPROJECT('p',$,'P',$,$,$,$,$,$);
#2=IFCSITE('s',$,'S',$,$,$,$,$,.ELEMENT.,$,$,$,$,$);
#3=IFCRELAGGREGATES('a',$,$,$,#1,(#2));
#4=IFCRELAGGREGATES('b',$,$,$,#2,(#1));
ENDSEC;";
        let root = build_scene(content, &pool()).unwrap();
        assert_eq!(root.node_count(), 2);
    }
}

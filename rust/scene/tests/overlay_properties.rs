// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Overlay behavior over a small building-shaped scene

use buildview_geometry::{Mesh, Point3, Vector3};
use buildview_scene::{apply_overlay, Material, SceneNode, StatusMapping, PALETTE};

fn triangle() -> Mesh {
    let mut mesh = Mesh::new();
    mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z());
    mesh.add_vertex(Point3::new(1.0, 0.0, 0.0), Vector3::z());
    mesh.add_vertex(Point3::new(0.0, 1.0, 0.0), Vector3::z());
    mesh.add_triangle(0, 1, 2);
    mesh
}

fn building() -> SceneNode {
    let element = |name: &str, guid: &str, color| {
        SceneNode::drawable(name, triangle(), Material::new(color))
            .with_secondary_id(guid)
            .with_type_label("IFCWALL")
    };
    SceneNode::group("Project").with_children(vec![SceneNode::group("Level 1").with_children(vec![
        element("Wall-01", "guid-wall-01", [0.85, 0.85, 0.85, 1.0]),
        element("Wall-02", "guid-wall-02", [0.85, 0.85, 0.85, 1.0]),
        element("Slab-01", "guid-slab-01", [0.7, 0.7, 0.7, 1.0]),
        element("Door-01", "guid-door-01", [0.6, 0.45, 0.3, 1.0]),
    ])])
}

fn materials(scene: &SceneNode) -> Vec<(String, Option<Material>)> {
    scene
        .iter()
        .map(|node| (node.name.clone(), node.material().cloned()))
        .collect()
}

fn mappings() -> Vec<StatusMapping> {
    vec![
        StatusMapping::new(),
        [("Wall-01", "completed")].into_iter().collect(),
        [("guid-wall-02", "in_progress"), ("Slab-01", "bogus")].into_iter().collect(),
        [("Wall-01", "not_started"), ("guid-wall-01", "completed"), ("Door-01", "in_progress")]
            .into_iter()
            .collect(),
    ]
}

#[test]
fn overlay_is_idempotent() {
    for mapping in mappings() {
        let mut once = building();
        apply_overlay(&mut once, Some(&mapping));
        let mut twice = once.clone();
        apply_overlay(&mut twice, Some(&mapping));
        assert_eq!(materials(&once), materials(&twice));
    }
}

#[test]
fn unmapped_nodes_keep_original_material() {
    let pristine = building();
    for mapping in mappings() {
        let mut scene = pristine.clone();
        apply_overlay(&mut scene, Some(&mapping));
        for (before, after) in pristine.iter().zip(scene.iter()) {
            let id = before.id().to_string();
            let mapped = mapping.get(&before.name).is_some()
                || before.secondary_id.as_deref().and_then(|s| mapping.get(s)).is_some()
                || mapping.get(&id).is_some();
            if !mapped {
                assert_eq!(before.material(), after.material(), "{} changed", before.name);
            }
        }
    }
}

#[test]
fn wall_scenario_colors_only_the_named_wall() {
    let pristine = building();
    let mut scene = pristine.clone();
    let mapping: StatusMapping = serde_json::from_str(r#"{"Wall-01": "completed"}"#).unwrap();
    let report = apply_overlay(&mut scene, Some(&mapping));

    assert_eq!(report.recolored, 1);
    assert_eq!(scene.find_by_name("Wall-01").unwrap().material().unwrap().color, PALETTE.completed);
    for name in ["Wall-02", "Slab-01", "Door-01"] {
        assert_eq!(
            scene.find_by_name(name).unwrap().material(),
            pristine.find_by_name(name).unwrap().material()
        );
    }
}

#[test]
fn switching_mappings_on_fresh_copies_does_not_leak() {
    let pristine = building();

    let mut first = pristine.clone();
    apply_overlay(&mut first, Some(&[("Wall-02", "completed")].into_iter().collect()));

    let mut second = pristine.clone();
    apply_overlay(&mut second, Some(&[("Door-01", "not_started")].into_iter().collect()));

    assert_eq!(
        second.find_by_name("Wall-02").unwrap().material(),
        pristine.find_by_name("Wall-02").unwrap().material()
    );
    assert_eq!(pristine.find_by_name("Door-01").unwrap().material().unwrap().color, [0.6, 0.45, 0.3, 1.0]);
}

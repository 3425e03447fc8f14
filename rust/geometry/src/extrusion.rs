// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D profiles to 3D meshes

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::placement::{axis2_placement_3d, transformation_operator};
use crate::profile::{process_profile, Profile2D, Triangulation};
use buildview_core::{DecodedEntity, EntityDecoder, IfcType};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Extrude a 2D profile along the Z axis
pub fn extrude_profile(profile: &Profile2D, depth: f64, transform: Option<Matrix4<f64>>) -> Result<Mesh> {
    if depth <= 0.0 || !depth.is_finite() {
        return Err(Error::InvalidExtrusion(format!("Depth must be positive, got {depth}")));
    }

    let triangulation = profile.triangulate()?;
    let side_vertices: usize = profile.outer.len() * 4 + profile.holes.iter().map(|h| h.len() * 4).sum::<usize>();
    let mut mesh = Mesh::with_capacity(
        triangulation.points.len() * 2 + side_vertices,
        triangulation.indices.len() * 2 + side_vertices / 4 * 6,
    );

    create_cap_mesh(&triangulation, 0.0, -Vector3::z(), &mut mesh);
    create_cap_mesh(&triangulation, depth, Vector3::z(), &mut mesh);

    create_side_walls(&profile.outer, depth, &mut mesh);
    for hole in &profile.holes {
        create_side_walls(hole, depth, &mut mesh);
    }

    if let Some(matrix) = transform {
        mesh.transform(&matrix);
    }
    Ok(mesh)
}

/// IfcExtrudedAreaSolid: SweptArea, Position, ExtrudedDirection, Depth
pub fn process_extruded_area_solid(solid: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
    let profile_id = solid
        .get_ref(0)
        .ok_or_else(|| Error::InvalidExtrusion("Missing SweptArea".to_string()))?;
    let profile_entity = decoder.decode_by_id(profile_id)?;
    let profile = process_profile(&profile_entity, decoder)?;

    let depth = solid
        .get_float(3)
        .ok_or_else(|| Error::InvalidExtrusion("Missing Depth".to_string()))?;

    let direction = match solid.get_ref(2) {
        Some(id) => decoder
            .decode_by_id(id)?
            .get(0)
            .and_then(|c| c.as_point3())
            .map(Vector3::from)
            .and_then(|v| v.try_normalize(1e-12))
            .unwrap_or_else(Vector3::z),
        None => Vector3::z(),
    };

    let position = match solid.get_ref(1) {
        Some(id) => {
            let placement = decoder.decode_by_id(id)?;
            match placement.ifc_type {
                IfcType::IfcAxis2Placement3D => axis2_placement_3d(&placement, decoder)?,
                IfcType::IfcCartesianTransformationOperator3D => transformation_operator(&placement, decoder)?,
                _ => Matrix4::identity(),
            }
        }
        None => Matrix4::identity(),
    };

    extrude_profile(&profile, depth, Some(position * shear_towards(&direction)))
}

/// Matrix mapping the local +Z extrusion onto an oblique direction
fn shear_towards(direction: &Vector3<f64>) -> Matrix4<f64> {
    let mut shear = Matrix4::identity();
    shear[(0, 2)] = direction.x;
    shear[(1, 2)] = direction.y;
    shear[(2, 2)] = direction.z;
    shear
}

fn create_cap_mesh(triangulation: &Triangulation, z: f64, normal: Vector3<f64>, mesh: &mut Mesh) {
    let base = mesh.vertex_count() as u32;
    for point in &triangulation.points {
        mesh.add_vertex(Point3::new(point.x, point.y, z), normal);
    }
    for tri in triangulation.indices.chunks_exact(3) {
        let (i0, i1, i2) = (base + tri[0] as u32, base + tri[1] as u32, base + tri[2] as u32);
        // Reverse winding for bottom cap
        if normal.z < 0.0 {
            mesh.add_triangle(i0, i2, i1);
        } else {
            mesh.add_triangle(i0, i1, i2);
        }
    }
}

fn create_side_walls(boundary: &[Point2<f64>], depth: f64, mesh: &mut Mesh) {
    for i in 0..boundary.len() {
        let p0 = &boundary[i];
        let p1 = &boundary[(i + 1) % boundary.len()];

        let edge = Vector3::new(p1.x - p0.x, p1.y - p0.y, 0.0);
        // Duplicate consecutive points give degenerate edges
        let Some(normal) = Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-10) else {
            continue;
        };

        let idx = mesh.add_vertex(Point3::new(p0.x, p0.y, 0.0), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, 0.0), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, depth), normal);
        mesh.add_vertex(Point3::new(p0.x, p0.y, depth), normal);
        mesh.add_triangle(idx, idx + 1, idx + 2);
        mesh.add_triangle(idx, idx + 2, idx + 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Profile2D {
        Profile2D::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
    }

    #[test]
    fn test_extrude_rectangle() {
        let mesh = extrude_profile(&square(), 2.0, None).unwrap();
        // Two caps of 2 triangles, four walls of 2 triangles
        assert_eq!(mesh.triangle_count(), 12);
        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.max.z, 2.0);
    }

    #[test]
    fn test_outward_side_normal() {
        let mesh = extrude_profile(&square(), 1.0, None).unwrap();
        // First wall follows the bottom edge (0,0)->(1,0); outward is -Y
        let first_wall = 8 * 3;
        assert_relative_eq!(mesh.normals[first_wall + 1], -1.0);
    }

    #[test]
    fn test_invalid_depth() {
        assert!(extrude_profile(&square(), 0.0, None).is_err());
        assert!(extrude_profile(&square(), f64::NAN, None).is_err());
    }

    #[test]
    fn test_extruded_area_solid_with_position() {
        let content = "DATA;
#1=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,2.,1.);
#2=IFCCARTESIANPOINT((0.,0.,5.));
#3=IFCAXIS2PLACEMENT3D(#2,$,$);
#4=IFCDIRECTION((0.,0.,1.));
#5=IFCEXTRUDEDAREASOLID(#1,#3,#4,3.);
ENDSEC;";
        let mut decoder = EntityDecoder::new(content);
        let solid = decoder.decode_by_id(5).unwrap();
        let mesh = process_extruded_area_solid(&solid, &mut decoder).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min.z, 5.0);
        assert_relative_eq!(bounds.max.z, 8.0);
        assert_relative_eq!(bounds.max.x, 1.0);
    }
}

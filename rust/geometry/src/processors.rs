// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry processors, one per supported IFC representation item
//!
//! Coordinates stay in file units; the router applies unit scale and placement.

use crate::extrusion::process_extruded_area_solid;
use crate::mesh::calculate_normals;
use crate::profile::Profile2D;
use crate::triangulation::{polygon_normal, project_to_2d};
use crate::{Error, Mesh, Point3, Result};
use buildview_core::{AttributeValue, DecodedEntity, EntityDecoder, IfcType};

/// Turns one representation item into a mesh
pub trait GeometryProcessor: Send + Sync {
    /// Process entity into mesh
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh>;

    /// Get supported IFC types
    fn supported_types(&self) -> Vec<IfcType>;
}

/// IfcExtrudedAreaSolid over rectangle, circle and polyline profiles
#[derive(Debug, Default)]
pub struct ExtrudedAreaSolidProcessor;

impl GeometryProcessor for ExtrudedAreaSolidProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        process_extruded_area_solid(entity, decoder)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcExtrudedAreaSolid]
    }
}

/// IfcTriangulatedFaceSet - explicit triangle meshes
#[derive(Debug, Default)]
pub struct TriangulatedFaceSetProcessor;

impl GeometryProcessor for TriangulatedFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // 0: Coordinates, 1: Normals, 2: Closed, 3: CoordIndex, 4: PnIndex (IFC4 ADD2+)
        let points = point_list(entity, decoder)?;
        let pn_index = entity.get(4).map(index_list).unwrap_or_default();

        let mut mesh = Mesh::new();
        mesh.positions = flatten(&points);
        let triangles = entity
            .get_list(3)
            .ok_or_else(|| Error::Unsupported("TriangulatedFaceSet without CoordIndex".to_string()))?;
        for triangle in triangles {
            let loop_indices = resolve_loop(&index_list(triangle), &pn_index, points.len());
            if let [a, b, c] = loop_indices[..] {
                mesh.add_triangle(a as u32, b as u32, c as u32);
            }
        }
        calculate_normals(&mut mesh);
        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcTriangulatedFaceSet]
    }
}

/// IfcPolygonalFaceSet - indexed polygons requiring triangulation
#[derive(Debug, Default)]
pub struct PolygonalFaceSetProcessor;

impl GeometryProcessor for PolygonalFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // 0: Coordinates, 1: Closed, 2: Faces, 3: PnIndex
        let points = point_list(entity, decoder)?;
        let pn_index = entity.get(3).map(index_list).unwrap_or_default();

        let mut mesh = Mesh::new();
        for face_id in entity.get_ref_list(2) {
            let face = decoder.decode_by_id(face_id)?;
            // IfcIndexedPolygonalFace: CoordIndex; ...WithVoids adds InnerCoordIndices
            let outer = resolve_loop(&face.get(0).map(index_list).unwrap_or_default(), &pn_index, points.len());
            let holes: Vec<Vec<usize>> = face
                .get_list(1)
                .unwrap_or_default()
                .iter()
                .map(|inner| resolve_loop(&index_list(inner), &pn_index, points.len()))
                .collect();

            let outer: Vec<Point3<f64>> = outer.iter().map(|&i| points[i]).collect();
            let holes: Vec<Vec<Point3<f64>>> = holes
                .iter()
                .map(|hole| hole.iter().map(|&i| points[i]).collect())
                .collect();
            // Faces that fail to triangulate are dropped, not the whole set
            let _ = add_planar_face(&mut mesh, &outer, &holes);
        }
        calculate_normals(&mut mesh);
        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcPolygonalFaceSet]
    }
}

/// IfcFacetedBrep - closed shell of poly-loop faces
#[derive(Debug, Default)]
pub struct FacetedBrepProcessor;

impl GeometryProcessor for FacetedBrepProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // IfcFacetedBrep: Outer (IfcClosedShell)
        let shell_id = entity
            .get_ref(0)
            .ok_or_else(|| Error::Unsupported("FacetedBrep without Outer shell".to_string()))?;
        let shell = decoder.decode_by_id(shell_id)?;

        let mut mesh = Mesh::new();
        // IfcClosedShell: CfsFaces
        for face_id in shell.get_ref_list(0) {
            let face = decoder.decode_by_id(face_id)?;
            let mut outer = Vec::new();
            let mut holes = Vec::new();

            // IfcFace: Bounds (IfcFaceOuterBound / IfcFaceBound)
            for bound_id in face.get_ref_list(0) {
                let bound = decoder.decode_by_id(bound_id)?;
                // IfcFaceBound: Bound (IfcPolyLoop), Orientation
                let Some(loop_id) = bound.get_ref(0) else {
                    continue;
                };
                let poly_loop = decoder.decode_by_id(loop_id)?;
                if poly_loop.ifc_type != IfcType::IfcPolyLoop {
                    continue;
                }
                let mut points = Vec::new();
                for point_id in poly_loop.get_ref_list(0) {
                    let point = decoder.decode_by_id(point_id)?;
                    if let Some(coords) = point.get(0).and_then(AttributeValue::as_point3) {
                        points.push(Point3::from(coords));
                    }
                }
                if bound.get_enum(1) == Some("F") {
                    points.reverse();
                }

                if bound.ifc_type == IfcType::IfcFaceOuterBound || outer.is_empty() {
                    if !outer.is_empty() {
                        holes.push(std::mem::take(&mut outer));
                    }
                    outer = points;
                } else {
                    holes.push(points);
                }
            }
            let _ = add_planar_face(&mut mesh, &outer, &holes);
        }
        calculate_normals(&mut mesh);
        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcFacetedBrep]
    }
}

/// Triangulate one planar face (with holes) and append it to the mesh
fn add_planar_face(mesh: &mut Mesh, outer: &[Point3<f64>], holes: &[Vec<Point3<f64>>]) -> Result<()> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError("Face with fewer than 3 points".to_string()));
    }

    if holes.is_empty() && outer.len() == 3 {
        let base = mesh.vertex_count() as u32;
        mesh.positions.extend(flatten(outer));
        mesh.add_triangle(base, base + 1, base + 2);
        return Ok(());
    }

    let normal = polygon_normal(outer)
        .ok_or_else(|| Error::TriangulationError("Degenerate face".to_string()))?;

    // Project outer and holes together so they share one 2D basis
    let all: Vec<Point3<f64>> = outer.iter().chain(holes.iter().flatten()).copied().collect();
    let projected = project_to_2d(&all, &normal);
    let mut profile = Profile2D::new(projected[..outer.len()].to_vec());
    let mut offset = outer.len();
    for hole in holes {
        profile.add_hole(projected[offset..offset + hole.len()].to_vec());
        offset += hole.len();
    }
    let triangulation = profile.triangulate()?;

    let base = mesh.vertex_count() as u32;
    mesh.positions.extend(flatten(&all));
    for tri in triangulation.indices.chunks_exact(3) {
        let (a, b, c) = (all[tri[0]], all[tri[1]], all[tri[2]]);
        // Keep the loop's winding so the face points the way its bound does
        if (b - a).cross(&(c - a)).dot(&normal) < 0.0 {
            mesh.add_triangle(base + tri[0] as u32, base + tri[2] as u32, base + tri[1] as u32);
        } else {
            mesh.add_triangle(base + tri[0] as u32, base + tri[1] as u32, base + tri[2] as u32);
        }
    }
    Ok(())
}

/// IfcCartesianPointList3D referenced from attribute 0
fn point_list(entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Vec<Point3<f64>>> {
    let list_id = entity
        .get_ref(0)
        .ok_or_else(|| Error::Unsupported(format!("{} without Coordinates", entity.type_name)))?;
    let list = decoder.decode_by_id(list_id)?;
    Ok(list
        .get_list(0)
        .unwrap_or_default()
        .iter()
        .filter_map(AttributeValue::as_point3)
        .map(Point3::from)
        .collect())
}

/// 1-based index list attribute, e.g. (1,2,3)
fn index_list(value: &AttributeValue) -> Vec<usize> {
    value
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(AttributeValue::as_int)
        .filter(|i| *i > 0)
        .map(|i| i as usize)
        .collect()
}

/// Map 1-based indices through the optional PnIndex to 0-based point indices,
/// dropping those outside the point list
fn resolve_loop(indices: &[usize], pn_index: &[usize], point_count: usize) -> Vec<usize> {
    indices
        .iter()
        .filter_map(|&i| {
            if pn_index.is_empty() {
                Some(i)
            } else {
                pn_index.get(i - 1).copied()
            }
        })
        .map(|i| i - 1)
        .filter(|&i| i < point_count)
        .collect()
}

fn flatten(points: &[Point3<f64>]) -> Vec<f32> {
    points
        .iter()
        .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(content: &str, id: u32, processor: &dyn GeometryProcessor) -> Mesh {
        let mut decoder = EntityDecoder::new(content);
        let entity = decoder.decode_by_id(id).unwrap();
        processor.process(&entity, &mut decoder).unwrap()
    }

    #[test]
    fn test_triangulated_face_set() {
        let content = "DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(1.,1.,0.),(0.,1.,0.)));
#2=IFCTRIANGULATEDFACESET(#1,$,.T.,((1,2,3),(1,3,4),(1,2,9)),$);
ENDSEC;";
        let mesh = process(content, 2, &TriangulatedFaceSetProcessor);
        assert_eq!(mesh.vertex_count(), 4);
        // Out-of-range triangle is dropped
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.normals.len(), 12);
    }

    #[test]
    fn test_triangulated_face_set_with_pn_index() {
        let content = "DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#2=IFCTRIANGULATEDFACESET(#1,$,$,((1,2,3)),(3,2,1));
ENDSEC;";
        let mesh = process(content, 2, &TriangulatedFaceSetProcessor);
        assert_eq!(mesh.indices, vec![2, 1, 0]);
    }

    #[test]
    fn test_polygonal_face_set() {
        let content = "DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(1.,1.,0.),(0.,1.,0.),(2.,0.,0.)));
#2=IFCINDEXEDPOLYGONALFACE((1,2,3,4));
#3=IFCINDEXEDPOLYGONALFACE((2,5,3));
#4=IFCPOLYGONALFACESET(#1,.F.,(#2,#3),$);
ENDSEC;";
        let mesh = process(content, 4, &PolygonalFaceSetProcessor);
        assert_eq!(mesh.triangle_count(), 3);
    }

    #[test]
    fn test_faceted_brep_cube_face() {
        let content = "DATA;
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCCARTESIANPOINT((1.,0.,0.));
#3=IFCCARTESIANPOINT((1.,1.,0.));
#4=IFCCARTESIANPOINT((0.,1.,0.));
#5=IFCPOLYLOOP((#1,#2,#3,#4));
#6=IFCFACEOUTERBOUND(#5,.T.);
#7=IFCFACE((#6));
#8=IFCCLOSEDSHELL((#7));
#9=IFCFACETEDBREP(#8);
ENDSEC;";
        let mesh = process(content, 9, &FacetedBrepProcessor);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_faceted_brep_face_with_hole() {
        let content = "DATA;
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCCARTESIANPOINT((4.,0.,0.));
#3=IFCCARTESIANPOINT((4.,4.,0.));
#4=IFCCARTESIANPOINT((0.,4.,0.));
#5=IFCPOLYLOOP((#1,#2,#3,#4));
#11=IFCCARTESIANPOINT((1.,1.,0.));
#12=IFCCARTESIANPOINT((1.,3.,0.));
#13=IFCCARTESIANPOINT((3.,3.,0.));
#14=IFCCARTESIANPOINT((3.,1.,0.));
#15=IFCPOLYLOOP((#11,#12,#13,#14));
#6=IFCFACEOUTERBOUND(#5,.T.);
#16=IFCFACEBOUND(#15,.T.);
#7=IFCFACE((#6,#16));
#8=IFCCLOSEDSHELL((#7));
#9=IFCFACETEDBREP(#8);
ENDSEC;";
        let mesh = process(content, 9, &FacetedBrepProcessor);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 8);
    }
}

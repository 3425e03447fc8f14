// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement and transformation: axis placement parsing and local placement chains.

use crate::{Point3, Result, Vector3};
use buildview_core::{DecodedEntity, EntityDecoder, IfcType};
use nalgebra::{Matrix3, Matrix4};

/// Depth limit for malformed files with circular placement references
const MAX_PLACEMENT_DEPTH: usize = 100;

/// Matrix of an element's ObjectPlacement (attribute 5), identity when absent
pub fn object_placement(element: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    match element.get(5) {
        Some(attr) if !attr.is_null() => match decoder.resolve_ref(attr)? {
            Some(placement) => local_placement(&placement, decoder),
            None => Ok(Matrix4::identity()),
        },
        _ => Ok(Matrix4::identity()),
    }
}

/// Resolve an IfcLocalPlacement chain into a single matrix (parent * local)
pub fn local_placement(placement: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    local_placement_with_depth(placement, decoder, 0)
}

fn local_placement_with_depth(
    placement: &DecodedEntity,
    decoder: &mut EntityDecoder,
    depth: usize,
) -> Result<Matrix4<f64>> {
    if depth > MAX_PLACEMENT_DEPTH || placement.ifc_type != IfcType::IfcLocalPlacement {
        return Ok(Matrix4::identity());
    }

    // Attribute 0: PlacementRelTo
    let parent = match placement.get_ref(0) {
        Some(id) => {
            let parent = decoder.decode_by_id(id)?;
            local_placement_with_depth(&parent, decoder, depth + 1)?
        }
        None => Matrix4::identity(),
    };

    // Attribute 1: RelativePlacement
    let local = match placement.get_ref(1) {
        Some(id) => {
            let relative = decoder.decode_by_id(id)?;
            match relative.ifc_type {
                IfcType::IfcAxis2Placement3D => axis2_placement_3d(&relative, decoder)?,
                IfcType::IfcAxis2Placement2D => axis2_placement_2d(&relative, decoder)?,
                _ => Matrix4::identity(),
            }
        }
        None => Matrix4::identity(),
    };

    Ok(parent * local)
}

/// Parse IfcAxis2Placement3D (Location, Axis, RefDirection) into a matrix
pub fn axis2_placement_3d(placement: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    let location = point_attr(placement, 0, decoder)?.unwrap_or_else(Point3::origin);
    let z_axis = direction_attr(placement, 1, decoder)?.unwrap_or_else(Vector3::z);
    let ref_direction = direction_attr(placement, 2, decoder)?.unwrap_or_else(Vector3::x);
    Ok(frame_matrix(location, z_axis, ref_direction))
}

/// Parse IfcAxis2Placement2D (Location, RefDirection) into a matrix in the XY plane
pub fn axis2_placement_2d(placement: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    let location = point_attr(placement, 0, decoder)?.unwrap_or_else(Point3::origin);
    let ref_direction = direction_attr(placement, 1, decoder)?.unwrap_or_else(Vector3::x);
    Ok(frame_matrix(location, Vector3::z(), ref_direction))
}

/// Parse IfcCartesianTransformationOperator3D
/// (Axis1, Axis2, LocalOrigin, Scale, Axis3) used by mapped items
pub fn transformation_operator(operator: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    let x_axis = direction_attr(operator, 0, decoder)?.unwrap_or_else(Vector3::x);
    let origin = point_attr(operator, 2, decoder)?.unwrap_or_else(Point3::origin);
    let scale = operator.get_float(3).unwrap_or(1.0);
    let z_axis = direction_attr(operator, 4, decoder)?.unwrap_or_else(Vector3::z);

    let mut matrix = frame_matrix(origin, z_axis, x_axis);
    let linear = matrix.fixed_view::<3, 3>(0, 0) * scale;
    matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
    Ok(matrix)
}

/// Orthonormal frame from a Z axis and an approximate X direction
fn frame_matrix(location: Point3<f64>, z_axis: Vector3<f64>, ref_direction: Vector3<f64>) -> Matrix4<f64> {
    let z = z_axis.try_normalize(1e-12).unwrap_or_else(Vector3::z);
    // Project RefDirection onto the plane perpendicular to Z
    let projected = ref_direction - z * ref_direction.dot(&z);
    let x = projected.try_normalize(1e-12).unwrap_or_else(|| {
        // RefDirection parallel to Z: pick any perpendicular
        let fallback = if z.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        (fallback - z * fallback.dot(&z)).normalize()
    });
    let y = z.cross(&x);

    let rotation = Matrix3::from_columns(&[x, y, z]);
    let mut matrix = rotation.to_homogeneous();
    matrix[(0, 3)] = location.x;
    matrix[(1, 3)] = location.y;
    matrix[(2, 3)] = location.z;
    matrix
}

fn point_attr(entity: &DecodedEntity, index: usize, decoder: &mut EntityDecoder) -> Result<Option<Point3<f64>>> {
    let Some(id) = entity.get_ref(index) else {
        return Ok(None);
    };
    let point = decoder.decode_by_id(id)?;
    Ok(point.get(0).and_then(|c| c.as_point3()).map(Point3::from))
}

fn direction_attr(entity: &DecodedEntity, index: usize, decoder: &mut EntityDecoder) -> Result<Option<Vector3<f64>>> {
    let Some(id) = entity.get_ref(index) else {
        return Ok(None);
    };
    let direction = decoder.decode_by_id(id)?;
    Ok(direction
        .get(0)
        .and_then(|c| c.as_point3())
        .map(Vector3::from)
        .and_then(|v| v.try_normalize(1e-12)))
}

/// Convert from IFC's Z-up convention to the Y-up scene convention,
/// (x, y, z) → (x, z, -y)
pub fn z_up_to_y_up() -> Matrix4<f64> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D profile definitions and their extraction from IFC profile entities

use crate::error::{Error, Result};
use crate::placement::axis2_placement_2d;
use buildview_core::{DecodedEntity, EntityDecoder, IfcType};
use nalgebra::{Point2, Point3};
use std::f64::consts::PI;

/// Segment count used to approximate circles
pub const CIRCLE_SEGMENTS: usize = 24;

/// 2D profile with optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Profile2D {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

/// Triangulated profile: vertices (outer then holes) and triangle indices
#[derive(Debug, Clone)]
pub struct Triangulation {
    pub points: Vec<Point2<f64>>,
    pub indices: Vec<usize>,
}

impl Profile2D {
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Signed area of the outer boundary (positive when counter-clockwise)
    pub fn signed_area(&self) -> f64 {
        let n = self.outer.len();
        (0..n)
            .map(|i| {
                let (a, b) = (&self.outer[i], &self.outer[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            / 2.0
    }

    /// Force counter-clockwise winding on the outer boundary
    pub fn normalize_winding(&mut self) {
        if self.signed_area() < 0.0 {
            self.outer.reverse();
        }
    }

    /// Triangulate the profile using earcutr
    pub fn triangulate(&self) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::InvalidProfile(
                "Profile must have at least 3 vertices".to_string(),
            ));
        }

        let points: Vec<Point2<f64>> = self
            .outer
            .iter()
            .chain(self.holes.iter().flatten())
            .copied()
            .collect();
        let vertices: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();

        let mut hole_indices = Vec::with_capacity(self.holes.len());
        let mut offset = self.outer.len();
        for hole in &self.holes {
            hole_indices.push(offset);
            offset += hole.len();
        }

        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|e| Error::TriangulationError(format!("{e:?}")))?;
        Ok(Triangulation { points, indices })
    }
}

/// Build a profile from an IfcProfileDef entity, applying its 2D Position
pub fn process_profile(profile: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Profile2D> {
    let mut result = match profile.ifc_type {
        IfcType::IfcRectangleProfileDef => rectangle(profile)?,
        IfcType::IfcCircleProfileDef => circle(profile)?,
        // Arbitrary profiles carry no Position attribute
        IfcType::IfcArbitraryClosedProfileDef => return arbitrary(profile, decoder),
        _ => return Err(Error::Unsupported(profile.type_name.clone())),
    };

    // Parametric profiles: attribute 2 is Position (IfcAxis2Placement2D)
    if let Some(position_id) = profile.get_ref(2) {
        let position = decoder.decode_by_id(position_id)?;
        let matrix = axis2_placement_2d(&position, decoder)?;
        for point in &mut result.outer {
            let p = matrix.transform_point(&Point3::new(point.x, point.y, 0.0));
            *point = Point2::new(p.x, p.y);
        }
    }
    Ok(result)
}

/// IfcRectangleProfileDef: ProfileType, ProfileName, Position, XDim, YDim
fn rectangle(profile: &DecodedEntity) -> Result<Profile2D> {
    let x_dim = profile
        .get_float(3)
        .ok_or_else(|| Error::InvalidProfile("Rectangle missing XDim".to_string()))?;
    let y_dim = profile
        .get_float(4)
        .ok_or_else(|| Error::InvalidProfile("Rectangle missing YDim".to_string()))?;
    if x_dim <= 0.0 || y_dim <= 0.0 {
        return Err(Error::InvalidProfile(format!("Rectangle {x_dim}x{y_dim}")));
    }

    let (hx, hy) = (x_dim / 2.0, y_dim / 2.0);
    Ok(Profile2D::new(vec![
        Point2::new(-hx, -hy),
        Point2::new(hx, -hy),
        Point2::new(hx, hy),
        Point2::new(-hx, hy),
    ]))
}

/// IfcCircleProfileDef: ProfileType, ProfileName, Position, Radius
fn circle(profile: &DecodedEntity) -> Result<Profile2D> {
    let radius = profile
        .get_float(3)
        .filter(|r| *r > 0.0)
        .ok_or_else(|| Error::InvalidProfile("Circle missing Radius".to_string()))?;

    let points = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = i as f64 * 2.0 * PI / CIRCLE_SEGMENTS as f64;
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    Ok(Profile2D::new(points))
}

/// IfcArbitraryClosedProfileDef: ProfileType, ProfileName, OuterCurve (IfcPolyline)
fn arbitrary(profile: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Profile2D> {
    let curve_id = profile
        .get_ref(2)
        .ok_or_else(|| Error::InvalidProfile("Arbitrary profile missing OuterCurve".to_string()))?;
    let curve = decoder.decode_by_id(curve_id)?;
    if curve.ifc_type != IfcType::IfcPolyline {
        return Err(Error::Unsupported(curve.type_name.clone()));
    }

    let mut points = Vec::new();
    for point_id in curve.get_ref_list(0) {
        let point = decoder.decode_by_id(point_id)?;
        if let Some([x, y, _]) = point.get(0).and_then(|c| c.as_point3()) {
            points.push(Point2::new(x, y));
        }
    }

    // Closed polylines repeat the first point
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let mut result = Profile2D::new(points);
    result.normalize_winding();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_profile() {
        let mut decoder = EntityDecoder::new("DATA;\n#1=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,4.,2.);\nENDSEC;");
        let entity = decoder.decode_by_id(1).unwrap();
        let profile = process_profile(&entity, &mut decoder).unwrap();
        assert_eq!(profile.outer.len(), 4);
        assert_relative_eq!(profile.signed_area(), 8.0);
    }

    #[test]
    fn test_rectangle_with_position() {
        let content = "DATA;
#1=IFCCARTESIANPOINT((5.,1.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCRECTANGLEPROFILEDEF(.AREA.,$,#2,2.,2.);
ENDSEC;";
        let mut decoder = EntityDecoder::new(content);
        let entity = decoder.decode_by_id(3).unwrap();
        let profile = process_profile(&entity, &mut decoder).unwrap();
        assert_relative_eq!(profile.outer[0], Point2::new(4.0, 0.0));
    }

    #[test]
    fn test_circle_profile() {
        let mut decoder = EntityDecoder::new("DATA;\n#1=IFCCIRCLEPROFILEDEF(.AREA.,$,$,0.5);\nENDSEC;");
        let entity = decoder.decode_by_id(1).unwrap();
        let profile = process_profile(&entity, &mut decoder).unwrap();
        assert_eq!(profile.outer.len(), CIRCLE_SEGMENTS);
        assert_relative_eq!(profile.outer[0], Point2::new(0.5, 0.0));
    }

    #[test]
    fn test_arbitrary_profile_reorients_clockwise_polyline() {
        let content = "DATA;
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCCARTESIANPOINT((0.,1.));
#3=IFCCARTESIANPOINT((1.,1.));
#4=IFCCARTESIANPOINT((1.,0.));
#5=IFCPOLYLINE((#1,#2,#3,#4,#1));
#6=IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#5);
ENDSEC;";
        let mut decoder = EntityDecoder::new(content);
        let entity = decoder.decode_by_id(6).unwrap();
        let profile = process_profile(&entity, &mut decoder).unwrap();
        assert_eq!(profile.outer.len(), 4);
        assert!(profile.signed_area() > 0.0);
    }

    #[test]
    fn test_triangulate_with_hole() {
        let mut profile = Profile2D::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ]);
        profile.add_hole(vec![
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 1.0),
        ]);
        let tri = profile.triangulate().unwrap();
        assert_eq!(tri.points.len(), 8);
        assert_eq!(tri.indices.len(), 24);
    }

    #[test]
    fn test_unsupported_profile() {
        let mut decoder = EntityDecoder::new("DATA;\n#1=IFCISHAPEPROFILEDEF(.AREA.,$,$,1.,1.,1.,1.);\nENDSEC;");
        let entity = decoder.decode_by_id(1).unwrap();
        assert!(matches!(process_profile(&entity, &mut decoder), Err(Error::Unsupported(_))));
    }
}

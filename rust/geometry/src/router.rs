// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Router - Dynamic dispatch to geometry processors
//!
//! Routes IFC representation items to the processor registered for their type,
//! follows mapped items, and places the result in scene space: metres, Y-up.

use crate::placement::{axis2_placement_3d, object_placement, transformation_operator, z_up_to_y_up};
use crate::processors::{
    ExtrudedAreaSolidProcessor, FacetedBrepProcessor, GeometryProcessor, PolygonalFaceSetProcessor,
    TriangulatedFaceSetProcessor,
};
use crate::{Error, Mesh, Result};
use buildview_core::{DecodedEntity, EntityDecoder, IfcType};
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Mapped items nested deeper than this are dropped
const MAX_MAPPING_DEPTH: usize = 8;

/// Representation identifiers that never describe the visible body
const NON_BODY_REPRESENTATIONS: &[&str] = &["Axis", "FootPrint", "Box", "Annotation", "Profile", "Clearance"];

/// Geometry router - routes entities to processors
#[derive(Clone)]
pub struct GeometryRouter {
    processors: FxHashMap<IfcType, Arc<dyn GeometryProcessor>>,
    /// File length unit in metres (0.001 for millimetres)
    unit_scale: f64,
}

impl Default for GeometryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryRouter {
    /// Create new router with default processors
    pub fn new() -> Self {
        let mut router = Self {
            processors: FxHashMap::default(),
            unit_scale: 1.0,
        };
        router.register(Arc::new(ExtrudedAreaSolidProcessor));
        router.register(Arc::new(TriangulatedFaceSetProcessor));
        router.register(Arc::new(PolygonalFaceSetProcessor));
        router.register(Arc::new(FacetedBrepProcessor));
        router
    }

    /// Create router with pre-calculated unit scale
    pub fn with_scale(unit_scale: f64) -> Self {
        let mut router = Self::new();
        router.unit_scale = unit_scale;
        router
    }

    pub fn register(&mut self, processor: Arc<dyn GeometryProcessor>) {
        for ifc_type in processor.supported_types() {
            self.processors.insert(ifc_type, Arc::clone(&processor));
        }
    }

    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// Whether an item type produces geometry (directly or through a mapping)
    pub fn supports(&self, ifc_type: IfcType) -> bool {
        ifc_type == IfcType::IfcMappedItem || self.processors.contains_key(&ifc_type)
    }

    /// Mesh of a product in scene space.
    ///
    /// Items that fail or are unsupported are skipped; a product without any
    /// usable body geometry yields an empty mesh.
    pub fn process_element(&self, element: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        let Some(shape_id) = element.get_ref(6) else {
            return Ok(Mesh::new());
        };
        let shape = decoder.decode_typed(shape_id, IfcType::IfcProductDefinitionShape)?;

        let mut mesh = Mesh::new();
        for representation_id in shape.get_ref_list(2) {
            let representation = decoder.decode_by_id(representation_id)?;
            // IfcShapeRepresentation: ContextOfItems, RepresentationIdentifier, RepresentationType, Items
            if representation
                .get_string(1)
                .is_some_and(|id| NON_BODY_REPRESENTATIONS.contains(&id))
            {
                continue;
            }
            mesh.merge(&self.process_representation(&representation, decoder, 0));
        }
        if mesh.is_empty() {
            return Ok(Mesh::new());
        }

        let placement = object_placement(element, decoder)?;
        let to_scene = z_up_to_y_up() * Matrix4::new_scaling(self.unit_scale) * placement;
        mesh.transform(&to_scene);
        mesh.retain_valid_triangles();
        Ok(mesh)
    }

    fn process_representation(&self, representation: &DecodedEntity, decoder: &mut EntityDecoder, depth: usize) -> Mesh {
        let mut mesh = Mesh::new();
        for item_id in representation.get_ref_list(3) {
            let Ok(item) = decoder.decode_by_id(item_id) else {
                continue;
            };
            if let Ok(item_mesh) = self.process_item_with_depth(&item, decoder, depth) {
                mesh.merge(&item_mesh);
            }
        }
        mesh
    }

    /// Mesh of a single representation item in file units and local coordinates
    pub fn process_item(&self, item: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        self.process_item_with_depth(item, decoder, 0)
    }

    fn process_item_with_depth(&self, item: &DecodedEntity, decoder: &mut EntityDecoder, depth: usize) -> Result<Mesh> {
        if item.ifc_type == IfcType::IfcMappedItem {
            return self.process_mapped_item(item, decoder, depth);
        }
        let processor = self
            .processors
            .get(&item.ifc_type)
            .ok_or_else(|| Error::Unsupported(item.type_name.clone()))?;
        processor.process(item, decoder)
    }

    /// IfcMappedItem: MappingSource (IfcRepresentationMap), MappingTarget
    fn process_mapped_item(&self, item: &DecodedEntity, decoder: &mut EntityDecoder, depth: usize) -> Result<Mesh> {
        if depth >= MAX_MAPPING_DEPTH {
            return Err(Error::Unsupported(format!("mapped item #{} nested too deeply", item.id)));
        }
        let source_id = item
            .get_ref(0)
            .ok_or_else(|| Error::Unsupported("MappedItem without MappingSource".to_string()))?;
        let source = decoder.decode_typed(source_id, IfcType::IfcRepresentationMap)?;

        // IfcRepresentationMap: MappingOrigin, MappedRepresentation
        let origin = match source.get_ref(0) {
            Some(id) => {
                let origin = decoder.decode_by_id(id)?;
                axis2_placement_3d(&origin, decoder)?
            }
            None => Matrix4::identity(),
        };
        let target = match item.get_ref(1) {
            Some(id) => {
                let operator = decoder.decode_by_id(id)?;
                transformation_operator(&operator, decoder)?
            }
            None => Matrix4::identity(),
        };

        let representation_id = source
            .get_ref(1)
            .ok_or_else(|| Error::Unsupported("RepresentationMap without MappedRepresentation".to_string()))?;
        let representation = decoder.decode_by_id(representation_id)?;
        let mut mesh = self.process_representation(&representation, decoder, depth + 1);
        mesh.transform(&(target * origin));
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WALL: &str = "DATA;
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCCARTESIANPOINT((1000.,0.,0.));
#4=IFCAXIS2PLACEMENT3D(#3,$,$);
#5=IFCLOCALPLACEMENT($,#4);
#10=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,2000.,200.);
#11=IFCDIRECTION((0.,0.,1.));
#12=IFCEXTRUDEDAREASOLID(#10,#2,#11,3000.);
#13=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#12));
#14=IFCSHAPEREPRESENTATION($,'Axis','Curve2D',(#12));
#15=IFCPRODUCTDEFINITIONSHAPE($,$,(#13,#14));
#16=IFCWALL('g',$,'Wall-01',$,$,#5,#15,$);
#20=IFCREPRESENTATIONMAP(#2,#13);
#21=IFCCARTESIANPOINT((0.,5000.,0.));
#22=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#21,$,$);
#23=IFCMAPPEDITEM(#20,#22);
#24=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#23));
#25=IFCPRODUCTDEFINITIONSHAPE($,$,(#24));
#26=IFCWALL('g2',$,'Wall-02',$,$,$,#25,$);
#27=IFCWALL('g3',$,'NoShape',$,$,#5,$,$);
ENDSEC;";

    #[test]
    fn test_element_in_scene_space() {
        let mut decoder = EntityDecoder::new(WALL);
        let router = GeometryRouter::with_scale(0.001);
        let wall = decoder.decode_by_id(16).unwrap();
        let mesh = router.process_element(&wall, &mut decoder).unwrap();

        // Axis representation skipped: only one box
        assert_eq!(mesh.triangle_count(), 12);
        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 2.0, epsilon = 1e-5);
        // Extrusion height becomes +Y
        assert_relative_eq!(bounds.max.y, 3.0, epsilon = 1e-5);
        // IFC +Y becomes scene -Z
        assert_relative_eq!(bounds.min.z, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_mapped_item_applies_target() {
        let mut decoder = EntityDecoder::new(WALL);
        let router = GeometryRouter::with_scale(0.001);
        let wall = decoder.decode_by_id(26).unwrap();
        let mesh = router.process_element(&wall, &mut decoder).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.center().z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_element_without_representation() {
        let mut decoder = EntityDecoder::new(WALL);
        let wall = decoder.decode_by_id(27).unwrap();
        assert!(GeometryRouter::new().process_element(&wall, &mut decoder).unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_item() {
        let mut decoder = EntityDecoder::new("DATA;\n#1=IFCSWEPTDISKSOLID($,1.,$,$,$);\nENDSEC;");
        let item = decoder.decode_by_id(1).unwrap();
        let router = GeometryRouter::new();
        assert!(!router.supports(item.ifc_type));
        assert!(matches!(router.process_item(&item, &mut decoder), Err(Error::Unsupported(_))));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison. Only the
//! entities the scene builder walks are named; everything else decodes as
//! [`IfcType::Unknown`] and keeps its raw type name on the entity.

use std::fmt;

macro_rules! ifc_types {
    ($($variant:ident => $name:literal,)+) => {
        /// IFC entity types understood by the scene builder
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IfcType {
            $($variant,)+
            /// Any entity not listed above
            Unknown,
        }

        impl IfcType {
            /// Parse IFC type from an upper-case STEP type name
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($name => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }

            /// Upper-case STEP type name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                    Self::Unknown => "UNKNOWN",
                }
            }
        }
    };
}

ifc_types! {
    // Spatial structure
    IfcProject => "IFCPROJECT",
    IfcSite => "IFCSITE",
    IfcBuilding => "IFCBUILDING",
    IfcBuildingStorey => "IFCBUILDINGSTOREY",
    IfcSpace => "IFCSPACE",

    // Building elements
    IfcWall => "IFCWALL",
    IfcWallStandardCase => "IFCWALLSTANDARDCASE",
    IfcSlab => "IFCSLAB",
    IfcBeam => "IFCBEAM",
    IfcColumn => "IFCCOLUMN",
    IfcRoof => "IFCROOF",
    IfcStair => "IFCSTAIR",
    IfcStairFlight => "IFCSTAIRFLIGHT",
    IfcRamp => "IFCRAMP",
    IfcRailing => "IFCRAILING",
    IfcCurtainWall => "IFCCURTAINWALL",
    IfcPlate => "IFCPLATE",
    IfcMember => "IFCMEMBER",
    IfcCovering => "IFCCOVERING",
    IfcFooting => "IFCFOOTING",
    IfcPile => "IFCPILE",
    IfcDoor => "IFCDOOR",
    IfcWindow => "IFCWINDOW",
    IfcOpeningElement => "IFCOPENINGELEMENT",
    IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",
    IfcFurnishingElement => "IFCFURNISHINGELEMENT",
    IfcFurniture => "IFCFURNITURE",
    IfcPipeSegment => "IFCPIPESEGMENT",
    IfcDuctSegment => "IFCDUCTSEGMENT",
    IfcFlowTerminal => "IFCFLOWTERMINAL",

    // Relationships
    IfcRelAggregates => "IFCRELAGGREGATES",
    IfcRelContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",

    // Representation
    IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE",
    IfcShapeRepresentation => "IFCSHAPEREPRESENTATION",
    IfcMappedItem => "IFCMAPPEDITEM",
    IfcRepresentationMap => "IFCREPRESENTATIONMAP",
    IfcCartesianTransformationOperator3D => "IFCCARTESIANTRANSFORMATIONOPERATOR3D",

    // Placement
    IfcLocalPlacement => "IFCLOCALPLACEMENT",
    IfcAxis2Placement3D => "IFCAXIS2PLACEMENT3D",
    IfcAxis2Placement2D => "IFCAXIS2PLACEMENT2D",
    IfcCartesianPoint => "IFCCARTESIANPOINT",
    IfcDirection => "IFCDIRECTION",

    // Geometry items
    IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID",
    IfcTriangulatedFaceSet => "IFCTRIANGULATEDFACESET",
    IfcPolygonalFaceSet => "IFCPOLYGONALFACESET",
    IfcIndexedPolygonalFace => "IFCINDEXEDPOLYGONALFACE",
    IfcCartesianPointList3D => "IFCCARTESIANPOINTLIST3D",
    IfcFacetedBrep => "IFCFACETEDBREP",
    IfcClosedShell => "IFCCLOSEDSHELL",
    IfcFace => "IFCFACE",
    IfcFaceOuterBound => "IFCFACEOUTERBOUND",
    IfcFaceBound => "IFCFACEBOUND",
    IfcPolyLoop => "IFCPOLYLOOP",
    IfcPolyline => "IFCPOLYLINE",

    // Profiles
    IfcRectangleProfileDef => "IFCRECTANGLEPROFILEDEF",
    IfcCircleProfileDef => "IFCCIRCLEPROFILEDEF",
    IfcArbitraryClosedProfileDef => "IFCARBITRARYCLOSEDPROFILEDEF",

    // Presentation
    IfcStyledItem => "IFCSTYLEDITEM",
    IfcPresentationStyleAssignment => "IFCPRESENTATIONSTYLEASSIGNMENT",
    IfcSurfaceStyle => "IFCSURFACESTYLE",
    IfcSurfaceStyleRendering => "IFCSURFACESTYLERENDERING",
    IfcSurfaceStyleShading => "IFCSURFACESTYLESHADING",
    IfcColourRgb => "IFCCOLOURRGB",

    // Units
    IfcUnitAssignment => "IFCUNITASSIGNMENT",
    IfcSiUnit => "IFCSIUNIT",
}

impl IfcType {
    /// Spatial structure elements form the inner levels of the scene tree
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            Self::IfcProject
                | Self::IfcSite
                | Self::IfcBuilding
                | Self::IfcBuildingStorey
                | Self::IfcSpace
        )
    }

    /// Physical elements placed inside the spatial structure
    pub fn is_element(&self) -> bool {
        matches!(
            self,
            Self::IfcWall
                | Self::IfcWallStandardCase
                | Self::IfcSlab
                | Self::IfcBeam
                | Self::IfcColumn
                | Self::IfcRoof
                | Self::IfcStair
                | Self::IfcStairFlight
                | Self::IfcRamp
                | Self::IfcRailing
                | Self::IfcCurtainWall
                | Self::IfcPlate
                | Self::IfcMember
                | Self::IfcCovering
                | Self::IfcFooting
                | Self::IfcPile
                | Self::IfcDoor
                | Self::IfcWindow
                | Self::IfcBuildingElementProxy
                | Self::IfcFurnishingElement
                | Self::IfcFurniture
                | Self::IfcPipeSegment
                | Self::IfcDuctSegment
                | Self::IfcFlowTerminal
        )
    }

    /// Geometry items the scene builder can turn into triangles
    pub fn is_geometry_item(&self) -> bool {
        matches!(
            self,
            Self::IfcExtrudedAreaSolid
                | Self::IfcTriangulatedFaceSet
                | Self::IfcPolygonalFaceSet
                | Self::IfcFacetedBrep
                | Self::IfcMappedItem
        )
    }

    /// Openings subtract from their hosts and are never rendered on their own
    pub fn is_void(&self) -> bool {
        matches!(self, Self::IfcOpeningElement)
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_type_round_trip() {
        assert_eq!(IfcType::from_name("IFCWALL"), IfcType::IfcWall);
        assert_eq!(IfcType::IfcWall.as_str(), "IFCWALL");
        assert_eq!(
            IfcType::from_name("IFCRELCONTAINEDINSPATIALSTRUCTURE"),
            IfcType::IfcRelContainedInSpatialStructure
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(IfcType::from_name("IFCCUSTOMTYPE"), IfcType::Unknown);
        // STEP type names are upper case; lower case is not recognized
        assert_eq!(IfcType::from_name("IfcWall"), IfcType::Unknown);
    }

    #[test]
    fn test_categories() {
        assert!(IfcType::IfcBuildingStorey.is_spatial());
        assert!(!IfcType::IfcWall.is_spatial());
        assert!(IfcType::IfcMappedItem.is_geometry_item());
        assert!(IfcType::IfcOpeningElement.is_void());
        assert!(IfcType::IfcDoor.is_element());
        assert!(!IfcType::IfcOpeningElement.is_element());
        assert!(!IfcType::IfcSpace.is_element());
    }
}

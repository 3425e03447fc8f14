// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BuildView Geometry Processing
//!
//! Turns IFC product representations into triangle meshes using earcutr
//! triangulation and nalgebra for transformations. Output meshes are in
//! metres with +Y up, ready to hang off a scene node.

pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod placement;
pub mod processors;
pub mod profile;
pub mod router;
pub mod styles;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use error::{Error, Result};
pub use extrusion::{extrude_profile, process_extruded_area_solid};
pub use mesh::{calculate_normals, Aabb, Mesh};
pub use placement::{local_placement, object_placement, z_up_to_y_up};
pub use processors::{
    ExtrudedAreaSolidProcessor, FacetedBrepProcessor, GeometryProcessor, PolygonalFaceSetProcessor,
    TriangulatedFaceSetProcessor,
};
pub use profile::{process_profile, Profile2D};
pub use router::GeometryRouter;
pub use styles::{default_color_for_type, Rgba, StyleIndex};
pub use triangulation::{triangulate_loop, triangulate_polygon};

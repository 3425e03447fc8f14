// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface colors from IFC presentation styles
//!
//! Follows IfcStyledItem → IfcSurfaceStyle → IfcSurfaceStyleRendering → IfcColourRgb,
//! with IFC2X3's IfcPresentationStyleAssignment in between when present.

use buildview_core::{AttributeValue, DecodedEntity, EntityDecoder, EntityScanner, IfcType};
use rustc_hash::FxHashMap;

/// RGBA color, components in 0..=1
pub type Rgba = [f32; 4];

/// Nested mapped items deeper than this are ignored
const MAX_MAPPING_DEPTH: usize = 8;

/// Geometry item id → surface color
#[derive(Debug, Clone, Default)]
pub struct StyleIndex {
    colors: FxHashMap<u32, Rgba>,
}

impl StyleIndex {
    /// Scan every IfcStyledItem in the file
    pub fn build(decoder: &mut EntityDecoder) -> Self {
        let mut colors = FxHashMap::default();
        let mut scanner = EntityScanner::new(decoder.content());

        while let Some((_, type_name, start, end)) = scanner.next_entity() {
            if type_name != IfcType::IfcStyledItem.as_str() {
                continue;
            }
            let Ok(styled_item) = decoder.decode_at(start, end) else {
                continue;
            };
            // IfcStyledItem: Item, Styles, Name
            let Some(item_id) = styled_item.get_ref(0) else {
                continue;
            };
            if colors.contains_key(&item_id) {
                continue;
            }
            if let Some(color) = styled_item
                .get(1)
                .and_then(|styles| color_from_styles(styles, decoder))
            {
                colors.insert(item_id, color);
            }
        }

        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color of a geometry item, looking inside mapped representations
    pub fn item_color(&self, item_id: u32, decoder: &mut EntityDecoder) -> Option<Rgba> {
        self.item_color_with_depth(item_id, decoder, 0)
    }

    fn item_color_with_depth(&self, item_id: u32, decoder: &mut EntityDecoder, depth: usize) -> Option<Rgba> {
        if let Some(color) = self.colors.get(&item_id) {
            return Some(*color);
        }
        if depth >= MAX_MAPPING_DEPTH {
            return None;
        }

        let item = decoder.decode_by_id(item_id).ok()?;
        if item.ifc_type != IfcType::IfcMappedItem {
            return None;
        }
        // IfcMappedItem.MappingSource → IfcRepresentationMap.MappedRepresentation
        let map = decoder.decode_by_id(item.get_ref(0)?).ok()?;
        let representation = decoder.decode_by_id(map.get_ref(1)?).ok()?;
        representation
            .get_ref_list(3)
            .into_iter()
            .find_map(|inner| self.item_color_with_depth(inner, decoder, depth + 1))
    }

    /// First styled item color among an element's shape representations
    pub fn element_color(&self, element: &DecodedEntity, decoder: &mut EntityDecoder) -> Option<Rgba> {
        if self.colors.is_empty() {
            return None;
        }
        // IfcProduct attribute 6: Representation (IfcProductDefinitionShape)
        let shape = decoder.decode_by_id(element.get_ref(6)?).ok()?;
        for representation_id in shape.get_ref_list(2) {
            let Ok(representation) = decoder.decode_by_id(representation_id) else {
                continue;
            };
            for item_id in representation.get_ref_list(3) {
                if let Some(color) = self.item_color(item_id, decoder) {
                    return Some(color);
                }
            }
        }
        None
    }
}

fn color_from_styles(styles: &AttributeValue, decoder: &mut EntityDecoder) -> Option<Rgba> {
    let ids = match styles.as_entity_ref() {
        Some(id) => vec![id],
        None => styles.ref_list(),
    };
    ids.into_iter().find_map(|id| color_from_style(id, decoder))
}

fn color_from_style(style_id: u32, decoder: &mut EntityDecoder) -> Option<Rgba> {
    let style = decoder.decode_by_id(style_id).ok()?;
    match style.ifc_type {
        IfcType::IfcSurfaceStyle => {
            // IfcSurfaceStyle: Name, Side, Styles
            style
                .get_ref_list(2)
                .into_iter()
                .find_map(|id| color_from_rendering(id, decoder))
        }
        IfcType::IfcPresentationStyleAssignment => style
            .get_ref_list(0)
            .into_iter()
            .find_map(|id| color_from_style(id, decoder)),
        _ => None,
    }
}

/// IfcSurfaceStyleShading / Rendering: SurfaceColour, Transparency, ...
fn color_from_rendering(rendering_id: u32, decoder: &mut EntityDecoder) -> Option<Rgba> {
    let rendering = decoder.decode_by_id(rendering_id).ok()?;
    if !matches!(
        rendering.ifc_type,
        IfcType::IfcSurfaceStyleRendering | IfcType::IfcSurfaceStyleShading
    ) {
        return None;
    }

    let colour = decoder.decode_by_id(rendering.get_ref(0)?).ok()?;
    if colour.ifc_type != IfcType::IfcColourRgb {
        return None;
    }
    // IfcColourRgb: Name, Red, Green, Blue
    let channel = |i| colour.get_float(i).unwrap_or(0.8).clamp(0.0, 1.0) as f32;
    let transparency = rendering.get_float(1).unwrap_or(0.0) as f32;
    Some([channel(1), channel(2), channel(3), (1.0 - transparency).clamp(0.0, 1.0)])
}

/// Fallback color for products without a surface style
pub fn default_color_for_type(ifc_type: IfcType) -> Rgba {
    match ifc_type {
        IfcType::IfcWall | IfcType::IfcWallStandardCase => [0.85, 0.85, 0.85, 1.0],
        IfcType::IfcSlab => [0.7, 0.7, 0.7, 1.0],
        IfcType::IfcRoof => [0.6, 0.5, 0.4, 1.0],
        IfcType::IfcColumn | IfcType::IfcBeam | IfcType::IfcMember => [0.6, 0.65, 0.7, 1.0],
        IfcType::IfcWindow => [0.6, 0.8, 1.0, 0.4],
        IfcType::IfcDoor => [0.6, 0.45, 0.3, 1.0],
        IfcType::IfcStair | IfcType::IfcStairFlight => [0.75, 0.75, 0.75, 1.0],
        IfcType::IfcRailing => [0.4, 0.4, 0.45, 1.0],
        IfcType::IfcPlate | IfcType::IfcCovering => [0.8, 0.8, 0.8, 1.0],
        IfcType::IfcCurtainWall => [0.5, 0.7, 0.9, 0.5],
        IfcType::IfcFurnishingElement | IfcType::IfcFurniture => [0.7, 0.55, 0.4, 1.0],
        IfcType::IfcSpace => [0.2, 0.85, 1.0, 0.3],
        IfcType::IfcSite => [0.4, 0.8, 0.3, 1.0],
        _ => [0.8, 0.8, 0.8, 1.0],
    }
}

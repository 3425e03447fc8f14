// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction for IFC files
//!
//! Reads the length unit from IFCSIUNIT so geometry can be scaled to metres.

use crate::decoder::EntityDecoder;
use crate::error::Result;
use crate::parser::EntityScanner;
use crate::schema::IfcType;

/// SI prefix multipliers as defined by IfcSIPrefix
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0,
    }
}

/// Extract length unit scale factor from IFC file
///
/// Follows IFCPROJECT → IFCUNITASSIGNMENT → IFCSIUNIT(.LENGTHUNIT.) and
/// returns the multiplier to metres (0.001 for millimetres). Files without a
/// project, with unresolvable unit references, or without an SI length unit
/// are treated as metres.
pub fn extract_length_unit_scale(decoder: &mut EntityDecoder) -> Result<f64> {
    let Some((project_id, _, _)) = EntityScanner::new(decoder.content())
        .find_by_type(IfcType::IfcProject.as_str())
        .into_iter()
        .next()
    else {
        return Ok(1.0);
    };

    // IFCPROJECT attribute 8: UnitsInContext
    let Ok(project) = decoder.decode_by_id(project_id) else {
        return Ok(1.0);
    };
    let Some(units_ref) = project.get_ref(8) else {
        return Ok(1.0);
    };

    let Ok(assignment) = decoder.decode_by_id(units_ref) else {
        return Ok(1.0);
    };
    if assignment.ifc_type != IfcType::IfcUnitAssignment {
        return Ok(1.0);
    }

    for unit_ref in assignment.get_ref_list(0) {
        let Ok(unit) = decoder.decode_by_id(unit_ref) else {
            continue;
        };
        // IFCSIUNIT: Dimensions, UnitType, Prefix, Name
        if unit.ifc_type != IfcType::IfcSiUnit || unit.get_enum(1) != Some("LENGTHUNIT") {
            continue;
        }
        return Ok(unit.get_enum(2).map(get_si_prefix_multiplier).unwrap_or(1.0));
    }

    Ok(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_si_prefix_multipliers() {
        assert_eq!(get_si_prefix_multiplier("MILLI"), 0.001);
        assert_eq!(get_si_prefix_multiplier("CENTI"), 0.01);
        assert_eq!(get_si_prefix_multiplier("KILO"), 1000.0);
        assert_eq!(get_si_prefix_multiplier("UNKNOWN"), 1.0);
    }

    #[test]
    fn test_millimetre_project() {
        let content = "DATA;\n#1=IFCPROJECT('g',$,'P',$,$,$,$,$,#2);\n#2=IFCUNITASSIGNMENT((#3,#4));\n#3=IFCSIUNIT(*,.AREAUNIT.,$,.SQUARE_METRE.);\n#4=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);\nENDSEC;";
        let mut decoder = EntityDecoder::new(content);
        assert_eq!(extract_length_unit_scale(&mut decoder).unwrap(), 0.001);
    }

    #[test]
    fn test_metre_without_prefix() {
        let content = "DATA;\n#1=IFCPROJECT('g',$,'P',$,$,$,$,$,#2);\n#2=IFCUNITASSIGNMENT((#4));\n#4=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);\nENDSEC;";
        let mut decoder = EntityDecoder::new(content);
        assert_eq!(extract_length_unit_scale(&mut decoder).unwrap(), 1.0);
    }

    #[test]
    fn test_dangling_unit_assignment_defaults_to_metres() {
        let content = "DATA;\n#1=IFCPROJECT('g',$,'P',$,$,$,$,$,#99);\nENDSEC;";
        let mut decoder = EntityDecoder::new(content);
        assert_eq!(extract_length_unit_scale(&mut decoder).unwrap(), 1.0);
    }

    #[test]
    fn test_no_project_defaults_to_metres() {
        let mut decoder = EntityDecoder::new("DATA;\n#1=IFCWALL('g',$,$,$,$,$,$,$);\nENDSEC;");
        assert_eq!(extract_length_unit_scale(&mut decoder).unwrap(), 1.0);
    }
}

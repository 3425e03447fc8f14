// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded attribute values and entities

use crate::parser::Token;
use crate::schema::IfcType;

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value, STEP escapes decoded
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value without the surrounding dots
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value such as IFCLABEL('x')
    Typed(String, Vec<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(decode_step_string(s)),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => AttributeValue::List(items.iter().map(Self::from_token).collect()),
            Token::TypedValue(name, args) => AttributeValue::Typed(
                name.to_string(),
                args.iter().map(Self::from_token).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string, looking through typed wrappers like IFCLABEL('x')
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Typed(_, args) if args.len() == 1 => args[0].as_string(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get as float, looking through typed wrappers like IFCNORMALISEDRATIOMEASURE(0.5)
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, args) if args.len() == 1 => args[0].as_float(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }

    /// Entity references contained in a list attribute
    pub fn ref_list(&self) -> Vec<u32> {
        self.as_list()
            .map(|items| items.iter().filter_map(Self::as_entity_ref).collect())
            .unwrap_or_default()
    }

    /// Float triple from a coordinate list like (1.,2.,3.); missing Z is 0
    pub fn as_point3(&self) -> Option<[f64; 3]> {
        let coords = self.as_list()?;
        let x = coords.first()?.as_float()?;
        let y = coords.get(1)?.as_float()?;
        let z = coords.get(2).and_then(Self::as_float).unwrap_or(0.0);
        Some([x, y, z])
    }
}

/// Decoded IFC entity with attributes
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: u32,
    pub ifc_type: IfcType,
    /// Raw upper-case type name, kept for types outside [`IfcType`]
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl DecodedEntity {
    pub fn new(id: u32, type_name: &str, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            ifc_type: IfcType::from_name(type_name),
            type_name: type_name.to_string(),
            attributes,
        }
    }

    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_string())
    }

    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    pub fn get_enum(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_enum())
    }

    /// Entity references from a list attribute (empty if absent)
    pub fn get_ref_list(&self, index: usize) -> Vec<u32> {
        self.get(index).map(|v| v.ref_list()).unwrap_or_default()
    }
}

/// Decode STEP string escapes (ISO 10303-21 §6.4.3).
///
/// Handles doubled quotes and backslashes, `\X2\...\X0\` (UTF-16),
/// `\X4\...\X0\` (UTF-32), `\X\hh` (ISO 8859-1) and `\S\c` (high half).
/// Malformed escapes are kept verbatim.
pub fn decode_step_string(raw: &str) -> String {
    if !raw.contains('\\') && !raw.contains("''") {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if c == '\'' && rest.starts_with("''") {
            out.push('\'');
            rest = &rest[2..];
        } else if c == '\\' {
            if let Some((decoded, consumed)) = decode_escape(rest) {
                out.push_str(&decoded);
                rest = &rest[consumed..];
            } else {
                out.push('\\');
                rest = &rest[1..];
            }
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn decode_escape(input: &str) -> Option<(String, usize)> {
    if input.starts_with("\\\\") {
        return Some(("\\".to_string(), 2));
    }
    for (directive, width) in [("\\X2\\", 4), ("\\X4\\", 8)] {
        if let Some(body) = input.strip_prefix(directive) {
            let end = body.find("\\X0\\")?;
            let hex = &body[..end];
            if hex.len() % width != 0 {
                return None;
            }
            let units = hex
                .as_bytes()
                .chunks(width)
                .map(|chunk| u32::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok())
                .collect::<Option<Vec<u32>>>()?;
            let decoded = if width == 4 {
                let units: Vec<u16> = units.into_iter().map(|u| u as u16).collect();
                String::from_utf16(&units).ok()?
            } else {
                units.into_iter().map(char::from_u32).collect::<Option<String>>()?
            };
            return Some((decoded, directive.len() + end + "\\X0\\".len()));
        }
    }
    if let Some(body) = input.strip_prefix("\\X\\") {
        let byte = u8::from_str_radix(body.get(..2)?, 16).ok()?;
        return Some(((byte as char).to_string(), 5));
    }
    if let Some(body) = input.strip_prefix("\\S\\") {
        let c = body.chars().next()?;
        if !c.is_ascii() {
            return None;
        }
        let high = char::from_u32(c as u32 + 0x80)?;
        return Some((high.to_string(), 4));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_conversion() {
        let attr = AttributeValue::from_token(&Token::EntityRef(123));
        assert_eq!(attr.as_entity_ref(), Some(123));

        let attr = AttributeValue::from_token(&Token::String("test"));
        assert_eq!(attr.as_string(), Some("test"));

        let attr = AttributeValue::from_token(&Token::TypedValue(
            "IFCLABEL",
            vec![Token::String("Wall-01")],
        ));
        assert_eq!(attr.as_string(), Some("Wall-01"));
    }

    #[test]
    fn test_decoded_entity() {
        let entity = DecodedEntity::new(
            1,
            "IFCWALL",
            vec![
                AttributeValue::String("guid".to_string()),
                AttributeValue::EntityRef(2),
                AttributeValue::String("Wall-001".to_string()),
                AttributeValue::List(vec![AttributeValue::EntityRef(3), AttributeValue::Null]),
            ],
        );

        assert_eq!(entity.ifc_type, IfcType::IfcWall);
        assert_eq!(entity.get_ref(1), Some(2));
        assert_eq!(entity.get_string(2), Some("Wall-001"));
        assert_eq!(entity.get_ref_list(3), vec![3]);
        assert!(entity.get_ref_list(9).is_empty());
    }

    #[test]
    fn test_point3() {
        let point = AttributeValue::List(vec![AttributeValue::Float(1.0), AttributeValue::Integer(2)]);
        assert_eq!(point.as_point3(), Some([1.0, 2.0, 0.0]));
    }

    #[test]
    fn test_decode_step_string() {
        assert_eq!(decode_step_string("plain"), "plain");
        assert_eq!(decode_step_string("it''s"), "it's");
        assert_eq!(decode_step_string("Wand \\X2\\00FC\\X0\\ber"), "Wand über");
        assert_eq!(decode_step_string("Caf\\X\\E9"), "Café");
        assert_eq!(decode_step_string("a\\\\b"), "a\\b");
        assert_eq!(decode_step_string("\\S\\|"), "\u{fc}");
        // Unterminated escape is kept as-is
        assert_eq!(decode_step_string("\\X2\\00FC"), "\\X2\\00FC");
    }
}

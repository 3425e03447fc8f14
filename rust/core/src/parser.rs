// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization of entity instances and a quote-aware scanner
//! over the DATA section.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal with STEP escapes still encoded: 'text'
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .TRUE., .ELEMENT.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCLABEL('x'), IFCPARAMETERVALUE(0.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// A tokenized entity instance: `#id=TYPE(args);`
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity<'a> {
    pub id: u32,
    pub type_name: &'a str,
    pub args: Vec<Token<'a>>,
}

fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Parse string literal: 'text'
/// STEP escapes a quote by doubling it
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn content(input: &str) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                return Ok((&input[i..], &input[..i]));
            }
            i += 1;
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    map(delimited(char('\''), content, char('\'')), Token::String)(input)
}

fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0.
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        separated_list0(delimited(ws, char(','), ws), token),
        preceded(ws, char(')')),
    )(input)
}

fn typed_value(input: &str) -> IResult<&str, Token> {
    map(pair(keyword, arguments), |(name, args)| {
        Token::TypedValue(name, args)
    })(input)
}

fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

fn ws(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace())(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float,
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            map(char('$'), |_| Token::Null),
            map(char('*'), |_| Token::Derived),
        )),
        ws,
    )(input)
}

/// Parse a complete entity instance
/// Example: #123=IFCWALL('guid',#2,'name',$,$,#10,#20,$,$);
pub fn parse_entity(input: &str) -> Result<RawEntity<'_>> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(char('='), delimited(ws, keyword, ws)),
        arguments,
    ))(input);

    match result {
        Ok((rest, (id, type_name, args))) => {
            if !rest.trim_start().starts_with(';') {
                return Err(Error::parse(
                    input.len() - rest.len(),
                    format!("Expected ';' after #{id}"),
                ));
            }
            Ok(RawEntity {
                id,
                type_name,
                args,
            })
        }
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {e}"))),
    }
}

/// Find the `;` that terminates the entity starting at `start`, skipping
/// quoted strings. Returns the offset one past the semicolon.
pub(crate) fn find_entity_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    loop {
        let offset = memchr::memchr2(b'\'', b';', &bytes[pos..])?;
        pos += offset;
        if bytes[pos] == b';' {
            return Some(pos + 1);
        }
        // Inside a string: jump to the closing quote, treating '' as an escape
        pos += 1;
        loop {
            let close = memchr::memchr(b'\'', &bytes[pos..])?;
            pos += close + 1;
            if bytes.get(pos) == Some(&b'\'') {
                pos += 1;
                continue;
            }
            break;
        }
    }
}

/// Entity scanner over the DATA section - scans without full parsing
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
    end: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a scanner positioned at the start of the DATA section.
    /// Content without a DATA marker is scanned from the beginning.
    pub fn new(content: &'a str) -> Self {
        let (position, end) = crate::header::data_section(content).unwrap_or((0, content.len()));
        Self {
            content,
            position,
            end,
        }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, line_start, line_end)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();
        loop {
            if self.position >= self.end {
                return None;
            }
            let start = self.position + memchr::memchr(b'#', &bytes[self.position..self.end])?;
            let line_end = find_entity_end(bytes, start)?.min(self.end);
            self.position = line_end;

            let mut cursor = start + 1;
            while cursor < line_end && bytes[cursor].is_ascii_digit() {
                cursor += 1;
            }
            let Ok(id) = self.content[start + 1..cursor].parse::<u32>() else {
                continue;
            };
            while cursor < line_end && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            if bytes.get(cursor) != Some(&b'=') {
                continue;
            }
            cursor += 1;
            while cursor < line_end && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            let type_start = cursor;
            while cursor < line_end && (bytes[cursor].is_ascii_alphanumeric() || bytes[cursor] == b'_')
            {
                cursor += 1;
            }
            if cursor == type_start {
                continue;
            }
            return Some((id, &self.content[type_start..cursor], start, line_end));
        }
    }

    /// Find all entities of a specific type
    pub fn find_by_type(&mut self, target_type: &str) -> Vec<(u32, usize, usize)> {
        let mut results = Vec::new();
        while let Some((id, type_name, start, end)) = self.next_entity() {
            if type_name.eq_ignore_ascii_case(target_type) {
                results.push((id, start, end));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref() {
        assert_eq!(entity_ref("#123"), Ok(("", Token::EntityRef(123))));
    }

    #[test]
    fn test_string_literal_with_escaped_quote() {
        assert_eq!(
            string_literal("'it''s'"),
            Ok(("", Token::String("it''s")))
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(integer("-42"), Ok(("", Token::Integer(-42))));
        assert_eq!(float("0."), Ok(("", Token::Float(0.0))));
        assert_eq!(float("1.5E-10"), Ok(("", Token::Float(1.5e-10))));
    }

    #[test]
    fn test_enum() {
        assert_eq!(enum_value(".MILLI."), Ok(("", Token::Enum("MILLI"))));
    }

    #[test]
    fn test_nested_list() {
        let (_, token) = list("(1,(2.,3.),#4)").unwrap();
        let Token::List(items) = token else {
            panic!("Expected List token");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Token::List(vec![Token::Float(2.0), Token::Float(3.0)]));
        assert_eq!(items[2], Token::EntityRef(4));
    }

    #[test]
    fn test_parse_entity() {
        let entity =
            parse_entity("#123=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#2,'Wall-01',$,$,#10,#20,$,$);")
                .unwrap();
        assert_eq!(entity.id, 123);
        assert_eq!(entity.type_name, "IFCWALL");
        assert_eq!(entity.args.len(), 9);
        assert_eq!(entity.args[2], Token::String("Wall-01"));
    }

    #[test]
    fn test_parse_typed_value() {
        let entity = parse_entity("#7=IFCPROPERTYSINGLEVALUE('Status',$,IFCLABEL('done'),$);").unwrap();
        assert_eq!(
            entity.args[2],
            Token::TypedValue("IFCLABEL", vec![Token::String("done")])
        );
    }

    #[test]
    fn test_parse_entity_rejects_missing_semicolon() {
        assert!(parse_entity("#1=IFCWALL('a')").is_err());
    }

    #[test]
    fn test_scanner_skips_semicolons_in_strings() {
        let content = "DATA;\n#1=IFCWALL('a;b',$);\n#2=IFCSLAB('c',$);\nENDSEC;\n";
        let mut scanner = EntityScanner::new(content);
        let (id, type_name, start, end) = scanner.next_entity().unwrap();
        assert_eq!(id, 1);
        assert_eq!(type_name, "IFCWALL");
        assert_eq!(&content[start..end], "#1=IFCWALL('a;b',$);");
        let (id, type_name, _, _) = scanner.next_entity().unwrap();
        assert_eq!((id, type_name), (2, "IFCSLAB"));
        assert!(scanner.next_entity().is_none());
    }

    #[test]
    fn test_find_by_type() {
        let content = "DATA;\n#1=IFCWALL('a',$);\n#2=IFCDOOR('b',$);\n#3=IFCWALL('c',$);\nENDSEC;";
        let walls = EntityScanner::new(content).find_by_type("IFCWALL");
        assert_eq!(walls.iter().map(|w| w.0).collect::<Vec<_>>(), vec![1, 3]);
    }
}

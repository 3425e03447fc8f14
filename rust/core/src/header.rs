// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP Part 21 header handling: format check, schema detection and
//! location of the DATA section.

use crate::error::{Error, Result};
use memchr::memmem;

const MAGIC: &str = "ISO-10303-21";

/// Header information needed before decoding entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepHeader {
    /// Schema identifier from FILE_SCHEMA, upper-cased (e.g. "IFC4")
    pub schema: String,
    /// Byte range of the DATA section body
    pub data: (usize, usize),
}

/// Read the header of a STEP file
pub fn read_header(content: &str) -> Result<StepHeader> {
    if !content.trim_start().starts_with(MAGIC) {
        return Err(Error::MissingHeader);
    }
    let data = data_section(content).ok_or(Error::MissingDataSection)?;
    let schema = file_schema(&content[..data.0]).unwrap_or_default();
    Ok(StepHeader { schema, data })
}

/// Extract the first identifier of `FILE_SCHEMA(('...'))`
fn file_schema(header: &str) -> Option<String> {
    let start = memmem::find(header.as_bytes(), b"FILE_SCHEMA")?;
    let rest = &header[start..];
    let open = rest.find('\'')?;
    let close = rest[open + 1..].find('\'')?;
    Some(rest[open + 1..open + 1 + close].trim().to_ascii_uppercase())
}

/// Byte range between `DATA;` and the following `ENDSEC;`
pub(crate) fn data_section(content: &str) -> Option<(usize, usize)> {
    let bytes = content.as_bytes();
    let mut from = 0;
    // `DATA;` can legitimately appear inside header strings; require it at a line start
    let start = loop {
        let found = from + memmem::find(&bytes[from..], b"DATA;")?;
        let line_start = bytes[..found]
            .iter()
            .rev()
            .take_while(|b| **b != b'\n')
            .all(|b| b.is_ascii_whitespace());
        if line_start {
            break found + "DATA;".len();
        }
        from = found + 1;
    };
    let end = memmem::find(&bytes[start..], b"ENDSEC;")
        .map(|offset| start + offset)
        .unwrap_or(bytes.len());
    Some((start, end))
}

/// Check whether a detected schema is in the supported list.
/// `IFC4X3_ADD2` matches a supported `IFC4X3`, but `IFC4X3` does not match `IFC4`.
pub fn schema_supported(schema: &str, supported: &[String]) -> bool {
    supported.iter().any(|s| {
        schema == s
            || schema
                .strip_prefix(s.as_str())
                .is_some_and(|rest| rest.starts_with('_'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION(('ViewDefinition'),'2;1');\nFILE_NAME('x.ifc','2024-01-01',(''),(''),'','','');\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n#1=IFCPROJECT('g',$,'P',$,$,$,$,$,$);\nENDSEC;\nEND-ISO-10303-21;\n";

    #[test]
    fn test_read_header() {
        let header = read_header(SAMPLE).unwrap();
        assert_eq!(header.schema, "IFC4");
        let (start, end) = header.data;
        assert!(SAMPLE[start..end].contains("#1=IFCPROJECT"));
        assert!(!SAMPLE[start..end].contains("ENDSEC"));
    }

    #[test]
    fn test_missing_magic() {
        assert_eq!(read_header("{\"asset\":{}}"), Err(Error::MissingHeader));
    }

    #[test]
    fn test_missing_data_section() {
        assert_eq!(
            read_header("ISO-10303-21;\nHEADER;\nENDSEC;\n"),
            Err(Error::MissingDataSection)
        );
    }

    #[test]
    fn test_schema_supported() {
        let supported = vec!["IFC2X3".to_string(), "IFC4".to_string(), "IFC4X3".to_string()];
        assert!(schema_supported("IFC4", &supported));
        assert!(schema_supported("IFC4X3_ADD2", &supported));
        assert!(!schema_supported("IFC5", &supported));
        let only_ifc4 = vec!["IFC4".to_string()];
        assert!(!schema_supported("IFC4X3", &only_ifc4));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BuildView Core Parser
//!
//! STEP/IFC reader built with [nom](https://docs.rs/nom) and
//! [memchr](https://docs.rs/memchr). It provides what the semantic-format
//! scene loader needs and nothing more:
//!
//! - **Header**: format check, `FILE_SCHEMA` detection, DATA section bounds
//! - **Entity scanning**: quote-aware discovery of `#id=TYPE(...);` instances
//! - **Lazy decoding**: on-demand attribute parsing with a per-decoder cache
//! - **Units**: length unit scale from `IFCSIUNIT`
//!
//! ```rust,ignore
//! use buildview_core::{read_header, EntityDecoder, EntityScanner};
//!
//! let header = read_header(content)?;
//! let mut decoder = EntityDecoder::new(content);
//! let mut scanner = EntityScanner::new(content);
//! while let Some((id, type_name, _, _)) = scanner.next_entity() {
//!     if type_name == "IFCWALL" {
//!         let wall = decoder.decode_by_id(id)?;
//!         println!("{:?}", wall.get_string(2));
//!     }
//! }
//! ```

pub mod attribute;
pub mod decoder;
pub mod error;
pub mod header;
pub mod parser;
pub mod schema;
pub mod units;

pub use attribute::{decode_step_string, AttributeValue, DecodedEntity};
pub use decoder::{build_entity_index, EntityDecoder, EntityIndex};
pub use error::{Error, Result};
pub use header::{read_header, schema_supported, StepHeader};
pub use parser::{parse_entity, EntityScanner, RawEntity, Token};
pub use schema::IfcType;
pub use units::{extract_length_unit_scale, get_si_prefix_multiplier};

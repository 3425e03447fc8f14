// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode IFC entities from byte offsets without materializing the
//! whole file.

use crate::attribute::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::{parse_entity, EntityScanner};
use crate::schema::IfcType;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type: entity id -> (start, end) byte offsets
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content in a single scan of the DATA section
pub fn build_entity_index(content: &str) -> EntityIndex {
    // Roughly one entity per 50 bytes in exported models
    let mut index = FxHashMap::with_capacity_and_hasher(content.len() / 50, Default::default());
    let mut scanner = EntityScanner::new(content);
    while let Some((id, _, start, end)) = scanner.next_entity() {
        index.insert(id, (start, end));
    }
    index
}

/// Entity decoder for lazy parsing - uses Arc for cheap cache hits
pub struct EntityDecoder<'a> {
    content: &'a str,
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    index: Arc<EntityIndex>,
}

impl<'a> EntityDecoder<'a> {
    /// Create new decoder, building the index eagerly
    pub fn new(content: &'a str) -> Self {
        Self::with_arc_index(content, Arc::new(build_entity_index(content)))
    }

    /// Create decoder with shared Arc index (for parallel processing)
    pub fn with_arc_index(content: &'a str, index: Arc<EntityIndex>) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            index,
        }
    }

    /// Shared handle to the index, for spawning worker decoders
    pub fn index(&self) -> Arc<EntityIndex> {
        Arc::clone(&self.index)
    }

    pub fn content(&self) -> &'a str {
        self.content
    }

    /// Number of indexed entities
    pub fn entity_count(&self) -> usize {
        self.index.len()
    }

    /// Decode entity at byte offset
    pub fn decode_at(&mut self, start: usize, end: usize) -> Result<Arc<DecodedEntity>> {
        let line = &self.content[start..end];
        let raw = parse_entity(line).map_err(|e| {
            // Cut on a char boundary; entity text may hold multi-byte characters
            let excerpt = line.char_indices().nth(100).map_or(line, |(i, _)| &line[..i]);
            Error::parse(start, format!("{e}, input: {excerpt:?}"))
        })?;

        if let Some(entity) = self.cache.get(&raw.id) {
            return Ok(Arc::clone(entity));
        }

        let attributes = raw.args.iter().map(AttributeValue::from_token).collect();
        let entity = Arc::new(DecodedEntity::new(raw.id, raw.type_name, attributes));
        self.cache.insert(raw.id, Arc::clone(&entity));
        Ok(entity)
    }

    /// Decode entity by ID - O(1) lookup using entity index
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<Arc<DecodedEntity>> {
        if let Some(entity) = self.cache.get(&entity_id) {
            return Ok(Arc::clone(entity));
        }
        let (start, end) = self
            .index
            .get(&entity_id)
            .copied()
            .ok_or(Error::EntityNotFound(entity_id))?;
        self.decode_at(start, end)
    }

    /// Decode an entity and require a specific type
    pub fn decode_typed(&mut self, entity_id: u32, expected: IfcType) -> Result<Arc<DecodedEntity>> {
        let entity = self.decode_by_id(entity_id)?;
        if entity.ifc_type != expected {
            return Err(Error::UnexpectedType {
                id: entity_id,
                expected: expected.as_str(),
                actual: entity.type_name.clone(),
            });
        }
        Ok(entity)
    }

    /// Resolve entity reference (follow #ID); None for null/derived values
    pub fn resolve_ref(&mut self, attr: &AttributeValue) -> Result<Option<Arc<DecodedEntity>>> {
        match attr.as_entity_ref() {
            Some(id) => Ok(Some(self.decode_by_id(id)?)),
            None => Ok(None),
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

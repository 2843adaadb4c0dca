// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory reference implementation of [`MetadataStore`].
//!
//! Rows live in plain vectors (the vector offset is the surrogate id) with
//! one dedup-key index per entity kind. A single `RwLock` guards all of it:
//! every mutating call, including the lookup half of get-or-create, runs
//! under the write lock, so duplicate-key races between check and insert
//! cannot happen within one store instance.

use crate::key::{FunctionKey, LineKey, LocationKey, MappingKey};
use crate::model::{
    Function, FunctionId, Line, Location, LocationId, Mapping, MappingId, NewFunction,
    NewLocation, NewMapping,
};
use crate::store::{MetadataStore, StoreError, StoreResult};
use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

#[derive(Default)]
pub struct InMemoryMetastore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    closed: bool,
    mappings: Vec<NewMapping>,
    functions: Vec<NewFunction>,
    locations: Vec<NewLocation>,
    mapping_keys: FxIndexMap<MappingKey, MappingId>,
    function_keys: FxIndexMap<FunctionKey, FunctionId>,
    location_keys: FxIndexMap<LocationKey, LocationId>,
}

impl InMemoryMetastore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn guard(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn mapping_entity(&self, id: MappingId) -> StoreResult<Mapping> {
        let row = self
            .mappings
            .get(id.to_offset())
            .ok_or(StoreError::MappingNotFound)?;
        Ok(Mapping {
            id,
            start: row.start,
            limit: row.limit,
            offset: row.offset,
            file: row.file.clone(),
            build_id: row.build_id.clone(),
            has_functions: row.has_functions,
            has_filenames: row.has_filenames,
            has_line_numbers: row.has_line_numbers,
            has_inline_frames: row.has_inline_frames,
        })
    }

    fn function_entity(&self, id: FunctionId) -> StoreResult<Function> {
        let row = self
            .functions
            .get(id.to_offset())
            .ok_or(StoreError::FunctionNotFound)?;
        Ok(Function {
            id,
            name: row.name.clone(),
            system_name: row.system_name.clone(),
            filename: row.filename.clone(),
            start_line: row.start_line,
        })
    }

    fn location_entity(&self, id: LocationId) -> StoreResult<Location> {
        let row = self
            .locations
            .get(id.to_offset())
            .ok_or(StoreError::LocationNotFound)?;
        let mapping = match row.mapping_id {
            Some(mapping_id) => Some(self.mapping_entity(mapping_id)?),
            None => None,
        };
        let mut lines = Vec::with_capacity(row.lines.len());
        for line in &row.lines {
            lines.push(Line {
                function: self.function_entity(line.function_id)?,
                line: line.line,
            });
        }
        Ok(Location {
            id,
            address: row.address,
            is_folded: row.is_folded,
            mapping,
            lines,
        })
    }

    fn check_location_references(&self, location: &NewLocation) -> StoreResult<()> {
        if let Some(mapping_id) = location.mapping_id {
            if self.mappings.get(mapping_id.to_offset()).is_none() {
                return Err(StoreError::UnknownMapping(mapping_id.to_raw_id()));
            }
        }
        for line in &location.lines {
            if self.functions.get(line.function_id.to_offset()).is_none() {
                return Err(StoreError::UnknownFunction(line.function_id.to_raw_id()));
            }
        }
        Ok(())
    }

    /// Derives the dedup key of a location row. References must have been
    /// checked first.
    fn derive_location_key(&self, location: &NewLocation) -> StoreResult<LocationKey> {
        let mapping = match location.mapping_id {
            Some(mapping_id) => Some(self.mapping_entity(mapping_id)?),
            None => None,
        };
        let mut lines = Vec::with_capacity(location.lines.len());
        for line in &location.lines {
            let function = self.function_entity(line.function_id)?;
            lines.push(LineKey {
                line: line.line,
                function: FunctionKey::from(&function),
            });
        }
        Ok(LocationKey::derive(
            location.address,
            mapping.as_ref(),
            location.is_folded,
            lines,
        ))
    }

    fn create_mapping(&mut self, mapping: NewMapping) -> StoreResult<Mapping> {
        let id = MappingId::from_offset(self.mappings.len());
        self.mapping_keys.insert(MappingKey::from(&mapping), id);
        self.mappings.push(mapping);
        self.mapping_entity(id)
    }

    fn create_function(&mut self, function: NewFunction) -> StoreResult<Function> {
        let id = FunctionId::from_offset(self.functions.len());
        self.function_keys.insert(FunctionKey::from(&function), id);
        self.functions.push(function);
        self.function_entity(id)
    }

    fn create_location(&mut self, location: NewLocation) -> StoreResult<Location> {
        self.check_location_references(&location)?;
        let key = self.derive_location_key(&location)?;
        let id = LocationId::from_offset(self.locations.len());
        self.location_keys.insert(key, id);
        self.locations.push(location);
        self.location_entity(id)
    }
}

impl MetadataStore for InMemoryMetastore {
    fn mapping_by_key(&self, key: &MappingKey) -> StoreResult<Mapping> {
        let inner = self.inner.read();
        inner.guard()?;
        let id = *inner
            .mapping_keys
            .get(key)
            .ok_or(StoreError::MappingNotFound)?;
        inner.mapping_entity(id)
    }

    fn mapping_by_id(&self, id: MappingId) -> StoreResult<Mapping> {
        let inner = self.inner.read();
        inner.guard()?;
        inner.mapping_entity(id)
    }

    fn create_mapping(&self, mapping: NewMapping) -> StoreResult<Mapping> {
        let mut inner = self.inner.write();
        inner.guard()?;
        inner.create_mapping(mapping)
    }

    fn get_or_create_mapping(&self, mapping: NewMapping) -> StoreResult<Mapping> {
        let mut inner = self.inner.write();
        inner.guard()?;
        let key = MappingKey::from(&mapping);
        if let Some(&id) = inner.mapping_keys.get(&key) {
            return inner.mapping_entity(id);
        }
        inner.create_mapping(mapping)
    }

    fn function_by_key(&self, key: &FunctionKey) -> StoreResult<Function> {
        let inner = self.inner.read();
        inner.guard()?;
        let id = *inner
            .function_keys
            .get(key)
            .ok_or(StoreError::FunctionNotFound)?;
        inner.function_entity(id)
    }

    fn function_by_id(&self, id: FunctionId) -> StoreResult<Function> {
        let inner = self.inner.read();
        inner.guard()?;
        inner.function_entity(id)
    }

    fn create_function(&self, function: NewFunction) -> StoreResult<Function> {
        let mut inner = self.inner.write();
        inner.guard()?;
        inner.create_function(function)
    }

    fn get_or_create_function(&self, function: NewFunction) -> StoreResult<Function> {
        let mut inner = self.inner.write();
        inner.guard()?;
        let key = FunctionKey::from(&function);
        if let Some(&id) = inner.function_keys.get(&key) {
            return inner.function_entity(id);
        }
        inner.create_function(function)
    }

    fn functions(&self) -> StoreResult<Vec<Function>> {
        let inner = self.inner.read();
        inner.guard()?;
        (0..inner.functions.len())
            .map(|offset| inner.function_entity(FunctionId::from_offset(offset)))
            .collect()
    }

    fn location_by_key(&self, key: &LocationKey) -> StoreResult<Location> {
        let inner = self.inner.read();
        inner.guard()?;
        let id = *inner
            .location_keys
            .get(key)
            .ok_or(StoreError::LocationNotFound)?;
        inner.location_entity(id)
    }

    fn location_by_id(&self, id: LocationId) -> StoreResult<Location> {
        let inner = self.inner.read();
        inner.guard()?;
        inner.location_entity(id)
    }

    fn create_location(&self, location: NewLocation) -> StoreResult<Location> {
        let mut inner = self.inner.write();
        inner.guard()?;
        inner.create_location(location)
    }

    fn get_or_create_location(&self, location: NewLocation) -> StoreResult<Location> {
        let mut inner = self.inner.write();
        inner.guard()?;
        inner.check_location_references(&location)?;
        let key = inner.derive_location_key(&location)?;
        if let Some(&id) = inner.location_keys.get(&key) {
            return inner.location_entity(id);
        }
        inner.create_location(location)
    }

    fn update_location(&self, id: LocationId, update: NewLocation) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.guard()?;
        if inner.locations.get(id.to_offset()).is_none() {
            return Err(StoreError::LocationNotFound);
        }
        inner.check_location_references(&update)?;

        let old_key = {
            let row = &inner.locations[id.to_offset()];
            inner.derive_location_key(row)?
        };
        let new_key = inner.derive_location_key(&update)?;

        inner.location_keys.swap_remove(&old_key);
        inner.location_keys.insert(new_key, id);
        inner.locations[id.to_offset()] = update;
        Ok(())
    }

    fn locations(&self) -> StoreResult<Vec<Location>> {
        let inner = self.inner.read();
        inner.guard()?;
        (0..inner.locations.len())
            .map(|offset| inner.location_entity(LocationId::from_offset(offset)))
            .collect()
    }

    fn unsymbolized_locations(&self) -> StoreResult<Vec<Location>> {
        let inner = self.inner.read();
        inner.guard()?;
        (0..inner.locations.len())
            .filter(|&offset| inner.locations[offset].lines.is_empty())
            .map(|offset| inner.location_entity(LocationId::from_offset(offset)))
            .collect()
    }

    fn ping(&self) -> StoreResult<()> {
        self.inner.read().guard()
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.write().closed = true;
        Ok(())
    }
}

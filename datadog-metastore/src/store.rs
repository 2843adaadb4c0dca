// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::key::{FunctionKey, LocationKey, MappingKey};
use crate::model::{
    Function, FunctionId, Location, LocationId, Mapping, MappingId, NewFunction, NewLocation,
    NewMapping,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("mapping not found")]
    MappingNotFound,
    #[error("function not found")]
    FunctionNotFound,
    #[error("location not found")]
    LocationNotFound,
    /// A location referenced a mapping row that does not exist.
    #[error("location references unknown mapping id {0}")]
    UnknownMapping(u64),
    /// A line referenced a function row that does not exist.
    #[error("line references unknown function id {0}")]
    UnknownFunction(u64),
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Lookup misses, as opposed to foreign-key violations or lifecycle
    /// failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::MappingNotFound
                | StoreError::FunctionNotFound
                | StoreError::LocationNotFound
        )
    }
}

/// The metadata store contract.
///
/// Every mutating call is a single transactional unit: it either applies
/// fully or not at all. The `get_or_create_*` operations perform the
/// key-lookup and the insert under one internal critical section, so two
/// concurrent callers with equal attributes observe the same surrogate id
/// and exactly one row is created.
///
/// `create_*` does not itself reject dedup-key collisions; callers that
/// want dedup semantics go through `get_or_create_*`.
pub trait MetadataStore: Send + Sync {
    fn mapping_by_key(&self, key: &MappingKey) -> StoreResult<Mapping>;
    fn mapping_by_id(&self, id: MappingId) -> StoreResult<Mapping>;
    fn create_mapping(&self, mapping: NewMapping) -> StoreResult<Mapping>;
    fn get_or_create_mapping(&self, mapping: NewMapping) -> StoreResult<Mapping>;

    fn function_by_key(&self, key: &FunctionKey) -> StoreResult<Function>;
    fn function_by_id(&self, id: FunctionId) -> StoreResult<Function>;
    fn create_function(&self, function: NewFunction) -> StoreResult<Function>;
    fn get_or_create_function(&self, function: NewFunction) -> StoreResult<Function>;
    fn functions(&self) -> StoreResult<Vec<Function>>;

    fn location_by_key(&self, key: &LocationKey) -> StoreResult<Location>;
    fn location_by_id(&self, id: LocationId) -> StoreResult<Location>;
    fn create_location(&self, location: NewLocation) -> StoreResult<Location>;
    fn get_or_create_location(&self, location: NewLocation) -> StoreResult<Location>;

    /// Rewrites a location in place: address, mapping reference, fold flag,
    /// and the whole line sequence, recomputing its dedup key. The
    /// surrogate id is preserved. Replaying the same update is a no-op
    /// overwrite.
    fn update_location(&self, id: LocationId, update: NewLocation) -> StoreResult<()>;

    /// All locations, mapping data joined in, ordered by surrogate id.
    fn locations(&self) -> StoreResult<Vec<Location>>;

    /// Locations with an empty line sequence, mapping data joined in,
    /// ordered by surrogate id. Recomputed from store content on every
    /// call.
    fn unsymbolized_locations(&self) -> StoreResult<Vec<Location>>;

    fn ping(&self) -> StoreResult<()>;
    fn close(&self) -> StoreResult<()>;
}

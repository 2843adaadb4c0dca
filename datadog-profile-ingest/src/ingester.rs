// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::buffer::{FrozenBuffer, Row, RowBuffer};
use crate::error::IngestError;
use crate::labels::{separate_name_from_labels, Label};
use crate::normalizer::{NormalizedProfile, Normalizer};
use crate::validate::validate_profile;
use async_trait::async_trait;
use datadog_metastore::{
    FunctionId, LocationId, MappingId, MetadataStore, NewFunction, NewLine, NewLocation,
    NewMapping,
};
use datadog_pprof as pprof;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// The external columnar storage capability: appends a sorted row buffer
/// under the table's schema and returns the transaction id at which the
/// rows become visible.
#[async_trait]
pub trait Table: Send + Sync {
    async fn insert_buffer(&self, buffer: FrozenBuffer) -> anyhow::Result<u64>;
}

/// Coordinates a single profile submission: label separation, structural
/// validation, normalization, metadata resolution, and the columnar
/// commit.
pub struct Ingester {
    metastore: Arc<dyn MetadataStore>,
    normalizer: Arc<dyn Normalizer>,
    table: Arc<dyn Table>,
}

impl Ingester {
    pub fn new(
        metastore: Arc<dyn MetadataStore>,
        normalizer: Arc<dyn Normalizer>,
        table: Arc<dyn Table>,
    ) -> Self {
        Self {
            metastore,
            normalizer,
            table,
        }
    }

    /// Ingests one raw profile under the given label set.
    ///
    /// May create mapping/function/location rows as a side effect; existing
    /// rows are never mutated on this path.
    pub async fn ingest(
        &self,
        labels: &[Label],
        raw: &pprof::Profile,
    ) -> Result<(), IngestError> {
        let (name, series_labels) = separate_name_from_labels(labels)?;

        validate_profile(raw)?;

        let normalized = self
            .normalizer
            .normalize(&name, raw)
            .map_err(IngestError::Normalize)?;

        for profile in &normalized {
            if profile.samples.is_empty() {
                debug!(
                    name = %profile.meta.name,
                    sample_type = %profile.meta.sample_type.r#type,
                    sample_unit = %profile.meta.sample_type.unit,
                    "no samples found in profile, dropping it"
                );
                continue;
            }

            self.ingest_normalized(&series_labels, raw, profile).await?;
        }

        Ok(())
    }

    async fn ingest_normalized(
        &self,
        series_labels: &[Label],
        raw: &pprof::Profile,
        profile: &NormalizedProfile,
    ) -> Result<(), IngestError> {
        let mut resolver = MetadataResolver::new(self.metastore.as_ref(), raw);
        let mut buffer = RowBuffer::with_capacity(profile.samples.len());

        for sample in &profile.samples {
            let mut stacktrace = Vec::with_capacity(sample.stacktrace.len());
            for &raw_location_id in &sample.stacktrace {
                stacktrace.push(resolver.location(raw_location_id)?);
            }

            buffer.push(Row {
                name: profile.meta.name.clone(),
                sample_type: profile.meta.sample_type.r#type.clone(),
                sample_unit: profile.meta.sample_type.unit.clone(),
                labels: series_labels.to_vec(),
                sample_labels: sample
                    .labels
                    .iter()
                    .map(|(name, value)| Label::new(name.clone(), value.clone()))
                    .collect(),
                sample_num_labels: sample
                    .num_labels
                    .iter()
                    .map(|(name, value)| (name.clone(), *value))
                    .collect(),
                stacktrace,
                timestamp: profile.meta.timestamp,
                period: profile.meta.period,
                duration: profile.meta.duration,
                value: sample.value,
            });
        }

        let buffer = buffer.freeze();
        self.table
            .insert_buffer(buffer)
            .await
            .map_err(IngestError::Storage)?;

        Ok(())
    }
}

/// Resolves a raw profile's metadata against the metastore, memoizing
/// raw-id lookups so each referenced entity is get-or-created exactly once
/// per ingest call. New locations are created with whatever line content
/// the raw profile already carries; address-only frames start out with an
/// empty line sequence and are picked up by the symbolizer later.
struct MetadataResolver<'a> {
    store: &'a dyn MetadataStore,
    profile: &'a pprof::Profile,
    mappings: FxHashMap<u64, MappingId>,
    functions: FxHashMap<u64, FunctionId>,
    locations: FxHashMap<u64, LocationId>,
}

impl<'a> MetadataResolver<'a> {
    fn new(store: &'a dyn MetadataStore, profile: &'a pprof::Profile) -> Self {
        Self {
            store,
            profile,
            mappings: FxHashMap::default(),
            functions: FxHashMap::default(),
            locations: FxHashMap::default(),
        }
    }

    fn location(&mut self, raw_id: u64) -> Result<LocationId, IngestError> {
        if let Some(&id) = self.locations.get(&raw_id) {
            return Ok(id);
        }

        let raw = raw_id
            .checked_sub(1)
            .and_then(|offset| self.profile.locations.get(offset as usize))
            .ok_or_else(|| {
                IngestError::Normalize(anyhow::anyhow!(
                    "normalized sample references unknown location id {raw_id}"
                ))
            })?;

        let mapping_id = match raw.mapping_id {
            0 => None,
            id => Some(self.mapping(id)?),
        };

        let mut lines = Vec::with_capacity(raw.lines.len());
        for line in &raw.lines {
            if line.function_id == 0 {
                continue;
            }
            lines.push(NewLine {
                function_id: self.function(line.function_id)?,
                line: line.line,
            });
        }

        let location = self.store.get_or_create_location(NewLocation {
            address: raw.address,
            is_folded: raw.is_folded,
            mapping_id,
            lines,
        })?;
        self.locations.insert(raw_id, location.id);
        Ok(location.id)
    }

    fn mapping(&mut self, raw_id: u64) -> Result<MappingId, IngestError> {
        if let Some(&id) = self.mappings.get(&raw_id) {
            return Ok(id);
        }

        // Validation pinned mapping ids to their 1-based positions.
        let raw = &self.profile.mappings[raw_id as usize - 1];
        let mapping = self.store.get_or_create_mapping(NewMapping {
            start: raw.memory_start,
            limit: raw.memory_limit,
            offset: raw.file_offset,
            file: self.profile.string_or_empty(raw.filename).to_owned(),
            build_id: self.profile.string_or_empty(raw.build_id).to_owned(),
            has_functions: raw.has_functions,
            has_filenames: raw.has_filenames,
            has_line_numbers: raw.has_line_numbers,
            has_inline_frames: raw.has_inline_frames,
        })?;
        self.mappings.insert(raw_id, mapping.id);
        Ok(mapping.id)
    }

    fn function(&mut self, raw_id: u64) -> Result<FunctionId, IngestError> {
        if let Some(&id) = self.functions.get(&raw_id) {
            return Ok(id);
        }

        let raw = &self.profile.functions[raw_id as usize - 1];
        let function = self.store.get_or_create_function(NewFunction {
            name: self.profile.string_or_empty(raw.name).to_owned(),
            system_name: self.profile.string_or_empty(raw.system_name).to_owned(),
            filename: self.profile.string_or_empty(raw.filename).to_owned(),
            start_line: raw.start_line,
        })?;
        self.functions.insert(raw_id, function.id);
        Ok(function.id)
    }
}

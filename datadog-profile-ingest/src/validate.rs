// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structural validation of a raw profile graph before any store mutation.
//! Checks run in a fixed order so a malformed profile always reports the
//! same first failure. Validation is read-only; nothing is repaired or
//! truncated.

use datadog_pprof as pprof;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("first item in string table is expected to be empty string, but it is {actual:?}")]
    StringTable { actual: String },
    #[error("mapping id at position {index} is not sequential")]
    MappingIdNotSequential { index: usize },
    #[error("mapping {id} has invalid string index {string_index}")]
    MappingStringIndex { id: u64, string_index: i64 },
    #[error("function id at position {index} is not sequential")]
    FunctionIdNotSequential { index: usize },
    #[error("function {id} has invalid string index {string_index}")]
    FunctionStringIndex { id: u64, string_index: i64 },
    #[error("location id at position {index} is not sequential")]
    LocationIdNotSequential { index: usize },
    #[error("location {id} has invalid mapping id {mapping_id}")]
    LocationMappingId { id: u64, mapping_id: u64 },
    #[error("location {id} has invalid function id {function_id}")]
    LocationFunctionId { id: u64, function_id: u64 },
    #[error("profile has samples but no sample types")]
    MissingSampleType,
    #[error("sample {index} has {got} values but profile declares {want} sample types")]
    SampleValueCount {
        index: usize,
        got: usize,
        want: usize,
    },
    #[error("sample {index} has no location ids")]
    SampleWithoutLocations { index: usize },
    #[error("sample {index} references invalid location id {location_id}")]
    SampleLocationId { index: usize, location_id: u64 },
    #[error("sample {sample} label {label} has no key")]
    LabelWithoutKey { sample: usize, label: usize },
    #[error("sample {sample} label {label} has invalid key index {index}")]
    LabelKeyIndex {
        sample: usize,
        label: usize,
        index: i64,
    },
    #[error("sample {sample} label {label} has invalid str index {index}")]
    LabelStrIndex {
        sample: usize,
        label: usize,
        index: i64,
    },
}

fn string_index_in_bounds(index: i64, len: i64) -> bool {
    index == 0 || (0..=len).contains(&index)
}

pub fn validate_profile(profile: &pprof::Profile) -> Result<(), ValidationError> {
    let string_table_len = profile.string_table.len() as i64;

    if string_table_len > 0 && !profile.string_table[0].is_empty() {
        return Err(ValidationError::StringTable {
            actual: profile.string_table[0].clone(),
        });
    }

    let mappings_len = profile.mappings.len() as u64;
    for (i, mapping) in profile.mappings.iter().enumerate() {
        if mapping.id != i as u64 + 1 {
            return Err(ValidationError::MappingIdNotSequential { index: i });
        }
        if !string_index_in_bounds(mapping.filename, string_table_len) {
            return Err(ValidationError::MappingStringIndex {
                id: mapping.id,
                string_index: mapping.filename,
            });
        }
        if !string_index_in_bounds(mapping.build_id, string_table_len) {
            return Err(ValidationError::MappingStringIndex {
                id: mapping.id,
                string_index: mapping.build_id,
            });
        }
    }

    let functions_len = profile.functions.len() as u64;
    for (i, function) in profile.functions.iter().enumerate() {
        if function.id != i as u64 + 1 {
            return Err(ValidationError::FunctionIdNotSequential { index: i });
        }
        for string_index in [function.name, function.system_name, function.filename] {
            if !string_index_in_bounds(string_index, string_table_len) {
                return Err(ValidationError::FunctionStringIndex {
                    id: function.id,
                    string_index,
                });
            }
        }
    }

    let locations_len = profile.locations.len() as u64;
    for (i, location) in profile.locations.iter().enumerate() {
        if location.id != i as u64 + 1 {
            return Err(ValidationError::LocationIdNotSequential { index: i });
        }
        if location.mapping_id > mappings_len {
            return Err(ValidationError::LocationMappingId {
                id: location.id,
                mapping_id: location.mapping_id,
            });
        }
        for line in &location.lines {
            if line.function_id > functions_len {
                return Err(ValidationError::LocationFunctionId {
                    id: location.id,
                    function_id: line.function_id,
                });
            }
        }
    }

    let sample_types_len = profile.sample_types.len();
    if sample_types_len == 0 && !profile.samples.is_empty() {
        return Err(ValidationError::MissingSampleType);
    }

    for (i, sample) in profile.samples.iter().enumerate() {
        if sample.values.len() != sample_types_len {
            return Err(ValidationError::SampleValueCount {
                index: i,
                got: sample.values.len(),
                want: sample_types_len,
            });
        }
        if sample.location_ids.is_empty() {
            return Err(ValidationError::SampleWithoutLocations { index: i });
        }
        for &location_id in &sample.location_ids {
            if location_id == 0 || location_id > locations_len {
                return Err(ValidationError::SampleLocationId {
                    index: i,
                    location_id,
                });
            }
        }
        for (j, label) in sample.labels.iter().enumerate() {
            if label.key == 0 {
                return Err(ValidationError::LabelWithoutKey {
                    sample: i,
                    label: j,
                });
            }
            if !string_index_in_bounds(label.key, string_table_len) {
                return Err(ValidationError::LabelKeyIndex {
                    sample: i,
                    label: j,
                    index: label.key,
                });
            }
            if !string_index_in_bounds(label.str, string_table_len) {
                return Err(ValidationError::LabelStrIndex {
                    sample: i,
                    label: j,
                    index: label.str,
                });
            }
        }
    }

    Ok(())
}

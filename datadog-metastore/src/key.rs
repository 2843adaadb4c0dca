// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Dedup key derivation. Keys are pure functions of an entity's semantic
//! attributes: no surrogate ids, timestamps, or pointer identity, so they
//! are stable across process restarts and creation order.

use crate::model::{Function, Mapping, NewFunction, NewMapping};

/// Dedup key of a mapping. `size` rather than the raw load address keeps
/// mappings of the same binary equal across ASLR-randomized loads; the file
/// path stands in when the binary carries no build id.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MappingKey {
    size: u64,
    offset: u64,
    build_id_or_file: String,
}

impl MappingKey {
    pub fn derive(start: u64, limit: u64, offset: u64, file: &str, build_id: &str) -> Self {
        let build_id_or_file = if build_id.is_empty() { file } else { build_id };
        Self {
            size: limit.wrapping_sub(start),
            offset,
            build_id_or_file: build_id_or_file.to_owned(),
        }
    }
}

impl From<&Mapping> for MappingKey {
    fn from(m: &Mapping) -> Self {
        Self::derive(m.start, m.limit, m.offset, &m.file, &m.build_id)
    }
}

impl From<&NewMapping> for MappingKey {
    fn from(m: &NewMapping) -> Self {
        Self::derive(m.start, m.limit, m.offset, &m.file, &m.build_id)
    }
}

/// Dedup key of a function.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FunctionKey {
    start_line: i64,
    name: String,
    system_name: String,
    filename: String,
}

impl FunctionKey {
    pub fn derive(name: &str, system_name: &str, filename: &str, start_line: i64) -> Self {
        Self {
            start_line,
            name: name.to_owned(),
            system_name: system_name.to_owned(),
            filename: filename.to_owned(),
        }
    }
}

impl From<&Function> for FunctionKey {
    fn from(f: &Function) -> Self {
        Self::derive(&f.name, &f.system_name, &f.filename, f.start_line)
    }
}

impl From<&NewFunction> for FunctionKey {
    fn from(f: &NewFunction) -> Self {
        Self::derive(&f.name, &f.system_name, &f.filename, f.start_line)
    }
}

/// One element of a location key's encoded line sequence. Lines are encoded
/// by function *key*, not function id, so location keys never depend on an
/// assigned surrogate id.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub line: i64,
    pub function: FunctionKey,
}

/// Dedup key of a location. Includes the encoded line sequence, so the
/// same address keys differently before and after symbolization; identity
/// across that transition is carried by the surrogate id alone.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    normalized_address: u64,
    mapping: Option<MappingKey>,
    is_folded: bool,
    lines: Vec<LineKey>,
}

impl LocationKey {
    pub fn derive(
        address: u64,
        mapping: Option<&Mapping>,
        is_folded: bool,
        lines: Vec<LineKey>,
    ) -> Self {
        let normalized_address = match mapping {
            Some(mapping) => address.wrapping_sub(mapping.start),
            None => address,
        };
        Self {
            normalized_address,
            mapping: mapping.map(MappingKey::from),
            is_folded,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(id_offset: usize, start: u64) -> Mapping {
        Mapping {
            id: crate::MappingId::from_offset(id_offset),
            start,
            limit: start + 0x64000,
            offset: 0,
            file: "/bin/app".into(),
            build_id: "abc123".into(),
            has_functions: false,
            has_filenames: false,
            has_line_numbers: false,
            has_inline_frames: false,
        }
    }

    #[test]
    fn mapping_key_ignores_load_address() {
        // Same binary loaded at two different base addresses.
        let a = mapping(0, 0x400000);
        let b = mapping(7, 0x7f32_0000);
        assert_eq!(MappingKey::from(&a), MappingKey::from(&b));
    }

    #[test]
    fn mapping_key_falls_back_to_file() {
        let mut a = mapping(0, 0x400000);
        let mut b = mapping(1, 0x400000);
        a.build_id.clear();
        b.build_id.clear();
        assert_eq!(MappingKey::from(&a), MappingKey::from(&b));

        b.file = "/bin/other".into();
        assert_ne!(MappingKey::from(&a), MappingKey::from(&b));
    }

    #[test]
    fn function_key_ignores_surrogate_id() {
        let a = Function {
            id: crate::FunctionId::from_offset(0),
            name: "main.main".into(),
            system_name: "main.main".into(),
            filename: "main.go".into(),
            start_line: 0,
        };
        let mut b = a.clone();
        b.id = crate::FunctionId::from_offset(41);
        assert_eq!(FunctionKey::from(&a), FunctionKey::from(&b));
    }

    #[test]
    fn location_key_normalizes_address() {
        let m = mapping(0, 0x400000);
        let a = LocationKey::derive(0x463781, Some(&m), false, Vec::new());
        let moved = mapping(0, 0x800000);
        let b = LocationKey::derive(0x863781, Some(&moved), false, Vec::new());
        assert_eq!(a, b);
    }

    #[test]
    fn location_key_changes_with_line_sequence() {
        let m = mapping(0, 0x400000);
        let bare = LocationKey::derive(0x463781, Some(&m), false, Vec::new());
        let symbolized = LocationKey::derive(
            0x463781,
            Some(&m),
            false,
            vec![LineKey {
                line: 7,
                function: FunctionKey::derive("main.main", "main.main", "main.go", 0),
            }],
        );
        assert_ne!(bare, symbolized);
    }
}

// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroU64;

/// Surrogate id of a [`Mapping`]. Dense, monotonic, assigned by the store.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct MappingId(NonZeroU64);

impl MappingId {
    pub(crate) fn from_offset(offset: usize) -> Self {
        // Row offsets come from a Vec index, so the +1 cannot wrap a u64.
        Self(NonZeroU64::new(offset as u64 + 1).expect("mapping id to be non-zero"))
    }

    pub(crate) fn to_offset(self) -> usize {
        (self.0.get() - 1) as usize
    }

    pub fn to_raw_id(self) -> u64 {
        self.0.get()
    }
}

/// Surrogate id of a [`Function`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FunctionId(NonZeroU64);

impl FunctionId {
    pub(crate) fn from_offset(offset: usize) -> Self {
        Self(NonZeroU64::new(offset as u64 + 1).expect("function id to be non-zero"))
    }

    pub(crate) fn to_offset(self) -> usize {
        (self.0.get() - 1) as usize
    }

    pub fn to_raw_id(self) -> u64 {
        self.0.get()
    }
}

/// Surrogate id of a [`Location`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LocationId(NonZeroU64);

impl LocationId {
    pub(crate) fn from_offset(offset: usize) -> Self {
        Self(NonZeroU64::new(offset as u64 + 1).expect("location id to be non-zero"))
    }

    pub(crate) fn to_offset(self) -> usize {
        (self.0.get() - 1) as usize
    }

    pub fn to_raw_id(self) -> u64 {
        self.0.get()
    }
}

/// A loaded binary or library region. Immutable once created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mapping {
    pub id: MappingId,
    pub start: u64,
    pub limit: u64,
    pub offset: u64,
    pub file: String,
    pub build_id: String,
    pub has_functions: bool,
    pub has_filenames: bool,
    pub has_line_numbers: bool,
    pub has_inline_frames: bool,
}

/// Attributes for creating a [`Mapping`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewMapping {
    pub start: u64,
    pub limit: u64,
    pub offset: u64,
    pub file: String,
    pub build_id: String,
    pub has_functions: bool,
    pub has_filenames: bool,
    pub has_line_numbers: bool,
    pub has_inline_frames: bool,
}

/// A named function. Immutable once created; referenced by many lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub system_name: String,
    pub filename: String,
    pub start_line: i64,
}

/// Attributes for creating a [`Function`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewFunction {
    pub name: String,
    pub system_name: String,
    pub filename: String,
    pub start_line: i64,
}

/// One source line of a location, with its function joined in. Lines are
/// not independently addressable; they exist only as members of a
/// location's ordered line sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Line {
    pub function: Function,
    pub line: i64,
}

/// A line reference used when creating or rewriting a location.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NewLine {
    pub function_id: FunctionId,
    pub line: i64,
}

/// A single stack frame, with its mapping and line sequence joined in.
/// The line sequence is innermost (deepest inlined) frame first and is
/// empty until the address has been symbolized.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub address: u64,
    pub is_folded: bool,
    pub mapping: Option<Mapping>,
    pub lines: Vec<Line>,
}

/// Attributes for creating or rewriting a [`Location`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewLocation {
    pub address: u64,
    pub is_folded: bool,
    pub mapping_id: Option<MappingId>,
    pub lines: Vec<NewLine>,
}

impl Location {
    /// The address relative to the owning mapping's load address, which is
    /// what dedup keys and symbol resolution operate on.
    pub fn normalized_address(&self) -> u64 {
        match &self.mapping {
            Some(mapping) => self.address.wrapping_sub(mapping.start),
            None => self.address,
        }
    }
}

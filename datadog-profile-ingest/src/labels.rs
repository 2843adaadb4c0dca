// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::IngestError;

/// The reserved label carrying the profile series name.
pub const NAME_LABEL: &str = "__name__";

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Splits the reserved name label out of a label set.
///
/// The remaining labels are validated and returned sorted by name.
/// Duplicate names and names outside `[a-zA-Z_][a-zA-Z0-9_]*` are
/// rejected; both are invalid-argument failures, not structural ones.
pub fn separate_name_from_labels(
    labels: &[Label],
) -> Result<(String, Vec<Label>), IngestError> {
    let mut name = String::new();
    let mut out = Vec::with_capacity(labels.len());
    for label in labels {
        if label.name == NAME_LABEL {
            name = label.value.clone();
        } else {
            if !is_valid_label_name(&label.name) {
                return Err(IngestError::InvalidLabelName(label.name.clone()));
            }
            out.push(label.clone());
        }
    }

    if name.is_empty() {
        return Err(IngestError::MissingNameLabel);
    }

    out.sort();
    for pair in out.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(IngestError::DuplicateLabel(pair[0].name.clone()));
        }
    }

    Ok((name, out))
}

fn is_valid_label_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().enumerate().all(|(i, b)| {
            b == b'_' || b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit())
        })
}

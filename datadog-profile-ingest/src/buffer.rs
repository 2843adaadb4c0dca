// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::labels::Label;
use datadog_metastore::LocationId;
use std::sync::Arc;

/// One sample row in columnar layout order. The derived ordering doubles
/// as the sorting-column order: series identity first, then stacktrace,
/// then time.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct Row {
    pub name: String,
    pub sample_type: String,
    pub sample_unit: String,
    pub labels: Vec<Label>,
    pub sample_labels: Vec<Label>,
    pub sample_num_labels: Vec<(String, i64)>,
    pub stacktrace: Vec<LocationId>,
    pub timestamp: i64,
    pub period: i64,
    pub duration: i64,
    pub value: i64,
}

/// A mutable accumulation of rows for one normalized profile.
#[derive(Debug, Default)]
pub struct RowBuffer {
    rows: Vec<Row>,
}

impl RowBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorts the rows once and freezes them into an immutable snapshot.
    /// Concurrent readers of the snapshot never observe re-sorting.
    pub fn freeze(mut self) -> FrozenBuffer {
        self.rows.sort();
        FrozenBuffer {
            rows: Arc::from(self.rows),
        }
    }
}

/// An immutable, already-ordered row snapshot, cheap to clone and safe to
/// share with concurrent readers.
#[derive(Clone, Debug)]
pub struct FrozenBuffer {
    rows: Arc<[Row]>,
}

impl FrozenBuffer {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

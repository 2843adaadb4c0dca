// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::validate::ValidationError;
use datadog_metastore::StoreError;

/// Failure classes of a single ingest call.
///
/// Label failures (`MissingNameLabel`, `DuplicateLabel`,
/// `InvalidLabelName`) are distinct from structural `Validation` failures
/// so callers can map them to a different client-facing status.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("missing __name__ label")]
    MissingNameLabel,
    #[error("duplicate label name {0:?}")]
    DuplicateLabel(String),
    #[error("invalid label name {0:?}")]
    InvalidLabelName(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to normalize profile: {0}")]
    Normalize(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to insert buffer: {0}")]
    Storage(#[source] anyhow::Error),
}

impl IngestError {
    /// Whether the failure is the caller's fault (bad labels or a malformed
    /// profile) rather than a backend failure.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            IngestError::MissingNameLabel
                | IngestError::DuplicateLabel(_)
                | IngestError::InvalidLabelName(_)
                | IngestError::Validation(_)
        )
    }
}

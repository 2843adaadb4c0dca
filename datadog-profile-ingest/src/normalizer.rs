// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use datadog_pprof as pprof;
use std::collections::BTreeMap;

/// A sample type or period type with its string indices resolved.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueType {
    pub r#type: String,
    pub unit: String,
}

/// Per-sample-type metadata of a normalized profile.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileMeta {
    pub name: String,
    pub sample_type: ValueType,
    pub period_type: ValueType,
    pub period: i64,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub duration: i64,
}

/// One sample of a normalized profile. The stacktrace still references the
/// raw profile's 1-based location ids; the ingester resolves those against
/// the metastore.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NormalizedSample {
    pub stacktrace: Vec<u64>,
    pub value: i64,
    pub labels: BTreeMap<String, String>,
    pub num_labels: BTreeMap<String, i64>,
}

/// A raw profile split down to a single sample type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NormalizedProfile {
    pub meta: ProfileMeta,
    pub samples: Vec<NormalizedSample>,
}

/// The upstream normalization capability: splits a validated raw profile
/// into one normalized profile per declared sample type. A normalized
/// profile may legitimately come back with zero samples.
pub trait Normalizer: Send + Sync {
    fn normalize(
        &self,
        name: &str,
        profile: &pprof::Profile,
    ) -> anyhow::Result<Vec<NormalizedProfile>>;
}

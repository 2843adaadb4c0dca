// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use datadog_pprof as pprof;
use datadog_profile_ingest::{
    FrozenBuffer, NormalizedProfile, NormalizedSample, Normalizer, ProfileMeta, Table, ValueType,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Table capability that records every committed buffer and hands out
/// monotonic transaction ids.
#[derive(Default)]
pub struct CapturingTable {
    inserts: Mutex<Vec<FrozenBuffer>>,
    next_tx: AtomicU64,
}

impl CapturingTable {
    pub fn inserted(&self) -> Vec<FrozenBuffer> {
        self.inserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Table for CapturingTable {
    async fn insert_buffer(&self, buffer: FrozenBuffer) -> anyhow::Result<u64> {
        self.inserts.lock().unwrap().push(buffer);
        Ok(self.next_tx.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Table capability that refuses every commit.
pub struct UnavailableTable;

#[async_trait]
impl Table for UnavailableTable {
    async fn insert_buffer(&self, _buffer: FrozenBuffer) -> anyhow::Result<u64> {
        anyhow::bail!("columnar store unavailable")
    }
}

/// Minimal stand-in for the upstream normalization capability: one
/// normalized profile per declared sample type, dropping zero values the
/// way the real normalizer does. A sample type whose values are all zero
/// therefore yields a normalized profile with no samples.
pub struct SplitNormalizer;

impl Normalizer for SplitNormalizer {
    fn normalize(
        &self,
        name: &str,
        profile: &pprof::Profile,
    ) -> anyhow::Result<Vec<NormalizedProfile>> {
        let period_type = profile
            .period_type
            .map(|vt| ValueType {
                r#type: profile.string_or_empty(vt.r#type).to_owned(),
                unit: profile.string_or_empty(vt.unit).to_owned(),
            })
            .unwrap_or_default();

        let mut out = Vec::with_capacity(profile.sample_types.len());
        for (i, sample_type) in profile.sample_types.iter().enumerate() {
            let mut samples = Vec::new();
            for sample in &profile.samples {
                if sample.values[i] == 0 {
                    continue;
                }
                let mut labels = BTreeMap::new();
                let mut num_labels = BTreeMap::new();
                for label in &sample.labels {
                    let key = profile.string_or_empty(label.key).to_owned();
                    if label.str != 0 {
                        labels.insert(key, profile.string_or_empty(label.str).to_owned());
                    } else {
                        num_labels.insert(key, label.num);
                    }
                }
                samples.push(NormalizedSample {
                    stacktrace: sample.location_ids.clone(),
                    value: sample.values[i],
                    labels,
                    num_labels,
                });
            }
            out.push(NormalizedProfile {
                meta: ProfileMeta {
                    name: name.to_owned(),
                    sample_type: ValueType {
                        r#type: profile.string_or_empty(sample_type.r#type).to_owned(),
                        unit: profile.string_or_empty(sample_type.unit).to_owned(),
                    },
                    period_type: period_type.clone(),
                    period: profile.period,
                    timestamp: profile.time_nanos / 1_000_000,
                    duration: profile.duration_nanos,
                },
                samples,
            });
        }
        Ok(out)
    }
}

/// A raw profile with two sample types, one mapping, and three locations.
/// The third location already carries line data the way runtime-symbolized
/// profiles do; the other two are address-only.
pub fn raw_profile() -> pprof::Profile {
    pprof::Profile {
        string_table: vec![
            "".into(),                                         // 0
            "samples".into(),                                  // 1
            "count".into(),                                    // 2
            "cpu".into(),                                      // 3
            "nanoseconds".into(),                              // 4
            "/bin/app".into(),                                 // 5
            "2d6912fd3dd64542f6f6294f4bf9cb6c265b3085".into(), // 6
            "runtime.nanotime".into(),                         // 7
            "/usr/local/go/src/runtime/time_linux.go".into(),  // 8
            "thread".into(),                                   // 9
            "main".into(),                                     // 10
        ],
        sample_types: vec![
            pprof::ValueType { r#type: 1, unit: 2 },
            pprof::ValueType { r#type: 3, unit: 4 },
        ],
        mappings: vec![pprof::Mapping {
            id: 1,
            memory_start: 4194304,
            memory_limit: 4603904,
            file_offset: 0,
            filename: 5,
            build_id: 6,
            ..Default::default()
        }],
        functions: vec![pprof::Function {
            id: 1,
            name: 7,
            system_name: 7,
            filename: 8,
            start_line: 0,
        }],
        locations: vec![
            pprof::Location {
                id: 1,
                mapping_id: 1,
                address: 0x463781,
                ..Default::default()
            },
            pprof::Location {
                id: 2,
                mapping_id: 1,
                address: 0x463784,
                ..Default::default()
            },
            pprof::Location {
                id: 3,
                mapping_id: 1,
                address: 0x401220,
                lines: vec![pprof::Line {
                    function_id: 1,
                    line: 12,
                }],
                ..Default::default()
            },
        ],
        samples: vec![
            pprof::Sample {
                location_ids: vec![1, 3],
                values: vec![11, 250_000],
                labels: vec![pprof::Label {
                    key: 9,
                    str: 10,
                    ..Default::default()
                }],
            },
            pprof::Sample {
                location_ids: vec![2, 3],
                values: vec![7, 130_000],
                labels: Vec::new(),
            },
        ],
        time_nanos: 1_650_000_000_000_000_000,
        duration_nanos: 10_000_000_000,
        ..Default::default()
    }
}

// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::capabilities::{DebuginfoFetcher, SourceLine, SymbolResolver};
use datadog_metastore::{
    Location, MetadataStore, NewFunction, NewLine, NewLocation, StoreError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_BATCH_SIZE: usize = 1024;

/// Outcome of one symbolization sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Locations whose line sequence was written back this sweep.
    pub resolved: usize,
    /// Locations still without line data; eligible for the next sweep.
    pub unsymbolized: usize,
    /// Per-build-id failures; the rest of the sweep proceeded.
    pub group_errors: Vec<GroupError>,
}

#[derive(Debug)]
pub struct GroupError {
    pub build_id: String,
    pub error: anyhow::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolves unsymbolized locations in build-id groups and writes the
/// resulting line sequences back into the metastore. Sweeps are
/// idempotent: the unsymbolized set is recomputed from persisted state
/// every time, and locations that fail to resolve simply stay eligible.
pub struct Symbolizer {
    metastore: Arc<dyn MetadataStore>,
    debuginfo: Arc<dyn DebuginfoFetcher>,
    resolver: Arc<dyn SymbolResolver>,
    batch_size: usize,
}

impl Symbolizer {
    pub fn new(
        metastore: Arc<dyn MetadataStore>,
        debuginfo: Arc<dyn DebuginfoFetcher>,
        resolver: Arc<dyn SymbolResolver>,
    ) -> Self {
        Self {
            metastore,
            debuginfo,
            resolver,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Caps how many addresses go into a single resolver call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn run_sweep(&self) -> Result<SweepReport, SweepError> {
        let locations = self.metastore.unsymbolized_locations()?;
        let mut report = SweepReport::default();

        let mut groups: BTreeMap<String, Vec<Location>> = BTreeMap::new();
        for location in locations {
            match location.mapping.as_ref().map(|m| m.build_id.as_str()) {
                Some(build_id) if !build_id.is_empty() => {
                    groups.entry(build_id.to_owned()).or_default().push(location);
                }
                // No mapping or no build id: nothing to resolve against.
                _ => report.unsymbolized += 1,
            }
        }

        for (build_id, group) in groups {
            match self.symbolize_group(&build_id, &group).await {
                Ok(resolved) => {
                    report.resolved += resolved;
                    report.unsymbolized += group.len() - resolved;
                }
                Err(error) => {
                    warn!(build_id = %build_id, error = %error, "skipping symbolization group");
                    report.unsymbolized += group.len();
                    report.group_errors.push(GroupError { build_id, error });
                }
            }
        }

        Ok(report)
    }

    async fn symbolize_group(
        &self,
        build_id: &str,
        group: &[Location],
    ) -> anyhow::Result<usize> {
        if self.debuginfo.fetch(build_id).await?.is_none() {
            anyhow::bail!("debug info unavailable");
        }

        let addresses: Vec<u64> = group.iter().map(Location::normalized_address).collect();
        let mut lines_by_address: HashMap<u64, Vec<SourceLine>> = HashMap::new();
        for chunk in addresses.chunks(self.batch_size) {
            lines_by_address.extend(self.resolver.resolve(build_id, chunk).await?);
        }

        let mut resolved = 0;
        for location in group {
            let lines = match lines_by_address.get(&location.normalized_address()) {
                Some(lines) if !lines.is_empty() => lines,
                // Stripped or incomplete debug info: stays unsymbolized,
                // retried on the next sweep.
                _ => continue,
            };

            match self.write_back(location, lines) {
                Ok(()) => resolved += 1,
                Err(err) if err.is_not_found() => {
                    warn!(
                        location_id = location.id.to_raw_id(),
                        error = %err,
                        "skipping vanished location"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!(
            build_id = %build_id,
            total = group.len(),
            resolved,
            "symbolized group"
        );
        Ok(resolved)
    }

    /// Rewrites one location with its resolved line sequence, innermost
    /// frame first, leaving id, address, mapping, and fold flag untouched.
    fn write_back(&self, location: &Location, lines: &[SourceLine]) -> Result<(), StoreError> {
        let mut new_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let function = self.metastore.get_or_create_function(NewFunction {
                name: line.function.name.clone(),
                system_name: line.function.system_name.clone(),
                filename: line.function.filename.clone(),
                start_line: line.function.start_line,
            })?;
            new_lines.push(NewLine {
                function_id: function.id,
                line: line.line,
            });
        }

        self.metastore.update_location(
            location.id,
            NewLocation {
                address: location.address,
                is_folded: location.is_folded,
                mapping_id: location.mapping.as_ref().map(|m| m.id),
                lines: new_lines,
            },
        )
    }
}

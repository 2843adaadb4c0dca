// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::collections::HashMap;

/// The object-storage capability holding debug-information binaries.
#[async_trait]
pub trait DebuginfoFetcher: Send + Sync {
    /// Fetches the debug binary for a build id; `None` when the store has
    /// never seen it.
    async fn fetch(&self, build_id: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// A function as reported by symbol resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceFunction {
    pub name: String,
    pub system_name: String,
    pub filename: String,
    pub start_line: i64,
}

/// One resolved source line. An address resolves to several of these when
/// the compiler recorded inlining.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
    pub line: i64,
    pub function: SourceFunction,
}

/// The low-level symbol-resolution capability (DWARF, symbol tables, ...)
/// hidden behind a build-id + address interface.
#[async_trait]
pub trait SymbolResolver: Send + Sync {
    /// Resolves normalized addresses within the binary identified by
    /// `build_id`. Each resolved address maps to its line list, innermost
    /// (deepest inlined) frame first; addresses missing from the result
    /// could not be resolved.
    async fn resolve(
        &self,
        build_id: &str,
        addresses: &[u64],
    ) -> anyhow::Result<HashMap<u64, Vec<SourceLine>>>;
}

// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingestion of raw pprof profiles: label handling, structural validation,
//! metadata resolution against the metastore, and conversion into sorted
//! row buffers committed through the external table capability.

mod buffer;
mod error;
mod ingester;
mod labels;
mod normalizer;
mod validate;

pub use buffer::*;
pub use error::*;
pub use ingester::*;
pub use labels::*;
pub use normalizer::*;
pub use validate::*;

// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sweep-based symbolization: resolves the raw addresses of unsymbolized
//! locations into function/line information and writes it back into the
//! metastore without disturbing location identity.

mod capabilities;
mod symbolizer;

pub use capabilities::*;
pub use symbolizer::*;

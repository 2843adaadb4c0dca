// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Content-addressed storage for profile metadata: binary mappings,
//! functions, source lines, and stack-frame locations.
//!
//! Every entity kind has a dedup key derived purely from its semantic
//! attributes, and a store-assigned surrogate id used for all cross-entity
//! references. Mappings and functions are immutable once created. Locations
//! start out with an empty line sequence and are rewritten in place by the
//! symbolizer once their address resolves; their surrogate id never changes
//! across that transition.

mod key;
mod memory;
mod model;
mod store;

pub use key::*;
pub use memory::*;
pub use model::*;
pub use store::*;

// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire types for the pprof profile graph, plus decoding of raw profile
//! submissions. Collectors commonly gzip the serialized message, so
//! [`decode_raw_profile`] accepts both compressed and uncompressed payloads.

mod proto;

pub use proto::*;

use prost::Message;
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decompress profile: {0}")]
    Decompress(#[from] std::io::Error),
    #[error("failed to decode profile: {0}")]
    Decode(#[from] prost::DecodeError),
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decodes a raw profile submission, inflating it first when the payload
/// carries the gzip magic header.
pub fn decode_raw_profile(bytes: &[u8]) -> Result<Profile, DecodeError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut buf = Vec::new();
        decoder.read_to_end(&mut buf)?;
        Ok(Profile::decode(buf.as_slice())?)
    } else {
        Ok(Profile::decode(bytes)?)
    }
}

impl Profile {
    /// Looks up a string table entry by the indices the wire format uses.
    /// Returns None for negative or out-of-range indices.
    pub fn string_at(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.string_table.get(index))
            .map(String::as_str)
    }

    /// Like [`Profile::string_at`], but maps missing entries to the empty
    /// string, which is how the wire format spells "unset".
    pub fn string_or_empty(&self, index: i64) -> &str {
        self.string_at(index).unwrap_or("")
    }
}

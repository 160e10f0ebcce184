// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Textual app ids: public keys in Sandstorm's base32 alphabet.

use data_encoding::{Encoding, Specification};
use once_cell::sync::Lazy;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./app_id_test.rs"]
mod app_id_test;

/// Digits and lowercase letters, skipping the easily confused b, i, l and o.
const ALPHABET: &str = "0123456789acdefghjkmnpqrstuvwxyz";

static APP_ID_ENCODING: Lazy<Encoding> = Lazy::new(|| {
    let mut spec = Specification::new();
    spec.symbols.push_str(ALPHABET);
    spec.encoding()
        .expect("app id alphabet is a valid base32 specification")
});

/// Render a public key as an app id.
pub fn encode(public_key: &[u8]) -> String {
    APP_ID_ENCODING.encode(public_key)
}

/// Parse an app id back into public key bytes.
pub fn decode(app_id: &str) -> Result<Vec<u8>> {
    APP_ID_ENCODING
        .decode(app_id.trim().as_bytes())
        .map_err(|_| Error::InvalidAppId(app_id.to_string()))
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Package signatures.
//!
//! The archive bytes are hashed with SHA-512 and the digest is signed with
//! the app's Ed25519 key. The signature field holds the signed message in
//! NaCl's combined form: the 64 byte signature followed by the digest.

use prost::Message;
use ring::signature::{UnparsedPublicKey, ED25519};
use sha2::{Digest, Sha512};

use crate::{Error, KeyRecord, Result};

#[cfg(test)]
#[path = "./sign_test.rs"]
mod sign_test;

/// Length of a raw Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Length of a SHA-512 digest.
pub const DIGEST_LEN: usize = 64;

/// Signature record stored ahead of the archive in a package.
#[derive(Clone, PartialEq, Message)]
pub struct Signature {
    #[prost(bytes, tag = "1")]
    pub public_key: Vec<u8>,

    #[prost(bytes, tag = "2")]
    pub signature: Vec<u8>,
}

/// SHA-512 of the archive bytes.
pub fn archive_digest(archive_bytes: &[u8]) -> [u8; DIGEST_LEN] {
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&Sha512::digest(archive_bytes));
    digest
}

/// Sign archive bytes with `key`.
pub fn sign(key: &KeyRecord, archive_bytes: &[u8]) -> Result<Signature> {
    let pair = key.key_pair()?;
    let digest = archive_digest(archive_bytes);
    let raw = pair.sign(&digest);

    let mut signature = Vec::with_capacity(SIGNATURE_LEN + DIGEST_LEN);
    signature.extend_from_slice(raw.as_ref());
    signature.extend_from_slice(&digest);

    tracing::debug!(app_id = %key.app_id(), "signed archive");
    Ok(Signature {
        public_key: key.public_key.clone(),
        signature,
    })
}

/// Check that `signature` was made by its embedded key over exactly
/// these archive bytes.
pub fn verify(signature: &Signature, archive_bytes: &[u8]) -> Result<()> {
    if signature.signature.len() != SIGNATURE_LEN + DIGEST_LEN {
        return Err(Error::BadSignature(format!(
            "expected {} signature bytes, got {}",
            SIGNATURE_LEN + DIGEST_LEN,
            signature.signature.len()
        )));
    }
    let (raw, signed_digest) = signature.signature.split_at(SIGNATURE_LEN);

    UnparsedPublicKey::new(&ED25519, &signature.public_key)
        .verify(signed_digest, raw)
        .map_err(|_| Error::BadSignature("signature does not verify".to_string()))?;

    if signed_digest != archive_digest(archive_bytes).as_slice() {
        return Err(Error::BadSignature(
            "archive does not match signed digest".to_string(),
        ));
    }
    Ok(())
}

impl Signature {
    /// Encode with a length prefix, as stored in package files.
    pub fn to_framed_bytes(&self) -> Vec<u8> {
        self.encode_length_delimited_to_vec()
    }
}

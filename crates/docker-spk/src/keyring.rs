// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! App signing keys and the keyring file that stores them.

use std::io::Write;
use std::path::{Path, PathBuf};

use prost::Message;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};

use crate::{app_id, Error, Result, KEYRING_FILENAME};

#[cfg(test)]
#[path = "./keyring_test.rs"]
mod keyring_test;

/// Length of an Ed25519 seed.
pub const SEED_LEN: usize = 32;

/// Length of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// An Ed25519 keypair as stored in the keyring.
///
/// The private key is kept in the 64 byte `seed || public key` form.
/// `Debug` shows only the app id.
#[derive(Clone, PartialEq, Message)]
#[prost(skip_debug)]
pub struct KeyRecord {
    #[prost(bytes, tag = "1")]
    pub public_key: Vec<u8>,

    #[prost(bytes, tag = "2")]
    pub private_key: Vec<u8>,
}

impl KeyRecord {
    /// Generate a fresh keypair from the system random source.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; SEED_LEN];
        SystemRandom::new()
            .fill(&mut seed)
            .map_err(|_| Error::InvalidKey("failed to gather randomness".to_string()))?;
        Self::from_seed(&seed)
    }

    /// Derive a keypair from a 32 byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let pair = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|err| Error::InvalidKey(err.to_string()))?;
        let public_key = pair.public_key().as_ref().to_vec();
        let mut private_key = Vec::with_capacity(SEED_LEN + PUBLIC_KEY_LEN);
        private_key.extend_from_slice(seed);
        private_key.extend_from_slice(&public_key);
        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// The app id corresponding to this key.
    pub fn app_id(&self) -> String {
        app_id::encode(&self.public_key)
    }

    /// Rebuild the signing keypair, checking the halves agree.
    pub(crate) fn key_pair(&self) -> Result<Ed25519KeyPair> {
        if self.private_key.len() != SEED_LEN + PUBLIC_KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "private key must be {} bytes, got {}",
                SEED_LEN + PUBLIC_KEY_LEN,
                self.private_key.len()
            )));
        }
        let (seed, embedded_public) = self.private_key.split_at(SEED_LEN);
        if embedded_public != self.public_key.as_slice() {
            return Err(Error::InvalidKey(
                "private key does not belong to public key".to_string(),
            ));
        }
        Ed25519KeyPair::from_seed_and_public_key(seed, &self.public_key)
            .map_err(|err| Error::InvalidKey(err.to_string()))
    }
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("app_id", &self.app_id())
            .finish_non_exhaustive()
    }
}

/// The ordered set of keys available for signing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keyring {
    keys: Vec<KeyRecord>,
}

impl Keyring {
    /// Location of the keyring in the user's home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(KEYRING_FILENAME))
    }

    /// Load every record from a keyring file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|error| Error::ReadFailed {
            path: path.to_owned(),
            error,
        })?;
        let keyring = Self::decode(&bytes).map_err(|error| Error::InvalidKeyring {
            path: path.to_owned(),
            error,
        })?;
        tracing::debug!(path = %path.display(), keys = keyring.len(), "loaded keyring");
        Ok(keyring)
    }

    /// Decode length-delimited records until the input is exhausted.
    pub fn decode(mut bytes: &[u8]) -> std::result::Result<Self, prost::DecodeError> {
        let mut keys = Vec::new();
        while !bytes.is_empty() {
            keys.push(KeyRecord::decode_length_delimited(&mut bytes)?);
        }
        Ok(Self { keys })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for key in &self.keys {
            out.extend(key.encode_length_delimited_to_vec());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn push(&mut self, key: KeyRecord) {
        self.keys.push(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.iter()
    }

    /// Find the key whose public half equals `public_key`.
    pub fn get_key(&self, public_key: &[u8]) -> Result<&KeyRecord> {
        self.keys
            .iter()
            .find(|key| key.public_key == public_key)
            .ok_or_else(|| Error::KeyNotFound(app_id::encode(public_key)))
    }

    /// Append one record to a keyring file, creating it if needed.
    pub fn append_to_file(path: &Path, key: &KeyRecord) -> Result<()> {
        let write_failed = |error| Error::WriteFailed {
            path: path.to_owned(),
            error,
        };

        let mut options = std::fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(write_failed)?;
        file.write_all(&key.encode_length_delimited_to_vec())
            .map_err(write_failed)?;
        file.sync_all().map_err(write_failed)?;
        tracing::info!(path = %path.display(), app_id = %key.app_id(), "added key to keyring");
        Ok(())
    }
}

impl FromIterator<KeyRecord> for Keyring {
    fn from_iter<I: IntoIterator<Item = KeyRecord>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use md5::{Digest, Md5};

/// Symmetric-key store consulted for request MACs and response
/// authentication.  The responder never sees key material.
pub trait KeyStore {
    fn is_trusted(&self, keyid: u32) -> bool;

    /// Verify a trailing MAC (key id word + digest) over `message`.
    fn verify_mac(&self, keyid: u32, message: &[u8], mac: &[u8]) -> bool;

    /// Compute the on-wire MAC for `message`: big-endian key id word
    /// followed by the digest.  `None` for unknown keys.
    fn compute_mac(&self, keyid: u32, message: &[u8]) -> Option<Vec<u8>>;
}

/// MD5 keyed-digest key store: digest = MD5(secret ‖ message).
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: HashMap<u32, Vec<u8>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyid: u32, secret: impl Into<Vec<u8>>) {
        self.keys.insert(keyid, secret.into());
    }

    fn digest(&self, keyid: u32, message: &[u8]) -> Option<[u8; 16]> {
        let secret = self.keys.get(&keyid)?;
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(message);
        Some(hasher.finalize().into())
    }
}

impl KeyStore for InMemoryKeyStore {
    fn is_trusted(&self, keyid: u32) -> bool {
        self.keys.contains_key(&keyid)
    }

    fn verify_mac(&self, keyid: u32, message: &[u8], mac: &[u8]) -> bool {
        if mac.len() < 4 {
            return false;
        }
        let Some(digest) = self.digest(keyid, message) else {
            return false;
        };
        mac[4..] == digest
    }

    fn compute_mac(&self, keyid: u32, message: &[u8]) -> Option<Vec<u8>> {
        let digest = self.digest(keyid, message)?;
        let mut mac = Vec::with_capacity(4 + digest.len());
        mac.extend_from_slice(&keyid.to_be_bytes());
        mac.extend_from_slice(&digest);
        Some(mac)
    }
}

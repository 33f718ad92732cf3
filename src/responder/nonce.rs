// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Client-bound, time-bound nonces gating the expensive MRU
//! responses.
//!
//! A nonce is `TS_I ‖ TS_F ‖ HASH32` in 24 hex digits, where the
//! timestamp halves are the server receive time of the request that
//! produced it and `HASH32` is the leading 32 bits of
//! `MD5(salt ‖ TS_I ‖ TS_F ‖ addr ‖ port ‖ salt)` under a process-wide
//! salt rotated at least hourly.

use std::net::{IpAddr, SocketAddr};

use md5::{Digest, Md5};

use crate::{daemon::clock::Noise, models::lfp::LfpTimestamp};

/// Seconds a nonce stays valid.
pub const NONCE_TIMEOUT: u32 = 16;

/// Salt lifetime in seconds.
const SALT_MAX_AGE: u64 = 3600;

#[derive(Debug)]
pub struct NonceService {
    salt: [u32; 4],
    last_salt_update: u64,
    timeout: u32,
}

impl NonceService {
    pub fn new(timeout: u32) -> Self {
        Self {
            salt: [0; 4],
            last_salt_update: 0,
            timeout,
        }
    }

    fn refresh_salt(&mut self, uptime: u64, noise: &mut dyn Noise) {
        while self.salt[0] == 0
            || uptime.saturating_sub(self.last_salt_update) >= SALT_MAX_AGE
        {
            for word in &mut self.salt {
                *word = noise.next_u32();
            }
            self.last_salt_update = uptime;
        }
    }

    fn derive(&self, addr: &SocketAddr, ts_i: u32, ts_f: u32) -> u32 {
        let mut hasher = Md5::new();
        for word in self.salt {
            hasher.update(word.to_be_bytes());
        }
        hasher.update(ts_i.to_be_bytes());
        hasher.update(ts_f.to_be_bytes());
        match addr.ip() {
            IpAddr::V4(ip) => hasher.update(ip.octets()),
            IpAddr::V6(ip) => hasher.update(ip.octets()),
        }
        hasher.update(addr.port().to_be_bytes());
        for word in self.salt {
            hasher.update(word.to_be_bytes());
        }
        let digest = hasher.finalize();
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Issue a nonce bound to `addr` and the receive timestamp of the
    /// request being answered.
    pub fn issue(
        &mut self,
        addr: &SocketAddr,
        recv_time: LfpTimestamp,
        uptime: u64,
        noise: &mut dyn Noise,
    ) -> String {
        self.refresh_salt(uptime, noise);
        let derived = self.derive(addr, recv_time.seconds(), recv_time.fraction());
        format!(
            "{:08x}{:08x}{:08x}",
            recv_time.seconds(),
            recv_time.fraction(),
            derived
        )
    }

    /// Check a client-supplied nonce: the hash must match under the
    /// current salt and the embedded timestamp must be within the
    /// validity window of `now`.
    pub fn validate(
        &mut self,
        nonce: &str,
        addr: &SocketAddr,
        now: LfpTimestamp,
        uptime: u64,
        noise: &mut dyn Noise,
    ) -> bool {
        if nonce.len() != 24 {
            return false;
        }
        let (Ok(ts_i), Ok(ts_f), Ok(supposed)) = (
            u32::from_str_radix(&nonce[0..8], 16),
            u32::from_str_radix(&nonce[8..16], 16),
            u32::from_str_radix(&nonce[16..24], 16),
        ) else {
            return false;
        };

        self.refresh_salt(uptime, noise);
        let derived = self.derive(addr, ts_i, ts_f);
        let age = now.wrapping_sub(LfpTimestamp::new(ts_i, ts_f));
        supposed == derived && age.seconds() < self.timeout
    }
}

impl Default for NonceService {
    fn default() -> Self {
        Self::new(NONCE_TIMEOUT)
    }
}

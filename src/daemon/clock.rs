// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::RngExt;

use crate::models::lfp::LfpTimestamp;

/// Time source for receive timestamps, nonce windows and rate limits.
pub trait Clock {
    /// Current time as an NTP fixed-point timestamp.
    fn now(&self) -> LfpTimestamp;

    /// Monotonic whole seconds since daemon start.
    fn uptime(&self) -> u64;
}

/// CSPRNG draw used for nonce salts, response-order permutations and
/// fingerprint tags.
pub trait Noise {
    fn next_u32(&mut self) -> u32;
}

/// Wall-clock + monotonic implementation for the daemon binary.
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> LfpTimestamp {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let frac = ((unix.subsec_nanos() as u64) << 32) / 1_000_000_000;
        LfpTimestamp::from_unix(unix.as_secs(), frac as u32)
    }

    fn uptime(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Operating-system randomness.
#[derive(Debug, Default)]
pub struct OsNoise;

impl Noise for OsNoise {
    fn next_u32(&mut self) -> u32 {
        rand::rng().random()
    }
}

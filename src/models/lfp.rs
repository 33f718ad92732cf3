// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! 64-bit NTP fixed-point timestamps (`l_fp`): 32-bit integer seconds
//! since 1900-01-01 UTC plus a 32-bit fraction.

use core::fmt;

use anyhow::{Result, bail};

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const JAN_1970: u32 = 2_208_988_800;

/// A 32.32 fixed-point timestamp.
///
/// Stored as a single `u64` with the integer part in the high word,
/// which makes wrapping arithmetic and ordering trivial.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LfpTimestamp(u64);

impl LfpTimestamp {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self(((seconds as u64) << 32) | fraction as u64)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Integer part (seconds since 1900).
    #[inline]
    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Fractional part (units of 2^-32 s).
    #[inline]
    pub const fn fraction(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Wrapping difference, `self - earlier`.  The era wraps in 2036;
    /// callers only ever look at small deltas.
    #[inline]
    pub const fn wrapping_sub(self, earlier: Self) -> Self {
        Self(self.0.wrapping_sub(earlier.0))
    }

    /// Build from a Unix timestamp (seconds since 1970).
    #[inline]
    pub const fn from_unix(secs: u64, frac: u32) -> Self {
        Self::new((secs as u32).wrapping_add(JAN_1970), frac)
    }

    /// Parse the wire text form `0x%08x.%08x`.
    pub fn parse_hex(s: &str) -> Result<Self> {
        let rest = match s.strip_prefix("0x") {
            Some(r) => r,
            None => bail!("timestamp must start with 0x: {s:?}"),
        };
        let (i, f) = match rest.split_once('.') {
            Some(p) => p,
            None => bail!("timestamp must contain '.': {s:?}"),
        };
        if i.len() != 8 || f.len() != 8 {
            bail!("timestamp fields must be 8 hex digits: {s:?}");
        }
        let seconds = u32::from_str_radix(i, 16)?;
        let fraction = u32::from_str_radix(f, 16)?;
        Ok(Self::new(seconds, fraction))
    }
}

impl fmt::Display for LfpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}.{:08x}", self.seconds(), self.fraction())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Helpers for the two packed lead octets of every mode 6 control
//! datagram.
//!
//! ```text
//!  7   6   5   4   3   2   1   0      bit position
//! +-------+-----------+-----------+
//! |  LI   |    VN     |   MODE    |  ← first octet
//! +---+---+---+-------------------+
//! | R | M | E |   OPCODE (5 bits) |  ← second octet
//! +---+---+---+-------------------+
//! ```
//!
//! * **LI** – leap indicator copied from the system status.
//! * **VN** – protocol version; must lie in the supported range.
//! * **MODE** – always 6 (control) for traffic this crate handles.
//! * **R/M/E** – Response, More and Error flags; always clear on
//!   well-formed requests, set by the responder on the way out.

use core::fmt;
use std::convert::TryFrom;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Mask selecting the 5-bit opcode from the second header octet.
const OPCODE_MASK: u8 = 0b0001_1111;
/// Response flag: this datagram answers a request.
pub const CTL_RESPONSE: u8 = 0b1000_0000;
/// More flag: further fragments of the same response follow.
pub const CTL_MORE: u8 = 0b0100_0000;
/// Error flag: the status word carries an error code.
pub const CTL_ERROR: u8 = 0b0010_0000;

/// Mode value carried in the low 3 bits of the first octet.
pub const MODE_CONTROL: u8 = 6;
/// Newest protocol version the responder accepts.
pub const VERSION_MAX: u8 = 4;
/// Oldest (legacy) protocol version the responder accepts.
pub const VERSION_MIN: u8 = 3;

/// Control opcodes understood by the responder.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CtlOpcode {
    #[default]
    Unspec = 0,
    ReadStat = 1,
    ReadVar = 2,
    WriteVar = 3,
    ReadClock = 4,
    WriteClock = 5,
    Configure = 6,
    /* 7–9 belonged to the retired ntpdc request protocol */
    ReadMru = 10,
    ReadOrdlist = 12,
    ReqNonce = 13,
}

impl CtlOpcode {
    #[inline]
    pub fn from_u5(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Unspec,
            1 => Self::ReadStat,
            2 => Self::ReadVar,
            3 => Self::WriteVar,
            4 => Self::ReadClock,
            5 => Self::WriteClock,
            6 => Self::Configure,
            10 => Self::ReadMru,
            12 => Self::ReadOrdlist,
            13 => Self::ReqNonce,
            _ => return None,
        })
    }
}

/// Returned when the low five bits contain an unassigned opcode.
#[derive(Debug, Error)]
#[error("invalid opcode: 0x{0:02x}")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for CtlOpcode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, UnknownOpcode> {
        CtlOpcode::from_u5(byte & OPCODE_MASK).ok_or(UnknownOpcode(byte & OPCODE_MASK))
    }
}

/// Wire-safe first header octet: leap, version, mode.
/// Transparent over `u8` so it can live inside the zerocopy header.
#[repr(transparent)]
#[derive(
    Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable,
)]
pub struct RawLiVnMode(u8);

impl RawLiVnMode {
    #[inline]
    pub const fn from_raw(v: u8) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn leap(self) -> u8 {
        self.0 >> 6
    }

    #[inline]
    pub const fn version(self) -> u8 {
        (self.0 >> 3) & 0x7
    }

    #[inline]
    pub const fn mode(self) -> u8 {
        self.0 & 0x7
    }

    /// Compose the octet for an outgoing control packet.
    #[inline]
    pub const fn compose(leap: u8, version: u8, mode: u8) -> Self {
        Self(((leap & 0x3) << 6) | ((version & 0x7) << 3) | (mode & 0x7))
    }
}

impl fmt::Debug for RawLiVnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLiVnMode")
            .field("leap", &self.leap())
            .field("version", &self.version())
            .field("mode", &self.mode())
            .finish()
    }
}

/// Wire-safe second header octet: Response/More/Error flags + opcode.
#[repr(transparent)]
#[derive(
    Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable,
)]
pub struct RawRmeOp(u8);

impl RawRmeOp {
    #[inline]
    pub const fn from_raw(v: u8) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn response(self) -> bool {
        (self.0 & CTL_RESPONSE) != 0
    }

    #[inline]
    pub const fn more(self) -> bool {
        (self.0 & CTL_MORE) != 0
    }

    #[inline]
    pub const fn error(self) -> bool {
        (self.0 & CTL_ERROR) != 0
    }

    /// True when any of the R/M/E flags is lit (never legal on input).
    #[inline]
    pub const fn any_flag(self) -> bool {
        (self.0 & (CTL_RESPONSE | CTL_MORE | CTL_ERROR)) != 0
    }

    #[inline]
    pub const fn opcode_raw(self) -> u8 {
        self.0 & OPCODE_MASK
    }

    #[inline]
    pub fn opcode_known(self) -> Option<CtlOpcode> {
        CtlOpcode::from_u5(self.opcode_raw())
    }

    /// Compose a response octet: Response flag, optional More/Error,
    /// and the opcode echoed from the request.
    #[inline]
    pub const fn respond(opcode_raw: u8, more: bool, error: bool) -> Self {
        let mut v = CTL_RESPONSE | (opcode_raw & OPCODE_MASK);
        if more {
            v |= CTL_MORE;
        }
        if error {
            v |= CTL_ERROR;
        }
        Self(v)
    }
}

impl fmt::Debug for RawRmeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tmp = f.debug_struct("RawRmeOp");
        if self.response() {
            tmp.field("R", &true);
        }
        if self.more() {
            tmp.field("M", &true);
        }
        if self.error() {
            tmp.field("E", &true);
        }
        match self.opcode_known() {
            Some(op) => tmp.field("opcode", &op).finish(),
            None => tmp
                .field("opcode_raw", &format_args!("0x{:02x}", self.opcode_raw()))
                .finish(),
        }
    }
}

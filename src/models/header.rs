// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};
use zerocopy::{BigEndian, FromBytes as ZFromBytes, Immutable, IntoBytes, KnownLayout, U16};

use crate::models::opcode::{
    MODE_CONTROL, RawLiVnMode, RawRmeOp, VERSION_MAX, VERSION_MIN,
};

/// Fixed control header length in octets.
pub const CTL_HEADER_LEN: usize = 12;
/// Maximum octets in one datagram's data area.
pub const CTL_MAX_DATA_LEN: usize = 468;
/// Shortest acceptable trailing MAC: key id word + 16-octet digest.
pub const MIN_MAC_LEN: usize = 4 + 16;
/// Longest acceptable trailing MAC: key id word + 20-octet digest.
pub const MAX_MAC_LEN: usize = 4 + 20;

/// The fixed 12-byte mode 6 control header.
///
/// All multi-byte integers are big-endian; the data area (padded to a
/// 4-octet multiple) and an optional MAC follow.
#[repr(C)]
#[derive(
    Default, Debug, Clone, PartialEq, Eq, ZFromBytes, IntoBytes, KnownLayout, Immutable,
)]
pub struct CtlHeader {
    /// Byte 0: leap + version + mode.
    pub li_vn_mode: RawLiVnMode,
    /// Byte 1: Response/More/Error flags + 5-bit opcode.
    pub r_m_e_op: RawRmeOp,
    /// Bytes 2..3: sequence number, echoed into every fragment.
    pub sequence: U16<BigEndian>,
    /// Bytes 4..5: status word (error code in the high byte on errors).
    pub status: U16<BigEndian>,
    /// Bytes 6..7: association id, 0 for "system".
    pub associd: U16<BigEndian>,
    /// Bytes 8..9: offset of this fragment's data in the full payload.
    pub offset: U16<BigEndian>,
    /// Bytes 10..11: octets of data in this fragment.
    pub count: U16<BigEndian>,
}

/// Why an inbound datagram was dropped before dispatch.
///
/// Each variant maps onto one of the responder's input statistics;
/// none of them produce a reply.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("datagram shorter than the control header")]
    TooShort,
    #[error("mode {0} is not control mode")]
    NotControl(u8),
    #[error("response bit set on input")]
    ResponseOnInput,
    #[error("more bit set on input")]
    FragmentOnInput,
    #[error("error bit set on input")]
    ErrorOnInput,
    #[error("nonzero offset {0} on input")]
    NonzeroOffset(u16),
    #[error("unsupported version {0}")]
    BadVersion(u8),
    #[error("data count {count} exceeds datagram payload {have}")]
    CountOverrun { count: u16, have: usize },
    #[error("datagram length {0} not a multiple of 4")]
    Unaligned(usize),
}

impl CtlHeader {
    /// Parse and vet the header of an inbound control datagram.
    ///
    /// Rejected outright: short datagrams,
    /// non-control mode, any of R/M/E lit, a nonzero offset (only
    /// responses carry offsets), an out-of-range version, a data count
    /// larger than the actual payload, and unaligned datagrams.
    pub fn decode(datagram: &[u8]) -> Result<Self, FrameError> {
        if datagram.len() < CTL_HEADER_LEN {
            return Err(FrameError::TooShort);
        }
        let hdr = CtlHeader::read_from_bytes(&datagram[..CTL_HEADER_LEN])
            .map_err(|_| FrameError::TooShort)?;

        if hdr.li_vn_mode.mode() != MODE_CONTROL {
            return Err(FrameError::NotControl(hdr.li_vn_mode.mode()));
        }
        if hdr.r_m_e_op.response() {
            return Err(FrameError::ResponseOnInput);
        }
        if hdr.r_m_e_op.more() {
            return Err(FrameError::FragmentOnInput);
        }
        if hdr.r_m_e_op.error() {
            return Err(FrameError::ErrorOnInput);
        }
        if hdr.offset.get() != 0 {
            return Err(FrameError::NonzeroOffset(hdr.offset.get()));
        }
        let version = hdr.li_vn_mode.version();
        if !(VERSION_MIN..=VERSION_MAX).contains(&version) {
            return Err(FrameError::BadVersion(version));
        }
        if datagram.len() % 4 != 0 {
            return Err(FrameError::Unaligned(datagram.len()));
        }
        let have = datagram.len() - CTL_HEADER_LEN;
        if hdr.count.get() as usize > have {
            return Err(FrameError::CountOverrun {
                count: hdr.count.get(),
                have,
            });
        }
        Ok(hdr)
    }

    /// Serialize into the first 12 bytes of an outbound buffer.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < CTL_HEADER_LEN {
            bail!("header buffer too small: {}", buf.len());
        }
        buf[..CTL_HEADER_LEN].copy_from_slice(self.as_bytes());
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::SocketAddr;

use bitflags::bitflags;

use crate::models::{
    lfp::LfpTimestamp,
    status::{PeerStatusBits, peer_status_word},
};

/// Depth of the clock-filter shift registers.
pub const NTP_SHIFT: usize = 8;
/// Stratum value meaning "unsynchronized".
pub const STRATUM_UNSPEC: u8 = 16;
/// Largest symmetric key id rendered in decimal; larger ids print hex.
pub const NTP_MAXKEY: u32 = 65535;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct PeerFlags: u16 {
        /// Configured (not preemptible pool/ephemeral).
        const CONFIG    = 0x01;
        /// Last packet authenticated OK.
        const AUTHENTIC = 0x02;
        /// Ephemeral, may be demobilized.
        const PREEMPT   = 0x04;
        /// Driven by a local reference clock, not the network.
        const REFCLOCK  = 0x08;
        /// Broadcast/transmit-only association.
        const BCAST     = 0x10;
    }
}

/// Snapshot of one association, read by the peer-variable emitters.
///
/// Field units mirror the daemon proper: seconds for the float
/// quantities (scaled to milliseconds on output), daemon-uptime
/// seconds for the `time_*` stamps.
#[derive(Debug, Clone)]
pub struct Peer {
    pub associd: u16,
    pub srcadr: SocketAddr,
    pub dstadr: Option<SocketAddr>,
    pub hostname: Option<String>,
    pub flags: PeerFlags,
    pub leap: u8,
    pub hmode: u8,
    pub pmode: u8,
    pub stratum: u8,
    pub ppoll: u8,
    pub hpoll: u8,
    pub precision: i8,
    pub rootdelay: f64,
    pub rootdisp: f64,
    pub refid: u32,
    pub reftime: LfpTimestamp,
    pub rec: LfpTimestamp,
    pub xmt: LfpTimestamp,
    pub reach: u8,
    pub unreach: u32,
    /// Absolute uptime second of the next scheduled poll.
    pub next_poll: u64,
    pub delay: f64,
    pub offset: f64,
    pub jitter: f64,
    pub disp: f64,
    pub keyid: u32,
    pub filter_delay: [f64; NTP_SHIFT],
    pub filter_offset: [f64; NTP_SHIFT],
    pub filter_disp: [f64; NTP_SHIFT],
    pub filter_nextpt: usize,
    pub received: u64,
    pub sent: u64,
    pub flash: u16,
    pub ttl: u8,
    /// Inbound (r21) and outbound (r34) data rates, bits/s.
    pub rate_in: f64,
    pub rate_out: f64,
    /// Rate-limit headway.
    pub throttle: u32,
    pub bias: f64,
    pub time_received: u64,
    pub time_reachable: u64,
    pub badauth: u64,
    pub bogusorg: u64,
    pub oldpkt: u64,
    pub seldisp_too_large: u64,
    pub selbroken: u64,
    /// Selection status (`models::status::select`).
    pub selection: u8,
    pub num_events: u8,
    pub last_event: u8,
}

impl Peer {
    /// Minimal association used as a base by the daemon and the tests.
    pub fn new(associd: u16, srcadr: SocketAddr) -> Self {
        Self {
            associd,
            srcadr,
            dstadr: None,
            hostname: None,
            flags: PeerFlags::empty(),
            leap: 0,
            hmode: 3,
            pmode: 4,
            stratum: STRATUM_UNSPEC,
            ppoll: 6,
            hpoll: 6,
            precision: -20,
            rootdelay: 0.0,
            rootdisp: 0.0,
            refid: 0,
            reftime: LfpTimestamp::ZERO,
            rec: LfpTimestamp::ZERO,
            xmt: LfpTimestamp::ZERO,
            reach: 0,
            unreach: 0,
            next_poll: 0,
            delay: 0.0,
            offset: 0.0,
            jitter: 0.0,
            disp: 0.0,
            keyid: 0,
            filter_delay: [0.0; NTP_SHIFT],
            filter_offset: [0.0; NTP_SHIFT],
            filter_disp: [0.0; NTP_SHIFT],
            filter_nextpt: 0,
            received: 0,
            sent: 0,
            flash: 0,
            ttl: 0,
            rate_in: 0.0,
            rate_out: 0.0,
            throttle: 0,
            bias: 0.0,
            time_received: 0,
            time_reachable: 0,
            badauth: 0,
            bogusorg: 0,
            oldpkt: 0,
            seldisp_too_large: 0,
            selbroken: 0,
            selection: 0,
            num_events: 0,
            last_event: 0,
        }
    }

    #[inline]
    pub fn is_refclock(&self) -> bool {
        self.flags.contains(PeerFlags::REFCLOCK)
    }

    /// The 16-bit peer status word reported for this association.
    pub fn status_word(&self) -> u16 {
        let mut pst = PeerStatusBits::empty();
        if self.flags.contains(PeerFlags::CONFIG) {
            pst |= PeerStatusBits::CONFIG;
        }
        if self.keyid != 0 {
            pst |= PeerStatusBits::AUTHENABLE;
        }
        if self.flags.contains(PeerFlags::AUTHENTIC) {
            pst |= PeerStatusBits::AUTHENTIC;
        }
        if self.reach != 0 {
            pst |= PeerStatusBits::REACH;
        }
        if self.flags.contains(PeerFlags::BCAST) {
            pst |= PeerStatusBits::BCAST;
        }
        peer_status_word(
            pst.bits() | self.selection as u16,
            self.num_events,
            self.last_event,
        )
    }
}

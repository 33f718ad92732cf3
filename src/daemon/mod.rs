// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Collaborator seams of the responder.
//!
//! The responder owns none of the daemon state it reports on: peers,
//! system variables, the MRU list, endpoints and restrict lists all
//! belong to other subsystems and may change between requests.  These
//! traits are the narrow read (and, for two operations, write)
//! interface it consults, plus in-memory implementations used by the
//! daemon binary and the tests.

pub mod clock;
pub mod endpoint;
pub mod keys;
pub mod mru;
pub mod peer;
pub mod refclock;
pub mod restrict;
pub mod system;

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;

use crate::daemon::{
    endpoint::Endpoint,
    mru::{MruList, MruView},
    peer::Peer,
    refclock::RefclockStatus,
    restrict::{RestrictEntry, RestrictFlags},
    system::SystemVars,
};

/// Outbound datagram sink.  The responder never opens sockets.
pub trait Transport {
    fn send(
        &mut self,
        dst: SocketAddr,
        local_endpoint: Option<usize>,
        datagram: &[u8],
    ) -> Result<()>;
}

/// Captures outbound datagrams; the test harness transport.
#[derive(Debug, Default)]
pub struct CapturingTransport {
    pub sent: Vec<Vec<u8>>,
}

impl Transport for CapturingTransport {
    fn send(
        &mut self,
        _dst: SocketAddr,
        _local_endpoint: Option<usize>,
        datagram: &[u8],
    ) -> Result<()> {
        self.sent.push(datagram.to_vec());
        Ok(())
    }
}

/// Result of delegating a remote-configuration snippet.
#[derive(Debug, Clone)]
pub struct ConfigOutcome {
    pub ok_count: u32,
    pub err_count: u32,
    pub err_msg: String,
}

/// The daemon state the responder reads, plus the two narrow
/// mutations the protocol requires (restriction accounting and
/// event-counter reset on authenticated reads).
pub trait DaemonView {
    fn system(&self) -> &SystemVars;

    fn peers(&self) -> &[Peer];

    fn find_peer(&self, associd: u16) -> Option<&Peer>;

    /// The currently selected synchronization source, if any.
    fn sys_peer(&self) -> Option<&Peer>;

    /// Refclock driver status for a refclock association.
    fn refclock_status(&self, associd: u16) -> Option<RefclockStatus>;

    fn mru(&self) -> &dyn MruView;

    fn endpoints(&self) -> &[Endpoint];

    /// Endpoint index by local IP, ignoring port; `laddr=` filter.
    fn endpoint_by_ip(&self, ip: IpAddr) -> Option<usize>;

    fn restrict4(&self) -> &[RestrictEntry];

    fn restrict6(&self) -> &[RestrictEntry];

    /// Access-control bits applying to a source address.
    fn restrict_mask(&self, src: &SocketAddr) -> RestrictFlags;

    /// Count a request refused by restriction (`ss_restricted`).
    fn bump_restricted(&mut self);

    /// Reset an association's event counter after an authenticated
    /// read reported it.
    fn clear_peer_events(&mut self, associd: u16);

    /// Hand a configuration snippet to the config subsystem.
    fn configure_remotely(&mut self, src: &SocketAddr, text: &str) -> ConfigOutcome;
}

/// Self-contained daemon state for the binary and the tests.
#[derive(Debug, Default)]
pub struct InMemoryDaemon {
    pub system: SystemVars,
    pub peers: Vec<Peer>,
    pub sys_peer: Option<u16>,
    pub refclocks: Vec<(u16, RefclockStatus)>,
    pub mru: MruList,
    pub endpoints: Vec<Endpoint>,
    pub restrict4: Vec<RestrictEntry>,
    pub restrict6: Vec<RestrictEntry>,
    /// Mask applied to sources no restrict row matches.
    pub default_restrict: RestrictFlags,
    /// Snippets received through CONFIGURE, newest last.
    pub config_log: Vec<String>,
    /// Scripted CONFIGURE outcome; `None` reports success per line.
    pub config_outcome: Option<ConfigOutcome>,
}

impl InMemoryDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    fn masked_eq(ip: &IpAddr, entry: &RestrictEntry) -> bool {
        match (ip, entry.addr, entry.mask) {
            (IpAddr::V4(ip), IpAddr::V4(addr), IpAddr::V4(mask)) => {
                let m = u32::from(mask);
                (u32::from(*ip) & m) == (u32::from(addr) & m)
            },
            (IpAddr::V6(ip), IpAddr::V6(addr), IpAddr::V6(mask)) => {
                let m = u128::from(mask);
                (u128::from(*ip) & m) == (u128::from(addr) & m)
            },
            _ => false,
        }
    }
}

impl DaemonView for InMemoryDaemon {
    fn system(&self) -> &SystemVars {
        &self.system
    }

    fn peers(&self) -> &[Peer] {
        &self.peers
    }

    fn find_peer(&self, associd: u16) -> Option<&Peer> {
        self.peers.iter().find(|p| p.associd == associd)
    }

    fn sys_peer(&self) -> Option<&Peer> {
        self.sys_peer.and_then(|id| self.find_peer(id))
    }

    fn refclock_status(&self, associd: u16) -> Option<RefclockStatus> {
        self.refclocks
            .iter()
            .find(|(id, _)| *id == associd)
            .map(|(_, cs)| cs.clone())
    }

    fn mru(&self) -> &dyn MruView {
        &self.mru
    }

    fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    fn endpoint_by_ip(&self, ip: IpAddr) -> Option<usize> {
        self.endpoints.iter().position(|ep| ep.sin.ip() == ip)
    }

    fn restrict4(&self) -> &[RestrictEntry] {
        &self.restrict4
    }

    fn restrict6(&self) -> &[RestrictEntry] {
        &self.restrict6
    }

    fn restrict_mask(&self, src: &SocketAddr) -> RestrictFlags {
        let ip = src.ip();
        let list = if ip.is_ipv4() {
            &self.restrict4
        } else {
            &self.restrict6
        };
        // Rows are ordered least- to most-specific; last match wins.
        let mut mask = self.default_restrict;
        for entry in list {
            if Self::masked_eq(&ip, entry) {
                mask = entry.flags;
            }
        }
        mask
    }

    fn bump_restricted(&mut self) {
        self.system.stats.restricted += 1;
    }

    fn clear_peer_events(&mut self, associd: u16) {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.associd == associd) {
            peer.num_events = 0;
        }
    }

    fn configure_remotely(&mut self, _src: &SocketAddr, text: &str) -> ConfigOutcome {
        self.config_log.push(text.to_owned());
        match &self.config_outcome {
            Some(outcome) => outcome.clone(),
            None => ConfigOutcome {
                ok_count: text.lines().filter(|l| !l.trim().is_empty()).count() as u32,
                err_count: 0,
                err_msg: String::new(),
            },
        }
    }
}

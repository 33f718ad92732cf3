// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::SocketAddr;

/// One local listening endpoint, as reported by `ifstats`.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub ifnum: u32,
    pub sin: SocketAddr,
    /// Broadcast address when the broadcast socket is open.
    pub bcast: Option<SocketAddr>,
    /// False when packets arriving here are ignored.
    pub enabled: bool,
    pub name: String,
    pub flags: u32,
    pub last_ttl: i64,
    pub num_mcast: i64,
    pub received: i64,
    pub sent: i64,
    pub notsent: i64,
    pub peer_count: u64,
    /// Uptime second this endpoint came up.
    pub start_time: u64,
}

impl Endpoint {
    pub fn new(ifnum: u32, name: &str, sin: SocketAddr) -> Self {
        Self {
            ifnum,
            sin,
            bcast: None,
            enabled: true,
            name: name.to_owned(),
            flags: 0,
            last_ttl: 0,
            num_mcast: 0,
            received: 0,
            sent: 0,
            notsent: 0,
            peer_count: 0,
            start_time: 0,
        }
    }
}

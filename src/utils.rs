// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::{IpAddr, SocketAddr};

/// Parse an address with optional port: `10.0.0.1`, `10.0.0.1:123`,
/// `::1`, `[::1]:123`.  A missing port comes back as 0.
pub fn parse_sockaddr(s: &str) -> Option<SocketAddr> {
    if let Ok(sa) = s.parse::<SocketAddr>() {
        return Some(sa);
    }
    if let Ok(ip) = s.parse::<IpAddr>() {
        return Some(SocketAddr::new(ip, 0));
    }
    // Bracketed v6 without a port.
    let trimmed = s.strip_prefix('[')?.strip_suffix(']')?;
    trimmed.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, 0))
}

/// Parse a bare address, ignoring any port suffix.
pub fn parse_ip(s: &str) -> Option<IpAddr> {
    parse_sockaddr(s).map(|sa| sa.ip())
}

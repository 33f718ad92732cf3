// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt::Write as _, net::IpAddr};

use bitflags::bitflags;

bitflags! {
    /// Access-control bits attached to a restrict-list match.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct RestrictFlags: u16 {
        const IGNORE    = 0x0001;
        const DONTSERVE = 0x0002;
        const DONTTRUST = 0x0004;
        const VERSION   = 0x0008;
        const NOPEER    = 0x0010;
        const LIMITED   = 0x0020;
        const NOQUERY   = 0x0040;
        const NOMODIFY  = 0x0080;
        const KOD       = 0x0400;
        const FLAKE     = 0x1000;
        const NOMRULIST = 0x2000;
    }
}

bitflags! {
    /// Match qualifiers of a restrict entry.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct RestrictMatchFlags: u16 {
        const NTPPORT   = 0x01;
        const INTERFACE = 0x02;
    }
}

impl RestrictFlags {
    /// Space-joined lowercase flag names, reslist style.
    pub fn access_text(self) -> String {
        const NAMES: &[(RestrictFlags, &str)] = &[
            (RestrictFlags::IGNORE, "ignore"),
            (RestrictFlags::DONTSERVE, "noserve"),
            (RestrictFlags::DONTTRUST, "notrust"),
            (RestrictFlags::VERSION, "version"),
            (RestrictFlags::NOPEER, "nopeer"),
            (RestrictFlags::LIMITED, "limited"),
            (RestrictFlags::NOQUERY, "noquery"),
            (RestrictFlags::NOMODIFY, "nomodify"),
            (RestrictFlags::KOD, "kod"),
            (RestrictFlags::FLAKE, "flake"),
            (RestrictFlags::NOMRULIST, "nomrulist"),
        ];
        let mut out = String::new();
        for (flag, name) in NAMES {
            if self.contains(*flag) {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(name);
            }
        }
        out
    }
}

/// One address/mask row of a restrict list.
#[derive(Debug, Clone)]
pub struct RestrictEntry {
    pub addr: IpAddr,
    pub mask: IpAddr,
    /// Times this row matched an arriving packet.
    pub hits: u64,
    pub flags: RestrictFlags,
    pub mflags: RestrictMatchFlags,
}

impl RestrictEntry {
    /// Combined match + access text for the `flags.#` token.
    pub fn flags_text(&self) -> String {
        let mut out = String::new();
        if self.mflags.contains(RestrictMatchFlags::NTPPORT) {
            out.push_str("ntpport");
        }
        if self.mflags.contains(RestrictMatchFlags::INTERFACE) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("interface");
        }
        let access = self.flags.access_text();
        if !access.is_empty() {
            if !out.is_empty() {
                let _ = write!(out, " {access}");
            } else {
                out = access;
            }
        }
        out
    }
}

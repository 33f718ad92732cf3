// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed `tag=value` emitters layered over the fragment writer.
//! Every method appends exactly one token and marks the payload as
//! text.

use std::{
    fmt::Write as _,
    net::{IpAddr, SocketAddr},
};

use anyhow::Result;
use chrono::{TimeZone, Utc};

use crate::{
    daemon::peer::NTP_SHIFT,
    models::lfp::{JAN_1970, LfpTimestamp},
    responder::writer::ResponseWriter,
};

/// `%g`-style rendering: fixed or scientific, whichever is shorter,
/// with trailing zeros trimmed.
fn fmt_general(d: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if d == 0.0 {
        return "0".to_owned();
    }
    let exp = d.abs().log10().floor() as i32;
    let mut out = if exp < -4 || exp >= precision as i32 {
        format!("{:.*e}", precision - 1, d)
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        format!("{d:.decimals$}")
    };
    if out.contains('.') && !out.contains('e') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    out
}

impl ResponseWriter<'_> {
    fn put_token(&mut self, token: &str) -> Result<()> {
        self.put_data(token.as_bytes(), false)
    }

    /// `tag="s"`, or the bare tag when `s` is empty.  `s` must not
    /// contain a NUL.
    pub fn put_str(&mut self, tag: &str, s: &str) -> Result<()> {
        if s.is_empty() {
            self.put_token(tag)
        } else {
            self.put_token(&format!("{tag}=\"{s}\""))
        }
    }

    /// `tag=s` unquoted; `s` must contain no comma or whitespace.
    pub fn put_unq(&mut self, tag: &str, s: &str) -> Result<()> {
        if s.is_empty() {
            self.put_token(tag)
        } else {
            self.put_token(&format!("{tag}={s}"))
        }
    }

    pub fn put_int(&mut self, tag: &str, val: i64) -> Result<()> {
        self.put_token(&format!("{tag}={val}"))
    }

    pub fn put_uint(&mut self, tag: &str, val: u64) -> Result<()> {
        self.put_token(&format!("{tag}={val}"))
    }

    pub fn put_hex(&mut self, tag: &str, val: u64) -> Result<()> {
        self.put_token(&format!("{tag}=0x{val:x}"))
    }

    /// Fixed (`use_f`) or general floating form at the caller's
    /// precision.
    pub fn put_dblf(&mut self, tag: &str, use_f: bool, precision: usize, d: f64) -> Result<()> {
        if use_f {
            self.put_token(&format!("{tag}={d:.precision$}"))
        } else {
            self.put_token(&format!("{tag}={}", fmt_general(d, precision)))
        }
    }

    pub fn put_dbl(&mut self, tag: &str, d: f64) -> Result<()> {
        self.put_dblf(tag, true, 3, d)
    }

    pub fn put_dbl6(&mut self, tag: &str, d: f64) -> Result<()> {
        self.put_dblf(tag, true, 6, d)
    }

    /// `tag=0x<8hex>.<8hex>` fixed-point timestamp.
    pub fn put_ts(&mut self, tag: &str, ts: LfpTimestamp) -> Result<()> {
        self.put_token(&format!("{tag}={ts}"))
    }

    /// `tag=YYYYMMDDHHMM` for a seconds-since-1900 filestamp, UTC.
    pub fn put_fs(&mut self, tag: &str, fstamp: u32) -> Result<()> {
        let unix = i64::from(fstamp) - i64::from(JAN_1970);
        let Some(dt) = Utc.timestamp_opt(unix, 0).single() else {
            return Ok(());
        };
        self.put_token(&format!("{tag}={}", dt.format("%Y%m%d%H%M")))
    }

    /// Dotted-quad or plain v6 address, no port.
    pub fn put_adr(&mut self, tag: &str, addr: IpAddr) -> Result<()> {
        self.put_token(&format!("{tag}={addr}"))
    }

    /// Address with port: `1.2.3.4:123` / `[::1]:123`.
    pub fn put_sockaddr(&mut self, tag: &str, addr: SocketAddr) -> Result<()> {
        self.put_token(&format!("{tag}={addr}"))
    }

    /// Refid rendered as printable ASCII, `.` for the rest, truncated
    /// at the first NUL.
    pub fn put_refid(&mut self, tag: &str, refid: u32) -> Result<()> {
        let mut token = String::with_capacity(tag.len() + 5);
        token.push_str(tag);
        token.push('=');
        for b in refid.to_be_bytes() {
            if b == 0 {
                break;
            }
            let c = b as char;
            token.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });
        }
        self.put_token(&token)
    }

    /// Eight clock-filter values scaled to milliseconds, ring-ordered
    /// newest-first starting below `start`.
    pub fn put_array(&mut self, tag: &str, arr: &[f64; NTP_SHIFT], start: usize) -> Result<()> {
        let mut token = String::with_capacity(tag.len() + 1 + NTP_SHIFT * 8);
        token.push_str(tag);
        token.push('=');
        let start = start % NTP_SHIFT;
        let mut i = start;
        loop {
            if i == 0 {
                i = NTP_SHIFT;
            }
            i -= 1;
            let _ = write!(token, " {:.2}", arr[i] * 1e3);
            if i == start {
                break;
            }
        }
        self.put_token(&token)
    }
}

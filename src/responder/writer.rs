// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Response assembly: one datagram-sized buffer, text separation and
//! line wrapping above a raw copy loop, fragmentation with More-bit
//! and offset accounting, and MAC attachment on authenticated
//! responses.

use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use zerocopy::U16;

use crate::{
    daemon::{Transport, keys::KeyStore},
    models::{
        error::CtlError,
        header::{CTL_HEADER_LEN, CTL_MAX_DATA_LEN, CtlHeader},
        opcode::{RawLiVnMode, RawRmeOp},
    },
};

/// Text payload lines wrap at this width.
pub const MAXDATALINELEN: usize = 72;

/// Room for header + data + alignment padding + the longest MAC.
const BUF_LEN: usize = 512;

/// Builder for the one logical response a request may produce.
///
/// Created per request with the echoed header fields; handlers append
/// data through the formatter methods and finish with
/// [`ResponseWriter::flush`] (More clear).  Intermediate flushes are
/// taken automatically when the buffer fills.
pub struct ResponseWriter<'a> {
    dst: SocketAddr,
    endpoint: Option<usize>,
    li_vn_mode: RawLiVnMode,
    opcode_raw: u8,
    sequence: u16,
    associd: u16,
    status: u16,
    /// Key id to authenticate the response with; set only when the
    /// request itself authenticated OK under that key.
    auth_keyid: Option<u32>,
    keys: &'a dyn KeyStore,
    transport: &'a mut dyn Transport,
    buf: [u8; BUF_LEN],
    /// Data octets pending in the current fragment.
    dlen: usize,
    line_len: usize,
    /// A token was already written (controls the `", "` separator).
    sent_any: bool,
    /// Payload is text, not packed binary.
    text: bool,
    /// Sum of data lengths of the fragments already emitted.
    offset: usize,
    /// Datagrams in this response so far, counting the pending one.
    frags: u16,
    pub sent_fragments: u64,
    pub sent_responses: u64,
    pub sent_errors: u64,
}

impl<'a> ResponseWriter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dst: SocketAddr,
        endpoint: Option<usize>,
        li_vn_mode: RawLiVnMode,
        opcode_raw: u8,
        sequence: u16,
        associd: u16,
        auth_keyid: Option<u32>,
        keys: &'a dyn KeyStore,
        transport: &'a mut dyn Transport,
    ) -> Self {
        Self {
            dst,
            endpoint,
            li_vn_mode,
            opcode_raw,
            sequence,
            associd,
            status: 0,
            auth_keyid,
            keys,
            transport,
            buf: [0; BUF_LEN],
            dlen: 0,
            line_len: 0,
            sent_any: false,
            text: false,
            offset: 0,
            frags: 1,
            sent_fragments: 0,
            sent_responses: 0,
            sent_errors: 0,
        }
    }

    #[inline]
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Datagrams this response spans so far (the pending fragment
    /// included); the MRU pager bounds its page with this.
    #[inline]
    pub fn frags(&self) -> u16 {
        self.frags
    }

    #[inline]
    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[CTL_HEADER_LEN..]
    }

    /// Append payload, fragmenting when the data area fills.
    ///
    /// For text, the inter-token separator is injected here: nothing
    /// before the first token, `", "` between tokens, `",\r\n"` when
    /// the pending token would push the line past [`MAXDATALINELEN`].
    pub fn put_data(&mut self, mut dp: &[u8], bin: bool) -> Result<()> {
        let mut overhead = 0usize;
        if !bin {
            self.text = true;
            overhead = 3;
            if self.sent_any {
                // The comma is already committed when the wrap decision
                // is made, hence the +2.
                let wrap = dp.len() + self.line_len + 2 >= MAXDATALINELEN;
                let dlen = self.dlen;
                if wrap {
                    self.data_mut()[dlen..dlen + 3].copy_from_slice(b",\r\n");
                    self.dlen += 3;
                    self.line_len = 0;
                } else {
                    self.data_mut()[dlen..dlen + 2].copy_from_slice(b", ");
                    self.dlen += 2;
                    self.line_len += 2;
                }
            }
        }

        // Keep room for the trailing CRLF of the final fragment.
        while dp.len() + overhead + self.dlen > CTL_MAX_DATA_LEN {
            let room = CTL_MAX_DATA_LEN - self.dlen;
            let take = dp.len().min(room);
            let dlen = self.dlen;
            self.data_mut()[dlen..dlen + take].copy_from_slice(&dp[..take]);
            self.dlen += take;
            self.line_len += take;
            dp = &dp[take..];
            self.flush_fragment(true)?;
        }

        let dlen = self.dlen;
        self.data_mut()[dlen..dlen + dp.len()].copy_from_slice(dp);
        self.dlen += dp.len();
        self.line_len += dp.len();
        self.sent_any = true;
        Ok(())
    }

    /// Emit the final fragment of a successful response.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_fragment(false)
    }

    fn flush_fragment(&mut self, more: bool) -> Result<()> {
        // Trailing CRLF on the last fragment of a text payload.
        if !more && self.text && self.dlen + 2 < CTL_MAX_DATA_LEN {
            let dlen = self.dlen;
            self.data_mut()[dlen..dlen + 2].copy_from_slice(b"\r\n");
            self.dlen += 2;
        }
        let dlen = self.dlen;
        let mut sendlen = dlen + CTL_HEADER_LEN;

        // Zero the tail so padding and MAC input are deterministic.
        self.buf[sendlen..].fill(0);
        while sendlen & 0x3 != 0 {
            sendlen += 1;
        }

        let header = CtlHeader {
            li_vn_mode: self.li_vn_mode,
            r_m_e_op: RawRmeOp::respond(self.opcode_raw, more, false),
            sequence: U16::new(self.sequence),
            status: U16::new(self.status),
            associd: U16::new(self.associd),
            offset: U16::new(self.offset as u16),
            count: U16::new(dlen as u16),
        };
        header.encode_into(&mut self.buf)?;

        self.emit(sendlen)?;
        if more {
            self.sent_fragments += 1;
        } else {
            self.sent_responses += 1;
        }

        self.frags += 1;
        self.offset += dlen;
        self.dlen = 0;
        Ok(())
    }

    /// Send a header-only error response for the current request.
    ///
    /// Anything buffered but not yet flushed is discarded; once a
    /// fragment is on the wire an error can no longer be reported.
    pub fn error(&mut self, code: CtlError) -> Result<()> {
        let header = CtlHeader {
            li_vn_mode: self.li_vn_mode,
            r_m_e_op: RawRmeOp::respond(self.opcode_raw, false, true),
            sequence: U16::new(self.sequence),
            status: U16::new(code.status_word()),
            associd: U16::new(self.associd),
            offset: U16::new(0),
            count: U16::new(0),
        };
        self.buf.fill(0);
        header.encode_into(&mut self.buf)?;
        self.emit(CTL_HEADER_LEN)?;
        self.sent_errors += 1;
        Ok(())
    }

    /// Pad out for the MAC when authenticating, then hand the
    /// datagram to the transport.
    fn emit(&mut self, sendlen: usize) -> Result<()> {
        match self.auth_keyid {
            Some(keyid) => {
                // The MAC must begin on an 8-octet boundary.
                let mut totlen = sendlen;
                while totlen & 0x7 != 0 {
                    totlen += 1;
                }
                let mac = self
                    .keys
                    .compute_mac(keyid, &self.buf[..totlen])
                    .with_context(|| format!("MAC compute failed for keyid {keyid}"))?;
                if totlen + mac.len() > BUF_LEN {
                    bail!("authenticated response overruns the buffer");
                }
                self.buf[totlen..totlen + mac.len()].copy_from_slice(&mac);
                self.transport
                    .send(self.dst, self.endpoint, &self.buf[..totlen + mac.len()])
            },
            None => self.transport.send(self.dst, self.endpoint, &self.buf[..sendlen]),
        }
    }
}

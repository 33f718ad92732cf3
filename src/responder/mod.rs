// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The mode 6 control-plane responder.
//!
//! One inbound datagram drives one [`Responder::process`] call, which
//! emits zero or more outbound datagrams through the transport before
//! returning.  The responder owns only protocol state that must
//! outlive a request: statistics, the nonce salt, the MRU paging
//! countdown, user-set system variables and the per-source rate-limit
//! table.  Everything else is a collaborator.

pub mod formatter;
pub mod nonce;
pub mod parser;
pub mod registry;
pub mod vars;
pub mod writer;

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    daemon::{
        DaemonView, Transport,
        clock::{Clock, Noise},
        keys::KeyStore,
        restrict::RestrictFlags,
    },
    handlers,
    models::{
        error::CtlError,
        header::{CTL_HEADER_LEN, CtlHeader, FrameError, MAX_MAC_LEN, MIN_MAC_LEN},
        lfp::LfpTimestamp,
        opcode::{CtlOpcode, MODE_CONTROL, RawLiVnMode},
        status::sys_status_word,
    },
    responder::{nonce::NonceService, registry::ExtVarList, writer::ResponseWriter},
};

/// Seconds between repeats of the oversize-value warning per source.
const QUIET_INTERVAL: u64 = 300;

/// Request/response statistics, readable for monitoring and cleared
/// as a block.
#[derive(Debug, Default, Clone)]
pub struct CtlStats {
    /// Uptime second of the last reset.
    pub ctltimereset: u64,
    pub numctlreq: u64,
    pub numctlbadpkts: u64,
    pub numctlresponses: u64,
    pub numctlfrags: u64,
    pub numctlerrors: u64,
    pub numctltooshort: u64,
    pub numctlinputresp: u64,
    pub numctlinputfrag: u64,
    pub numctlinputerr: u64,
    pub numctlbadoffset: u64,
    pub numctlbadversion: u64,
    pub numctldatatooshort: u64,
    pub numctlbadop: u64,
}

impl CtlStats {
    pub fn clear(&mut self, uptime: u64) {
        *self = Self {
            ctltimereset: uptime,
            ..Self::default()
        };
    }
}

/// One inbound control datagram, as delivered by the transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub src: SocketAddr,
    /// Index of the local endpoint the datagram arrived on.
    pub endpoint: Option<usize>,
    pub payload: Bytes,
    pub recv_time: LfpTimestamp,
}

/// Decoded request state handed to the opcode handlers.
pub struct RequestCtx<'a> {
    pub src: SocketAddr,
    pub endpoint: Option<usize>,
    pub recv_time: LfpTimestamp,
    pub version: u8,
    pub opcode_raw: u8,
    pub opcode: Option<CtlOpcode>,
    pub sequence: u16,
    pub associd: u16,
    /// The request data area (exactly `count` octets).
    pub data: &'a [u8],
    /// The request carried a MAC that verified under `keyid`.
    pub authokay: bool,
    pub keyid: u32,
    pub restrict_mask: RestrictFlags,
}

/// Long-lived responder state.
pub struct Responder {
    pub stats: CtlStats,
    pub(crate) nonce: NonceService,
    pub(crate) ext_sys: ExtVarList,
    /// MRU pager position countdown; survives across pages.
    pub(crate) mru_countdown: u64,
    /// Key id WRITEVAR/CONFIGURE requests must authenticate with.
    ctl_auth_keyid: u32,
    sys_last_event: u8,
    sys_num_events: u8,
    quiet_until: DashMap<IpAddr, u64>,
}

impl Responder {
    pub fn new(ctl_auth_keyid: u32, nonce_timeout: u32) -> Self {
        Self {
            stats: CtlStats::default(),
            nonce: NonceService::new(nonce_timeout),
            ext_sys: ExtVarList::new(),
            mru_countdown: 0,
            ctl_auth_keyid,
            sys_last_event: 0,
            sys_num_events: 0,
            quiet_until: DashMap::new(),
        }
    }

    /// User-set system variables (`name=value`).
    pub fn ext_sys(&self) -> &ExtVarList {
        &self.ext_sys
    }

    /// Install or replace a user-defined system variable.
    pub fn set_sys_var(&mut self, name_eq_value: &str, flags: registry::VarFlags) {
        self.ext_sys.set(name_eq_value, flags);
    }

    /// Record a reportable system event for the status word.
    pub fn note_sys_event(&mut self, event: u8) {
        if self.sys_last_event != event {
            self.sys_num_events = 0;
        }
        self.sys_last_event = event;
        self.sys_num_events = self.sys_num_events.saturating_add(1);
    }

    pub(crate) fn clear_sys_events(&mut self) {
        self.sys_num_events = 0;
    }

    /// The system status word for response headers.
    pub fn sys_status(&self, view: &dyn DaemonView) -> u16 {
        let sys = view.system();
        sys_status_word(
            sys.leap,
            sys.clock_source,
            self.sys_num_events,
            self.sys_last_event,
        )
    }

    /// Count an oversize value token and warn, at most once per
    /// source per [`QUIET_INTERVAL`].
    pub(crate) fn oversize_value(&mut self, src: &SocketAddr, uptime: u64) {
        self.stats.numctlbadpkts += 1;
        let mut quiet = self.quiet_until.entry(src.ip()).or_insert(0);
        if *quiet <= uptime {
            *quiet = uptime + QUIET_INTERVAL;
            warn!(
                source = %src,
                "possible 'ntpdx' exploit from {}#{} (possibly spoofed)",
                src.ip(),
                src.port()
            );
        }
    }

    fn drop_frame(&mut self, err: &FrameError) {
        debug!(error = %err, "invalid format in control packet");
        match err {
            FrameError::TooShort => self.stats.numctltooshort += 1,
            FrameError::NotControl(_) => self.stats.numctlbadpkts += 1,
            FrameError::ResponseOnInput => self.stats.numctlinputresp += 1,
            FrameError::FragmentOnInput => self.stats.numctlinputfrag += 1,
            FrameError::ErrorOnInput => self.stats.numctlinputerr += 1,
            FrameError::NonzeroOffset(_) => self.stats.numctlbadoffset += 1,
            FrameError::BadVersion(_) => self.stats.numctlbadversion += 1,
            FrameError::CountOverrun { .. } | FrameError::Unaligned(_) => {
                self.stats.numctldatatooshort += 1;
            },
        }
    }

    /// Handle one inbound control datagram.
    ///
    /// Framing failures are counted and dropped without a reply;
    /// protocol failures produce a header-only error response.  An
    /// `Err` return means an internal failure (MAC computation,
    /// buffer accounting) and the caller should treat it as fatal.
    pub fn process(
        &mut self,
        req: &Request,
        view: &mut dyn DaemonView,
        keys: &dyn KeyStore,
        clock: &dyn Clock,
        noise: &mut dyn Noise,
        transport: &mut dyn Transport,
    ) -> Result<()> {
        self.stats.numctlreq += 1;

        let header = match CtlHeader::decode(&req.payload) {
            Ok(h) => h,
            Err(err) => {
                self.drop_frame(&err);
                return Ok(());
            },
        };

        let req_count = header.count.get() as usize;
        let data = &req.payload[CTL_HEADER_LEN..CTL_HEADER_LEN + req_count];

        // Scan for a trailing MAC: it must start at the 8-octet
        // boundary after the padded header+data and have a plausible
        // length.
        let properlen = (CTL_HEADER_LEN + req_count + 7) & !7;
        let mut authokay = false;
        let mut keyid = 0u32;
        if req.payload.len() >= properlen {
            let maclen = req.payload.len() - properlen;
            if (MIN_MAC_LEN..=MAX_MAC_LEN).contains(&maclen) {
                let kid = u32::from_be_bytes([
                    req.payload[properlen],
                    req.payload[properlen + 1],
                    req.payload[properlen + 2],
                    req.payload[properlen + 3],
                ]);
                debug!(keyid = kid, maclen, "request wants authentication");
                if !keys.is_trusted(kid) {
                    debug!(keyid = kid, "untrusted keyid");
                } else if keys.verify_mac(
                    kid,
                    &req.payload[..properlen],
                    &req.payload[properlen..],
                ) {
                    authokay = true;
                    keyid = kid;
                } else {
                    debug!(keyid = kid, "authentication failed");
                }
            }
        }

        let ctx = RequestCtx {
            src: req.src,
            endpoint: req.endpoint,
            recv_time: req.recv_time,
            version: header.li_vn_mode.version(),
            opcode_raw: header.r_m_e_op.opcode_raw(),
            opcode: header.r_m_e_op.opcode_known(),
            sequence: header.sequence.get(),
            associd: header.associd.get(),
            data,
            authokay,
            keyid,
            restrict_mask: view.restrict_mask(&req.src),
        };

        let li_vn_mode =
            RawLiVnMode::compose(view.system().leap, ctx.version, MODE_CONTROL);
        let mut writer = ResponseWriter::new(
            ctx.src,
            ctx.endpoint,
            li_vn_mode,
            ctx.opcode_raw,
            ctx.sequence,
            ctx.associd,
            ctx.authokay.then_some(ctx.keyid),
            keys,
            transport,
        );

        let outcome = match ctx.opcode.and_then(handlers::find_handler) {
            Some(proc_entry) => {
                debug!(opcode = ?ctx.opcode, "found command handler");
                if proc_entry.requires_auth()
                    && !(ctx.authokay && ctx.keyid == self.ctl_auth_keyid)
                {
                    writer.error(CtlError::Permission)
                } else {
                    proc_entry.run(self, &ctx, &mut writer, view, clock, noise)
                }
            },
            None => {
                self.stats.numctlbadop += 1;
                writer.error(CtlError::BadOp)
            },
        };

        self.stats.numctlfrags += writer.sent_fragments;
        self.stats.numctlresponses += writer.sent_responses;
        self.stats.numctlerrors += writer.sent_errors;
        outcome
    }
}

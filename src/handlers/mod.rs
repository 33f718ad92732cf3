// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Opcode dispatch: one table row per opcode carrying its
//! authentication policy and handler.

pub mod mru;
pub mod ordlist;
pub mod read;
pub mod write;

use anyhow::Result;

use crate::{
    daemon::{
        DaemonView,
        clock::{Clock, Noise},
    },
    models::opcode::CtlOpcode,
    responder::{RequestCtx, Responder, writer::ResponseWriter},
};

type Handler = fn(
    &mut Responder,
    &RequestCtx<'_>,
    &mut ResponseWriter<'_>,
    &mut dyn DaemonView,
    &dyn Clock,
    &mut dyn Noise,
) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthPolicy {
    NoAuth,
    Auth,
}

pub struct CtlProc {
    opcode: CtlOpcode,
    policy: AuthPolicy,
    handler: Handler,
}

impl CtlProc {
    #[inline]
    pub fn requires_auth(&self) -> bool {
        self.policy == AuthPolicy::Auth
    }

    #[inline]
    pub fn run(
        &self,
        resp: &mut Responder,
        ctx: &RequestCtx<'_>,
        w: &mut ResponseWriter<'_>,
        view: &mut dyn DaemonView,
        clock: &dyn Clock,
        noise: &mut dyn Noise,
    ) -> Result<()> {
        (self.handler)(resp, ctx, w, view, clock, noise)
    }
}

static CONTROL_CODES: &[CtlProc] = &[
    CtlProc { opcode: CtlOpcode::Unspec, policy: AuthPolicy::NoAuth,
        handler: read::control_unspec },
    CtlProc { opcode: CtlOpcode::ReadStat, policy: AuthPolicy::NoAuth,
        handler: read::read_status },
    CtlProc { opcode: CtlOpcode::ReadVar, policy: AuthPolicy::NoAuth,
        handler: read::read_variables },
    CtlProc { opcode: CtlOpcode::WriteVar, policy: AuthPolicy::Auth,
        handler: write::write_variables },
    CtlProc { opcode: CtlOpcode::ReadClock, policy: AuthPolicy::NoAuth,
        handler: read::read_clockstatus },
    CtlProc { opcode: CtlOpcode::WriteClock, policy: AuthPolicy::NoAuth,
        handler: write::write_clockstatus },
    CtlProc { opcode: CtlOpcode::Configure, policy: AuthPolicy::Auth,
        handler: write::configure },
    CtlProc { opcode: CtlOpcode::ReadMru, policy: AuthPolicy::NoAuth,
        handler: mru::read_mru_list },
    CtlProc { opcode: CtlOpcode::ReadOrdlist, policy: AuthPolicy::Auth,
        handler: ordlist::read_ordlist },
    CtlProc { opcode: CtlOpcode::ReqNonce, policy: AuthPolicy::NoAuth,
        handler: req_nonce },
];

pub fn find_handler(opcode: CtlOpcode) -> Option<&'static CtlProc> {
    CONTROL_CODES.iter().find(|cc| cc.opcode == opcode)
}

/// The MRU-list prerequisite: hand the client a nonce proving it can
/// receive traffic at its claimed source address.
fn req_nonce(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    _view: &mut dyn DaemonView,
    clock: &dyn Clock,
    noise: &mut dyn Noise,
) -> Result<()> {
    let nonce = resp
        .nonce
        .issue(&ctx.src, ctx.recv_time, clock.uptime(), noise);
    w.put_unq("nonce", &nonce)?;
    w.flush()
}

/// Bit pool over CSPRNG words for the per-entry field permutations.
#[derive(Default)]
pub(crate) struct NoisePool {
    bits: u32,
    avail: u32,
}

impl NoisePool {
    /// Draw `width` bits, refilling from the CSPRNG as needed.
    pub(crate) fn draw(&mut self, width: u32, noise: &mut dyn Noise) -> u32 {
        if self.avail < width {
            self.bits = noise.next_u32();
            self.avail = 31;
        }
        let v = self.bits & ((1 << width) - 1);
        self.bits >>= width;
        self.avail -= width;
        v
    }
}

/// Emit a fingerprint token: three random lowercase letters, `.idx`,
/// and a random integer value.  Spices paged responses so clients
/// learn to ignore tags they do not recognize.  None of the real
/// subscripted tags are three letters long, so no collision test is
/// needed.
pub(crate) fn send_random_tag_value(
    w: &mut ResponseWriter<'_>,
    noise: &mut dyn Noise,
    indx: u32,
) -> Result<()> {
    let mut n = noise.next_u32();
    let mut tag = String::with_capacity(16);
    for _ in 0..3 {
        tag.push((b'a' + (n % 26) as u8) as char);
        n >>= 5;
    }
    tag.push('.');
    tag.push_str(&indx.to_string());
    w.put_uint(&tag, n.into())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Read-side handlers: UNSPEC, READSTAT, READVAR, READCLOCK.

use anyhow::Result;
use tracing::debug;

use crate::{
    daemon::{
        DaemonView,
        clock::{Clock, Noise},
        peer::Peer,
    },
    models::{error::CtlError, status::clock_status_word},
    responder::{
        RequestCtx, Responder,
        parser::{ItemParser, Token},
        registry::{Descriptor, VarFlags},
        vars::{
            CLOCK_VAR, DEF_CLOCK_VAR, DEF_PEER_VAR, DEF_SYS_VAR, EmitCtx, PEER_VAR,
            SYS_VAR, cc, cp, cs, emit_clock, emit_peer, emit_sys,
        },
        writer::ResponseWriter,
    },
};

/// Response to an unspecified opcode: no data, just the system or
/// peer status word.
pub(super) fn control_unspec(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    _clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    if ctx.associd != 0 {
        let Some(peer) = view.find_peer(ctx.associd) else {
            return w.error(CtlError::BadAssoc);
        };
        w.set_status(peer.status_word());
    } else {
        w.set_status(resp.sys_status(view));
    }
    w.flush()
}

/// READSTAT: all `(association, status)` pairs for id 0, or one
/// peer's default variables for a nonzero id.
pub(super) fn read_status(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    debug!(associd = ctx.associd, "read_status");
    if ctx.associd != 0 {
        let Some(peer) = view.find_peer(ctx.associd).cloned() else {
            return w.error(CtlError::BadAssoc);
        };
        w.set_status(peer.status_word());
        if ctx.authokay {
            view.clear_peer_events(ctx.associd);
        }
        let ectx = EmitCtx {
            view: &*view,
            now: clock.now(),
            uptime: clock.uptime(),
            ext_sys: &resp.ext_sys,
        };
        for &code in DEF_PEER_VAR {
            emit_peer(code, w, &peer, &ectx)?;
        }
        return w.flush();
    }

    w.set_status(resp.sys_status(view));
    let mut pairs = Vec::with_capacity(view.peers().len() * 4);
    for peer in view.peers() {
        pairs.extend_from_slice(&peer.associd.to_be_bytes());
        pairs.extend_from_slice(&peer.status_word().to_be_bytes());
    }
    if !pairs.is_empty() {
        w.put_data(&pairs, true)?;
    }
    w.flush()
}

/// READVAR: system variables for association 0, peer variables
/// otherwise.
pub(super) fn read_variables(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    noise: &mut dyn Noise,
) -> Result<()> {
    if ctx.associd != 0 {
        read_peervars(resp, ctx, w, view, clock, noise)
    } else {
        read_sysvars(resp, ctx, w, view, clock, noise)
    }
}

fn read_peervars(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    let Some(peer) = view.find_peer(ctx.associd).cloned() else {
        return w.error(CtlError::BadAssoc);
    };
    w.set_status(peer.status_word());
    if ctx.authokay {
        view.clear_peer_events(ctx.associd);
    }

    let mut wants = [false; cp::MAXCODE as usize + 1];
    let mut gotvar = false;
    let mut parser = ItemParser::new(ctx.data);
    loop {
        match parser.next_item(PEER_VAR) {
            Err(_) => {
                w.error(CtlError::BadFmt)?;
                resp.oversize_value(&ctx.src, clock.uptime());
                return Ok(());
            },
            Ok(None) => break,
            Ok(Some(Token::Var(v, _))) => {
                wants[v.code() as usize] = true;
                gotvar = true;
            },
            Ok(Some(Token::Unknown)) => return w.error(CtlError::UnknownVar),
        }
    }

    let ectx = EmitCtx {
        view: &*view,
        now: clock.now(),
        uptime: clock.uptime(),
        ext_sys: &resp.ext_sys,
    };
    if gotvar {
        for (code, wanted) in wants.iter().enumerate().skip(1) {
            if *wanted {
                emit_peer(code as u16, w, &peer, &ectx)?;
            }
        }
    } else {
        for &code in DEF_PEER_VAR {
            emit_peer(code, w, &peer, &ectx)?;
        }
    }
    w.flush()
}

fn read_sysvars(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    w.set_status(resp.sys_status(view));
    if ctx.authokay {
        resp.clear_sys_events();
    }

    let ext_base = cs::MAXCODE as usize + 1;
    let mut wants = vec![false; ext_base + resp.ext_sys.count()];
    let mut gotvar = false;
    let mut parser = ItemParser::new(ctx.data);
    loop {
        match parser.next_item(SYS_VAR) {
            Err(_) => {
                w.error(CtlError::BadFmt)?;
                resp.oversize_value(&ctx.src, clock.uptime());
                return Ok(());
            },
            Ok(None) => break,
            Ok(Some(Token::Var(v, _))) => {
                wants[v.code() as usize] = true;
                gotvar = true;
            },
            Ok(Some(Token::Unknown)) => {
                // Not a built-in; try the user-set table.
                match parser.next_item(resp.ext_sys.as_slice()) {
                    Err(_) => {
                        w.error(CtlError::BadFmt)?;
                        resp.oversize_value(&ctx.src, clock.uptime());
                        return Ok(());
                    },
                    Ok(Some(Token::Var(v, _))) => {
                        let slot = ext_base + v.code() as usize;
                        if slot >= wants.len() {
                            return w.error(CtlError::BadValue);
                        }
                        wants[slot] = true;
                        gotvar = true;
                    },
                    _ => return w.error(CtlError::UnknownVar),
                }
            },
        }
    }

    let ectx = EmitCtx {
        view: &*view,
        now: clock.now(),
        uptime: clock.uptime(),
        ext_sys: &resp.ext_sys,
    };
    if gotvar {
        for code in 1..=cs::MAXCODE {
            if wants[code as usize] {
                emit_sys(code, w, &ectx)?;
            }
        }
        for (i, var) in resp.ext_sys.as_slice().iter().enumerate() {
            if var.flags.contains(VarFlags::EOV) {
                break;
            }
            if wants[ext_base + i] {
                w.put_data(var.text.as_bytes(), false)?;
            }
        }
    } else {
        for &code in DEF_SYS_VAR {
            emit_sys(code, w, &ectx)?;
        }
        for var in resp.ext_sys.as_slice() {
            if var.flags.contains(VarFlags::EOV) {
                break;
            }
            if var.flags.contains(VarFlags::DEF) {
                w.put_data(var.text.as_bytes(), false)?;
            }
        }
    }
    w.flush()
}

/// Pick the refclock association READCLOCK addresses: the named one,
/// else the system peer if it is a refclock, else the first refclock.
fn select_clock_peer(view: &dyn DaemonView, associd: u16) -> Option<Peer> {
    if associd != 0 {
        return view.find_peer(associd).cloned();
    }
    if let Some(sp) = view.sys_peer()
        && sp.is_refclock()
    {
        return Some(sp.clone());
    }
    view.peers().iter().find(|p| p.is_refclock()).cloned()
}

pub(super) fn read_clockstatus(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    let peer = select_clock_peer(view, ctx.associd);
    let Some(peer) = peer.filter(Peer::is_refclock) else {
        return w.error(CtlError::BadAssoc);
    };
    let Some(cstat) = view.refclock_status(peer.associd) else {
        return w.error(CtlError::BadAssoc);
    };
    w.set_status(clock_status_word(cstat.last_event, cstat.current_status));

    let ext_base = cc::MAXCODE as usize + 1;
    let mut wants = vec![false; ext_base + cstat.kv_list.len()];
    let mut gotvar = false;
    let mut parser = ItemParser::new(ctx.data);
    loop {
        match parser.next_item(CLOCK_VAR) {
            Err(_) => {
                w.error(CtlError::BadFmt)?;
                resp.oversize_value(&ctx.src, clock.uptime());
                return Ok(());
            },
            Ok(None) => break,
            Ok(Some(Token::Var(v, _))) => {
                wants[v.code() as usize] = true;
                gotvar = true;
            },
            Ok(Some(Token::Unknown)) => match parser.next_item(&cstat.kv_list) {
                Err(_) => {
                    w.error(CtlError::BadFmt)?;
                    resp.oversize_value(&ctx.src, clock.uptime());
                    return Ok(());
                },
                Ok(Some(Token::Var(v, _))) => {
                    let slot = ext_base + v.code() as usize;
                    if slot >= wants.len() {
                        return w.error(CtlError::BadValue);
                    }
                    wants[slot] = true;
                    gotvar = true;
                },
                _ => return w.error(CtlError::UnknownVar),
            },
        }
    }

    let ectx = EmitCtx {
        view: &*view,
        now: clock.now(),
        uptime: clock.uptime(),
        ext_sys: &resp.ext_sys,
    };
    if gotvar {
        for code in 1..=cc::MAXCODE {
            if wants[code as usize] {
                emit_clock(code, w, &cstat, true, &ectx)?;
            }
        }
        for (i, kv) in cstat.kv_list.iter().enumerate() {
            if kv.flags.contains(VarFlags::EOV) {
                break;
            }
            if wants[ext_base + i] {
                w.put_data(kv.text.as_bytes(), false)?;
            }
        }
    } else {
        for &code in DEF_CLOCK_VAR {
            emit_clock(code, w, &cstat, false, &ectx)?;
        }
        for kv in &cstat.kv_list {
            if kv.flags.contains(VarFlags::EOV) {
                break;
            }
            if kv.flags.contains(VarFlags::DEF) {
                w.put_data(kv.text.as_bytes(), false)?;
            }
        }
    }
    w.flush()
}

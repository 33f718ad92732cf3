// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The MRU pager: incremental enumeration of the monitor list
//! without holding any reference across requests.
//!
//! Entries are retrieved oldest-first, tolerating mutation between
//! pages.  A page after the first starts from a resync anchor: the
//! client supplies the newest `last.i`/`addr.i` pairs it has, and the
//! walk resumes after the first pair whose entry still carries the
//! same last-seen timestamp.  If every anchor has been bumped to the
//! head the request fails with UNKNOWNVAR and the client retries with
//! older anchors.  A client may see an address twice across pages but
//! never a fabricated entry.

use std::{borrow::Cow, net::SocketAddr};

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::{
    daemon::{
        DaemonView,
        clock::{Clock, Noise},
        mru::MonEntry,
        restrict::RestrictFlags,
    },
    handlers::send_random_tag_value,
    models::{error::CtlError, lfp::LfpTimestamp},
    responder::{
        RequestCtx, Responder,
        parser::{ItemParser, Token},
        registry::{CtlVar, Descriptor, VarFlags},
        writer::ResponseWriter,
    },
    utils,
};

/// Most entries one response may carry.
pub const MRU_ROW_LIMIT: u32 = 256;
/// Most datagrams one response may span.
pub const MRU_FRAGS_LIMIT: u16 = 32;
/// Resync anchors accepted per request.
const MAX_PRIORS: usize = 16;

#[derive(Debug, Default)]
struct MruParams {
    nonce: Option<String>,
    frags: u16,
    limit: u32,
    mincount: i64,
    resall: u16,
    resany: u16,
    maxlstint: u32,
    recent: u32,
    /// Endpoint index resolved from `laddr=`; an unresolvable address
    /// leaves the filter inactive.
    lcladr: Option<usize>,
    last: [LfpTimestamp; MAX_PRIORS],
    addr: [Option<SocketAddr>; MAX_PRIORS],
    priors: usize,
}

/// The request parameter table the tokenizer resolves against.
static IN_PARMS: Lazy<Vec<CtlVar>> = Lazy::new(in_parms);

fn in_parms() -> Vec<CtlVar> {
    let mut parms: Vec<CtlVar> = [
        "nonce",
        "frags",
        "limit",
        "mincount",
        "resall",
        "resany",
        "maxlstint",
        "laddr",
        "recent",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| CtlVar {
        code: i as u16,
        flags: VarFlags::empty(),
        text: Cow::Borrowed(*name),
    })
    .collect();
    for i in 0..MAX_PRIORS {
        let base = parms.len() as u16;
        parms.push(CtlVar {
            code: base,
            flags: VarFlags::empty(),
            text: Cow::Owned(format!("last.{i}")),
        });
        parms.push(CtlVar {
            code: base + 1,
            flags: VarFlags::empty(),
            text: Cow::Owned(format!("addr.{i}")),
        });
    }
    parms.push(CtlVar::eov());
    parms
}

fn parse_hex_mask(val: &str) -> Option<u16> {
    let hex = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X"))?;
    u16::from_str_radix(hex, 16).ok()
}

/// Parse a decimal parameter into `dst`; false on malformed input.
fn set_num<T: std::str::FromStr>(dst: &mut T, val: &str) -> bool {
    match val.parse() {
        Ok(v) => {
            *dst = v;
            true
        },
        Err(_) => false,
    }
}

enum ParseOutcome {
    Params(Box<MruParams>),
    /// Malformed parameter value: no response at all.
    SilentDrop,
    /// Oversize value token: BADFMT was already sent.
    Reported,
}

fn parse_params(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &dyn DaemonView,
    uptime: u64,
) -> Result<ParseOutcome> {
    let parms = &*IN_PARMS;
    let mut p = MruParams::default();
    let mut parser = ItemParser::new(ctx.data);

    loop {
        let (var, val) = match parser.next_item(parms) {
            Err(_) => {
                w.error(CtlError::BadFmt)?;
                resp.oversize_value(&ctx.src, uptime);
                return Ok(ParseOutcome::Reported);
            },
            Ok(None) => break,
            Ok(Some(Token::Var(v, val))) => (v, val),
            // A name outside the parameter table ends the parse.
            Ok(Some(Token::Unknown)) => break,
        };
        let name = var.name();

        let ok = match name {
            "nonce" => {
                p.nonce = (!val.is_empty()).then(|| val.clone());
                true
            },
            "frags" => set_num(&mut p.frags, &val),
            "limit" => set_num(&mut p.limit, &val),
            "mincount" => {
                let ok = set_num(&mut p.mincount, &val);
                p.mincount = p.mincount.max(0);
                ok
            },
            "resall" => match parse_hex_mask(&val) {
                Some(v) => {
                    p.resall = v;
                    true
                },
                None => false,
            },
            "resany" => match parse_hex_mask(&val) {
                Some(v) => {
                    p.resany = v;
                    true
                },
                None => false,
            },
            "maxlstint" => set_num(&mut p.maxlstint, &val),
            "recent" => set_num(&mut p.recent, &val),
            "laddr" => match utils::parse_ip(&val) {
                Some(ip) => {
                    p.lcladr = view.endpoint_by_ip(ip);
                    true
                },
                None => false,
            },
            _ => match name.split_once('.') {
                Some(("last", i)) => match (i.parse::<usize>(), LfpTimestamp::parse_hex(&val)) {
                    (Ok(i), Ok(ts)) if i < MAX_PRIORS => {
                        p.last[i] = ts;
                        if p.addr[i].is_some() && i == p.priors {
                            p.priors += 1;
                        }
                        true
                    },
                    _ => false,
                },
                Some(("addr", i)) => match (i.parse::<usize>(), utils::parse_sockaddr(&val)) {
                    (Ok(i), Some(sa)) if i < MAX_PRIORS => {
                        p.addr[i] = Some(sa);
                        if p.last[i].seconds() != 0
                            && p.last[i].fraction() != 0
                            && i == p.priors
                        {
                            p.priors += 1;
                        }
                        true
                    },
                    _ => false,
                },
                _ => true, // ignore unparseable subscripted keys
            },
        };
        if !ok {
            debug!(param = name, value = %val, "invalid MRU parameter, dropping");
            return Ok(ParseOutcome::SilentDrop);
        }
    }
    Ok(ParseOutcome::Params(Box::new(p)))
}

/// Emit one MRU entry as six `tag.k=value` tokens in randomized
/// order.
fn send_mru_entry(
    w: &mut ResponseWriter<'_>,
    noise: &mut dyn Noise,
    mon: &MonEntry,
    count: u32,
) -> Result<()> {
    const FIELDS: usize = 6;
    let mut sent = [false; FIELDS];
    let mut bits = noise.next_u32();
    for _ in 0..FIELDS {
        let mut which = ((bits & 7) as usize) % FIELDS;
        bits >>= 3;
        while sent[which] {
            which = (which + 1) % FIELDS;
        }
        match which {
            0 => w.put_unq(&format!("addr.{count}"), &mon.rmtadr.to_string())?,
            1 => w.put_ts(&format!("last.{count}"), mon.last)?,
            2 => w.put_ts(&format!("first.{count}"), mon.first)?,
            3 => w.put_int(&format!("ct.{count}"), mon.count)?,
            4 => w.put_uint(&format!("mv.{count}"), mon.vn_mode.into())?,
            _ => w.put_hex(&format!("rs.{count}"), mon.flags.into())?,
        }
        sent[which] = true;
    }
    Ok(())
}

pub(super) fn read_mru_list(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    noise: &mut dyn Noise,
) -> Result<()> {
    if ctx.restrict_mask.contains(RestrictFlags::NOMRULIST) {
        w.error(CtlError::Permission)?;
        info!(source = %ctx.src, "mrulist rejected due to nomrulist restriction");
        view.bump_restricted();
        return Ok(());
    }

    let uptime = clock.uptime();
    let mut p = match parse_params(resp, ctx, w, &*view, uptime)? {
        ParseOutcome::Params(p) => p,
        ParseOutcome::SilentDrop | ParseOutcome::Reported => return Ok(()),
    };

    // No response at all until the nonce checks out; an unvalidated
    // MRU dump would be an amplification vector.
    let Some(nonce) = p.nonce.take() else {
        return Ok(());
    };
    let now = clock.now();
    if !resp.nonce.validate(&nonce, &ctx.src, now, uptime, noise) {
        return Ok(());
    }

    if (p.frags == 0 && !(p.limit > 0 && p.limit <= MRU_ROW_LIMIT))
        || p.frags > MRU_FRAGS_LIMIT
    {
        return w.error(CtlError::BadValue);
    }
    // Whichever of frags/limit was not given is unbounded.
    if p.frags != 0 && p.limit == 0 {
        p.limit = u32::MAX;
    } else if p.limit != 0 && p.frags == 0 {
        p.frags = MRU_FRAGS_LIMIT;
    }

    // Find the resync anchor among the client's newest-known entries.
    let mru = view.mru();
    let mut mon: Option<usize> = None;
    for i in 0..p.priors {
        if let Some(sa) = p.addr[i]
            && let Some(id) = mru.lookup(&sa)
            && mru.entry(id).last == p.last[i]
        {
            mon = Some(id);
            break;
        }
    }

    if p.priors > 0 {
        let Some(anchor) = mon else {
            // Every anchor was bumped; the client backs up to older
            // ones and retries.
            return w.error(CtlError::UnknownVar);
        };
        let ent = mru.entry(anchor);
        w.put_ts("last.older", ent.last)?;
        w.put_unq("addr.older", &ent.rmtadr.to_string())?;
        // Resume with the first entry the client does not have.  A
        // limit of one instead returns the anchor itself, which makes
        // single-address lookups possible.
        if p.limit > 1 {
            mon = mru.newer(anchor);
        }
    } else {
        mon = mru.oldest();
        resp.mru_countdown = mru.len() as u64;
    }

    let fresh = resp.nonce.issue(&ctx.src, ctx.recv_time, uptime, noise);
    w.put_unq("nonce", &fresh)?;

    let mut count: u32 = 0;
    let mut newest_sent: Option<LfpTimestamp> = None;
    while let Some(id) = mon {
        if w.frags() >= p.frags || count >= p.limit {
            break;
        }
        let ent = view.mru().entry(id).clone();
        mon = view.mru().newer(id);

        if ent.count < p.mincount {
            continue;
        }
        if p.resall != 0 && (p.resall & ent.flags) != p.resall {
            continue;
        }
        if p.resany != 0 && (p.resany & ent.flags) == 0 {
            continue;
        }
        if p.maxlstint > 0
            && now.seconds().wrapping_sub(ent.last.seconds()) > p.maxlstint
        {
            continue;
        }
        if let Some(lcl) = p.lcladr
            && ent.lcladr != lcl
        {
            continue;
        }
        if p.recent != 0 {
            let countdown = resp.mru_countdown;
            resp.mru_countdown = countdown.saturating_sub(1);
            if countdown > u64::from(p.recent) {
                continue;
            }
        }

        send_mru_entry(w, noise, &ent, count)?;
        if count == 0 {
            send_random_tag_value(w, noise, 0)?;
        }
        count += 1;
        newest_sent = Some(ent.last);
    }

    // Head reached: close the page explicitly so the client can
    // confirm progress.
    if mon.is_none() {
        if count > 1 {
            send_random_tag_value(w, noise, count - 1)?;
        }
        w.put_ts("now", now)?;
        if let Some(last) = newest_sent {
            w.put_ts("last.newest", last)?;
        }
    }
    w.flush()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Ordered-list handlers behind READ_ORDLIST_A: per-endpoint
//! statistics and the concatenated v4+v6 restrict lists.  Field order
//! within each entry is randomized so clients cannot grow dependent
//! on it.

use anyhow::Result;

use crate::{
    daemon::{
        DaemonView,
        clock::{Clock, Noise},
        endpoint::Endpoint,
        restrict::RestrictEntry,
    },
    handlers::{NoisePool, send_random_tag_value},
    models::error::CtlError,
    responder::{RequestCtx, Responder, writer::ResponseWriter},
};

/// Dispatch on the selector string in the request data area.
pub(super) fn read_ordlist(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    noise: &mut dyn Noise,
) -> Result<()> {
    match ctx.data {
        b"" | b"ifstats" => read_ifstats(resp, w, view, clock, noise),
        b"addr_restrictions" => read_addr_restrictions(w, view, noise),
        _ => w.error(CtlError::UnknownVar),
    }
}

/// Twelve `tag.u=value` tokens for one local endpoint, randomized.
fn send_ifstats_entry(
    w: &mut ResponseWriter<'_>,
    noise: &mut dyn Noise,
    pool: &mut NoisePool,
    ep: &Endpoint,
    ifnum: u32,
    uptime: u64,
) -> Result<()> {
    const FIELDS: usize = 12;
    let mut sent = [false; FIELDS];
    for _ in 0..FIELDS {
        let mut which = pool.draw(4, noise) as usize % FIELDS;
        while sent[which] {
            which = (which + 1) % FIELDS;
        }
        match which {
            0 => w.put_unq(&format!("addr.{ifnum}"), &ep.sin.to_string())?,
            1 => {
                let bcast = ep.bcast.map(|b| b.to_string()).unwrap_or_default();
                w.put_unq(&format!("bcast.{ifnum}"), &bcast)?
            },
            2 => w.put_int(&format!("en.{ifnum}"), i64::from(ep.enabled))?,
            3 => w.put_str(&format!("name.{ifnum}"), &ep.name)?,
            4 => w.put_hex(&format!("flags.{ifnum}"), ep.flags.into())?,
            5 => w.put_int(&format!("tl.{ifnum}"), ep.last_ttl)?,
            6 => w.put_int(&format!("mc.{ifnum}"), ep.num_mcast)?,
            7 => w.put_int(&format!("rx.{ifnum}"), ep.received)?,
            8 => w.put_int(&format!("tx.{ifnum}"), ep.sent)?,
            9 => w.put_int(&format!("txerr.{ifnum}"), ep.notsent)?,
            10 => w.put_uint(&format!("pc.{ifnum}"), ep.peer_count)?,
            _ => w.put_uint(
                &format!("up.{ifnum}"),
                uptime.saturating_sub(ep.start_time),
            )?,
        }
        sent[which] = true;
    }
    Ok(())
}

fn read_ifstats(
    resp: &mut Responder,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    noise: &mut dyn Noise,
) -> Result<()> {
    w.set_status(resp.sys_status(view));
    let uptime = clock.uptime();
    let mut pool = NoisePool::default();
    let endpoints = view.endpoints();
    let last = endpoints.len().saturating_sub(1);
    for (i, ep) in endpoints.iter().enumerate() {
        send_ifstats_entry(w, noise, &mut pool, ep, ep.ifnum, uptime)?;
        if i == 0 || i == last {
            send_random_tag_value(w, noise, ep.ifnum)?;
        }
    }
    w.flush()
}

/// Four `tag.u=value` tokens for one restrict row, randomized.
fn send_restrict_entry(
    w: &mut ResponseWriter<'_>,
    noise: &mut dyn Noise,
    pool: &mut NoisePool,
    res: &RestrictEntry,
    idx: u32,
) -> Result<()> {
    const FIELDS: usize = 4;
    let mut sent = [false; FIELDS];
    for _ in 0..FIELDS {
        let mut which = pool.draw(2, noise) as usize % FIELDS;
        while sent[which] {
            which = (which + 1) % FIELDS;
        }
        match which {
            0 => w.put_unq(&format!("addr.{idx}"), &res.addr.to_string())?,
            1 => w.put_unq(&format!("mask.{idx}"), &res.mask.to_string())?,
            2 => w.put_uint(&format!("hits.{idx}"), res.hits)?,
            _ => w.put_unq(&format!("flags.{idx}"), &res.flags_text())?,
        }
        sent[which] = true;
    }
    Ok(())
}

fn read_addr_restrictions(
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    noise: &mut dyn Noise,
) -> Result<()> {
    let mut pool = NoisePool::default();
    let total = view.restrict4().len() + view.restrict6().len();
    let last = total.saturating_sub(1);
    let mut idx = 0usize;
    for ipv6 in [false, true] {
        let list = if ipv6 { view.restrict6() } else { view.restrict4() };
        for res in list {
            send_restrict_entry(w, noise, &mut pool, res, idx as u32)?;
            if idx == 0 || idx == last {
                send_random_tag_value(w, noise, idx as u32)?;
            }
            idx += 1;
        }
    }
    w.flush()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Write-side handlers: WRITEVAR, WRITECLOCK, CONFIGURE.

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    daemon::{
        DaemonView,
        clock::{Clock, Noise},
        restrict::RestrictFlags,
    },
    models::error::CtlError,
    responder::{
        RequestCtx, Responder,
        parser::{ItemParser, Token},
        registry::{Descriptor, VarFlags},
        vars::SYS_VAR,
        writer::ResponseWriter,
    },
};

/// Room in the remote-configuration line buffer.
const REMOTE_CONFIG_LEN: usize = 512;

/// Writable bits of the one writable built-in (`leap`).
const LEAP_WRITE_MASK: i64 = 0x3;

/// WRITEVAR: store user-set variables; built-in writes validate and
/// then change nothing (historical behavior, kept observable).
pub(super) fn write_variables(
    resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    // Peer variables are never writable this way.
    if ctx.associd != 0 {
        return w.error(CtlError::Permission);
    }
    w.set_status(resp.sys_status(view));

    // Walk the items, dumping out at the first sign of trouble.
    // Extension writes already applied stay applied.
    let mut parser = ItemParser::new(ctx.data);
    loop {
        let (name, value, flags, is_ext) = match parser.next_item(SYS_VAR) {
            Err(_) => {
                w.error(CtlError::BadFmt)?;
                resp.oversize_value(&ctx.src, clock.uptime());
                return Ok(());
            },
            Ok(None) => break,
            Ok(Some(Token::Var(v, value))) => {
                (v.name().to_owned(), value, v.flags(), false)
            },
            Ok(Some(Token::Unknown)) => {
                match parser.next_item(resp.ext_sys.as_slice()) {
                    Err(_) => {
                        w.error(CtlError::BadFmt)?;
                        resp.oversize_value(&ctx.src, clock.uptime());
                        return Ok(());
                    },
                    Ok(Some(Token::Var(v, value))) => {
                        (v.name().to_owned(), value, v.flags(), true)
                    },
                    _ => return w.error(CtlError::UnknownVar),
                }
            },
        };

        if !flags.contains(VarFlags::CAN_WRITE) {
            return w.error(CtlError::Permission);
        }
        if !is_ext {
            // Missing or non-decimal values are malformed.
            let Ok(val) = value.parse::<i64>() else {
                return w.error(CtlError::BadFmt);
            };
            if val & !LEAP_WRITE_MASK != 0 {
                return w.error(CtlError::BadValue);
            }
            // The value was vetted, but the daemon no longer applies
            // leap writes; report that nothing was done.
            return w.error(CtlError::Unspec);
        }
        resp.set_sys_var(&format!("{name}={value}"), flags);
    }
    w.flush()
}

/// Clock variables cannot be written remotely.
pub(super) fn write_clockstatus(
    _resp: &mut Responder,
    _ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    _view: &mut dyn DaemonView,
    _clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    w.error(CtlError::Permission)
}

/// CONFIGURE: hand a configuration snippet to the config subsystem
/// and report its verdict as text.
pub(super) fn configure(
    _resp: &mut Responder,
    ctx: &RequestCtx<'_>,
    w: &mut ResponseWriter<'_>,
    view: &mut dyn DaemonView,
    _clock: &dyn Clock,
    _noise: &mut dyn Noise,
) -> Result<()> {
    // Reconfiguring an existing association is not supported.
    if ctx.associd != 0 {
        return w.error(CtlError::BadValue);
    }

    if ctx.restrict_mask.contains(RestrictFlags::NOMODIFY) {
        let msg = "runtime configuration prohibited by restrict ... nomodify";
        w.put_data(msg.as_bytes(), false)?;
        w.flush()?;
        info!(
            source = %ctx.src,
            "runtime config rejected due to nomodify restriction"
        );
        view.bump_restricted();
        return Ok(());
    }

    if ctx.data.len() > REMOTE_CONFIG_LEN - 2 {
        let msg = "runtime configuration failed: request too long";
        w.put_data(msg.as_bytes(), false)?;
        w.flush()?;
        info!(source = %ctx.src, "runtime config rejected: request too long");
        return Ok(());
    }

    let mut text = String::from_utf8_lossy(ctx.data).into_owned();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    info!(source = %ctx.src, config = %text.trim_end_matches('\n'), "remote config");

    let outcome = view.configure_remotely(&ctx.src, &text);
    let reply = if outcome.err_count == 0 && outcome.err_msg.is_empty() {
        "Config Succeeded".to_owned()
    } else {
        outcome.err_msg.clone()
    };
    w.put_data(reply.as_bytes(), false)?;
    w.flush()?;
    debug!(reply = %reply, "configure reply");

    if outcome.err_count > 0 {
        info!(
            source = %ctx.src,
            errors = outcome.err_count,
            "errors in remote config"
        );
    }
    Ok(())
}

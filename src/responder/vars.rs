// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The built-in variable tables.
//!
//! Each row couples the wire name and code with the function that
//! emits its `tag=value` token, so READVAR/READCLOCK loops index the
//! table instead of switching on the code.  Row order matters: the
//! request tokenizer resolves names against these slices, and each
//! table is indexed by variable code (row 0 is padding).

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Result;

use crate::{
    daemon::{
        DaemonView,
        peer::{NTP_MAXKEY, Peer, PeerFlags, STRATUM_UNSPEC},
        refclock::{ClockHaveFlags, RefclockStatus},
        system::SystemVars,
    },
    models::{header::CTL_MAX_DATA_LEN, lfp::LfpTimestamp},
    responder::{
        registry::{Descriptor, ExtVarList, RO, RW, VarFlags},
        writer::ResponseWriter,
    },
};

/// Read-only context shared by every emitter of one request.
pub struct EmitCtx<'a> {
    pub view: &'a dyn DaemonView,
    pub now: LfpTimestamp,
    pub uptime: u64,
    pub ext_sys: &'a ExtVarList,
}

impl EmitCtx<'_> {
    #[inline]
    pub fn sys(&self) -> &SystemVars {
        self.view.system()
    }
}

/// System variable codes.
pub mod cs {
    pub const LEAP: u16 = 1;
    pub const STRATUM: u16 = 2;
    pub const PRECISION: u16 = 3;
    pub const ROOTDELAY: u16 = 4;
    pub const ROOTDISPERSION: u16 = 5;
    pub const REFID: u16 = 6;
    pub const REFTIME: u16 = 7;
    pub const POLL: u16 = 8;
    pub const PEERID: u16 = 9;
    pub const OFFSET: u16 = 10;
    pub const DRIFT: u16 = 11;
    pub const JITTER: u16 = 12;
    pub const ERROR: u16 = 13;
    pub const CLOCK: u16 = 14;
    pub const PROCESSOR: u16 = 15;
    pub const SYSTEM: u16 = 16;
    pub const VERSION: u16 = 17;
    pub const STABIL: u16 = 18;
    pub const VARLIST: u16 = 19;
    pub const TAI: u16 = 20;
    pub const LEAPTAB: u16 = 21;
    pub const LEAPEND: u16 = 22;
    pub const RATE: u16 = 23;
    pub const MRU_ENABLED: u16 = 24;
    pub const MRU_DEPTH: u16 = 25;
    pub const MRU_DEEPEST: u16 = 26;
    pub const MRU_MINDEPTH: u16 = 27;
    pub const MRU_MAXAGE: u16 = 28;
    pub const MRU_MINAGE: u16 = 29;
    pub const MRU_MAXDEPTH: u16 = 30;
    pub const MRU_MEM: u16 = 31;
    pub const MRU_MAXMEM: u16 = 32;
    pub const SS_UPTIME: u16 = 33;
    pub const SS_RESET: u16 = 34;
    pub const SS_RECEIVED: u16 = 35;
    pub const SS_THISVER: u16 = 36;
    pub const SS_OLDVER: u16 = 37;
    pub const SS_BADFORMAT: u16 = 38;
    pub const SS_BADAUTH: u16 = 39;
    pub const SS_DECLINED: u16 = 40;
    pub const SS_RESTRICTED: u16 = 41;
    pub const SS_LIMITED: u16 = 42;
    pub const SS_KODSENT: u16 = 43;
    pub const SS_PROCESSED: u16 = 44;
    pub const PEERADR: u16 = 45;
    pub const PEERMODE: u16 = 46;
    pub const AUTHDELAY: u16 = 47;
    pub const AUTHKEYS: u16 = 48;
    pub const AUTHFREEK: u16 = 49;
    pub const AUTHKLOOKUPS: u16 = 50;
    pub const AUTHKNOTFOUND: u16 = 51;
    pub const AUTHKUNCACHED: u16 = 52;
    pub const AUTHKEXPIRED: u16 = 53;
    pub const AUTHENCRYPTS: u16 = 54;
    pub const AUTHDECRYPTS: u16 = 55;
    pub const AUTHRESET: u16 = 56;
    pub const K_OFFSET: u16 = 57;
    pub const K_FREQ: u16 = 58;
    pub const K_MAXERR: u16 = 59;
    pub const K_ESTERR: u16 = 60;
    pub const K_STFLAGS: u16 = 61;
    pub const K_TIMECONST: u16 = 62;
    pub const K_PRECISION: u16 = 63;
    pub const K_FREQTOL: u16 = 64;
    pub const K_PPS_FREQ: u16 = 65;
    pub const K_PPS_STABIL: u16 = 66;
    pub const K_PPS_JITTER: u16 = 67;
    pub const K_PPS_CALIBDUR: u16 = 68;
    pub const K_PPS_CALIBS: u16 = 69;
    pub const K_PPS_CALIBERRS: u16 = 70;
    pub const K_PPS_JITEXC: u16 = 71;
    pub const K_PPS_STBEXC: u16 = 72;
    pub const IOSTATS_RESET: u16 = 73;
    pub const TOTAL_RBUF: u16 = 74;
    pub const FREE_RBUF: u16 = 75;
    pub const USED_RBUF: u16 = 76;
    pub const RBUF_LOWATER: u16 = 77;
    pub const IO_DROPPED: u16 = 78;
    pub const IO_IGNORED: u16 = 79;
    pub const IO_RECEIVED: u16 = 80;
    pub const IO_SENT: u16 = 81;
    pub const IO_SENDFAILED: u16 = 82;
    pub const IO_WAKEUPS: u16 = 83;
    pub const IO_GOODWAKEUPS: u16 = 84;
    pub const TIMERSTATS_RESET: u16 = 85;
    pub const TIMER_OVERRUNS: u16 = 86;
    pub const TIMER_XMTS: u16 = 87;
    pub const FUZZ: u16 = 88;
    pub const WANDER_THRESH: u16 = 89;
    pub const MRU_EXISTS: u16 = 90;
    pub const MRU_NEW: u16 = 91;
    pub const MRU_RECYCLEOLD: u16 = 92;
    pub const MRU_RECYCLEFULL: u16 = 93;
    pub const MRU_NONE: u16 = 94;
    pub const MRU_OLDEST_AGE: u16 = 95;
    pub const LEAPSMEARINTV: u16 = 96;
    pub const LEAPSMEAROFFS: u16 = 97;
    pub const TICK: u16 = 98;
    pub const MAXCODE: u16 = TICK;
}

/// Peer variable codes.
pub mod cp {
    pub const CONFIG: u16 = 1;
    pub const AUTHENABLE: u16 = 2;
    pub const AUTHENTIC: u16 = 3;
    pub const SRCADR: u16 = 4;
    pub const SRCPORT: u16 = 5;
    pub const DSTADR: u16 = 6;
    pub const DSTPORT: u16 = 7;
    pub const LEAP: u16 = 8;
    pub const HMODE: u16 = 9;
    pub const STRATUM: u16 = 10;
    pub const PPOLL: u16 = 11;
    pub const HPOLL: u16 = 12;
    pub const PRECISION: u16 = 13;
    pub const ROOTDELAY: u16 = 14;
    pub const ROOTDISPERSION: u16 = 15;
    pub const REFID: u16 = 16;
    pub const REFTIME: u16 = 17;
    pub const ORG: u16 = 18;
    pub const REC: u16 = 19;
    pub const XMT: u16 = 20;
    pub const REACH: u16 = 21;
    pub const UNREACH: u16 = 22;
    pub const TIMER: u16 = 23;
    pub const DELAY: u16 = 24;
    pub const OFFSET: u16 = 25;
    pub const JITTER: u16 = 26;
    pub const DISPERSION: u16 = 27;
    pub const KEYID: u16 = 28;
    pub const FILTDELAY: u16 = 29;
    pub const FILTOFFSET: u16 = 30;
    pub const PMODE: u16 = 31;
    pub const RECEIVED: u16 = 32;
    pub const SENT: u16 = 33;
    pub const FILTERROR: u16 = 34;
    pub const FLASH: u16 = 35;
    pub const TTL: u16 = 36;
    pub const VARLIST: u16 = 37;
    pub const IN: u16 = 38;
    pub const OUT: u16 = 39;
    pub const RATE: u16 = 40;
    pub const BIAS: u16 = 41;
    pub const SRCHOST: u16 = 42;
    pub const TIMEREC: u16 = 43;
    pub const TIMEREACH: u16 = 44;
    pub const BADAUTH: u16 = 45;
    pub const BOGUSORG: u16 = 46;
    pub const OLDPKT: u16 = 47;
    pub const SELDISP: u16 = 48;
    pub const SELBROKEN: u16 = 49;
    pub const CANDIDATE: u16 = 50;
    pub const MAXCODE: u16 = CANDIDATE;
}

/// Clock variable codes.
pub mod cc {
    pub const NAME: u16 = 1;
    pub const TIMECODE: u16 = 2;
    pub const POLL: u16 = 3;
    pub const NOREPLY: u16 = 4;
    pub const BADFORMAT: u16 = 5;
    pub const BADDATA: u16 = 6;
    pub const FUDGETIME1: u16 = 7;
    pub const FUDGETIME2: u16 = 8;
    pub const FUDGEVAL1: u16 = 9;
    pub const FUDGEVAL2: u16 = 10;
    pub const FLAGS: u16 = 11;
    pub const DEVICE: u16 = 12;
    pub const VARLIST: u16 = 13;
    pub const MAXCODE: u16 = VARLIST;
}

type SysEmit = fn(&mut ResponseWriter<'_>, &'static str, &EmitCtx<'_>) -> Result<()>;
type PeerEmit =
    fn(&mut ResponseWriter<'_>, &'static str, &Peer, &EmitCtx<'_>) -> Result<()>;
type ClockEmit = fn(
    &mut ResponseWriter<'_>,
    &'static str,
    &RefclockStatus,
    bool,
    &EmitCtx<'_>,
) -> Result<()>;

pub struct SysVar {
    pub code: u16,
    pub flags: VarFlags,
    pub text: &'static str,
    pub emit: SysEmit,
}

pub struct PeerVar {
    pub code: u16,
    pub flags: VarFlags,
    pub text: &'static str,
    pub emit: PeerEmit,
}

pub struct ClockVar {
    pub code: u16,
    pub flags: VarFlags,
    pub text: &'static str,
    pub emit: ClockEmit,
}

impl Descriptor for SysVar {
    fn code(&self) -> u16 {
        self.code
    }

    fn flags(&self) -> VarFlags {
        self.flags
    }

    fn text(&self) -> &str {
        self.text
    }
}

impl Descriptor for PeerVar {
    fn code(&self) -> u16 {
        self.code
    }

    fn flags(&self) -> VarFlags {
        self.flags
    }

    fn text(&self) -> &str {
        self.text
    }
}

impl Descriptor for ClockVar {
    fn code(&self) -> u16 {
        self.code
    }

    fn flags(&self) -> VarFlags {
        self.flags
    }

    fn text(&self) -> &str {
        self.text
    }
}

/// Emit `tag="a,b,c"` with the list truncated to the data-area size.
fn put_varlist(w: &mut ResponseWriter<'_>, tag: &str, names: &[&str]) -> Result<()> {
    let mut buf = String::with_capacity(CTL_MAX_DATA_LEN);
    buf.push_str(tag);
    buf.push_str("=\"");
    let mut first = true;
    for name in names {
        if name.is_empty() {
            continue;
        }
        if buf.len() + name.len() + 2 >= CTL_MAX_DATA_LEN {
            break;
        }
        if !first {
            buf.push(',');
        }
        first = false;
        buf.push_str(name);
    }
    buf.push('"');
    w.put_data(buf.as_bytes(), false)
}

fn refid_is_address(stratum: u8) -> bool {
    stratum > 1 && stratum < STRATUM_UNSPEC
}

const fn pad_sys() -> SysVar {
    SysVar {
        code: 0,
        flags: VarFlags::PADDING,
        text: "",
        emit: |_, _, _| Ok(()),
    }
}

/// System variables, indexed by code.
pub static SYS_VAR: &[SysVar] = &[
    pad_sys(), /* 0 */
    SysVar { code: cs::LEAP, flags: RW, text: "leap",
        emit: |w, t, e| w.put_uint(t, e.sys().leap.into()) },
    SysVar { code: cs::STRATUM, flags: RO, text: "stratum",
        emit: |w, t, e| w.put_uint(t, e.sys().stratum.into()) },
    SysVar { code: cs::PRECISION, flags: RO, text: "precision",
        emit: |w, t, e| w.put_int(t, e.sys().precision.into()) },
    SysVar { code: cs::ROOTDELAY, flags: RO, text: "rootdelay",
        emit: |w, t, e| w.put_dbl(t, e.sys().rootdelay * 1e3) },
    SysVar { code: cs::ROOTDISPERSION, flags: RO, text: "rootdisp",
        emit: |w, t, e| w.put_dbl(t, e.sys().rootdisp * 1e3) },
    SysVar { code: cs::REFID, flags: RO, text: "refid",
        emit: |w, t, e| {
            let sys = e.sys();
            if refid_is_address(sys.stratum) {
                w.put_adr(t, IpAddr::V4(Ipv4Addr::from(sys.refid)))
            } else {
                w.put_refid(t, sys.refid)
            }
        } },
    SysVar { code: cs::REFTIME, flags: RO, text: "reftime",
        emit: |w, t, e| w.put_ts(t, e.sys().reftime) },
    SysVar { code: cs::POLL, flags: RO, text: "tc",
        emit: |w, t, e| w.put_uint(t, e.sys().poll.into()) },
    SysVar { code: cs::PEERID, flags: RO, text: "peer",
        emit: |w, t, e| {
            w.put_uint(t, e.view.sys_peer().map_or(0, |p| p.associd.into()))
        } },
    SysVar { code: cs::OFFSET, flags: RO, text: "offset",
        emit: |w, t, e| w.put_dbl6(t, e.sys().clock_offset * 1e3) },
    SysVar { code: cs::DRIFT, flags: RO, text: "frequency",
        emit: |w, t, e| w.put_dbl6(t, e.sys().drift * 1e6) },
    SysVar { code: cs::JITTER, flags: RO, text: "sys_jitter",
        emit: |w, t, e| w.put_dbl6(t, e.sys().jitter * 1e3) },
    SysVar { code: cs::ERROR, flags: RO, text: "clk_jitter",
        emit: |w, t, e| w.put_dbl6(t, e.sys().clk_jitter * 1e3) },
    SysVar { code: cs::CLOCK, flags: RO, text: "clock",
        emit: |w, t, e| w.put_ts(t, e.now) },
    SysVar { code: cs::PROCESSOR, flags: RO, text: "processor",
        emit: |w, t, e| w.put_str(t, &e.sys().processor) },
    SysVar { code: cs::SYSTEM, flags: RO, text: "system",
        emit: |w, t, e| w.put_str(t, &e.sys().system) },
    SysVar { code: cs::VERSION, flags: RO, text: "version",
        emit: |w, t, e| w.put_str(t, &e.sys().version) },
    SysVar { code: cs::STABIL, flags: RO, text: "clk_wander",
        emit: |w, t, e| w.put_dbl6(t, e.sys().clk_wander * 1e6) },
    SysVar { code: cs::VARLIST, flags: RO, text: "sys_var_list",
        emit: |w, t, e| {
            let mut names: Vec<&str> = SYS_VAR
                .iter()
                .filter(|v| !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING))
                .map(|v| v.text)
                .collect();
            names.extend(
                e.ext_sys
                    .as_slice()
                    .iter()
                    .filter(|v| {
                        !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING)
                    })
                    .map(|v| v.name()),
            );
            put_varlist(w, t, &names)
        } },
    SysVar { code: cs::TAI, flags: RO, text: "tai",
        emit: |w, t, e| {
            if e.sys().tai > 0 {
                w.put_uint(t, e.sys().tai.into())
            } else {
                Ok(())
            }
        } },
    SysVar { code: cs::LEAPTAB, flags: RO, text: "leapsec",
        emit: |w, t, e| {
            if e.sys().leap_table > 0 {
                w.put_fs(t, e.sys().leap_table)
            } else {
                Ok(())
            }
        } },
    SysVar { code: cs::LEAPEND, flags: RO, text: "expire",
        emit: |w, t, e| {
            if e.sys().leap_expire > 0 {
                w.put_fs(t, e.sys().leap_expire)
            } else {
                Ok(())
            }
        } },
    SysVar { code: cs::RATE, flags: RO, text: "mintc",
        emit: |w, t, e| w.put_uint(t, e.sys().min_poll.into()) },
    SysVar { code: cs::MRU_ENABLED, flags: RO, text: "mru_enabled",
        emit: |w, t, e| w.put_hex(t, e.sys().mru.enabled.into()) },
    SysVar { code: cs::MRU_DEPTH, flags: RO, text: "mru_depth",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.depth) },
    SysVar { code: cs::MRU_DEEPEST, flags: RO, text: "mru_deepest",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.deepest) },
    SysVar { code: cs::MRU_MINDEPTH, flags: RO, text: "mru_mindepth",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.mindepth) },
    SysVar { code: cs::MRU_MAXAGE, flags: RO, text: "mru_maxage",
        emit: |w, t, e| w.put_int(t, e.sys().mru.maxage) },
    SysVar { code: cs::MRU_MINAGE, flags: RO, text: "mru_minage",
        emit: |w, t, e| w.put_int(t, e.sys().mru.minage) },
    SysVar { code: cs::MRU_MAXDEPTH, flags: RO, text: "mru_maxdepth",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.maxdepth) },
    SysVar { code: cs::MRU_MEM, flags: RO, text: "mru_mem",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.mem_kb) },
    SysVar { code: cs::MRU_MAXMEM, flags: RO, text: "mru_maxmem",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.maxmem_kb) },
    SysVar { code: cs::SS_UPTIME, flags: RO, text: "ss_uptime",
        emit: |w, t, e| w.put_uint(t, e.uptime) },
    SysVar { code: cs::SS_RESET, flags: RO, text: "ss_reset",
        emit: |w, t, e| {
            w.put_uint(t, e.uptime.saturating_sub(e.sys().stats.stattime))
        } },
    SysVar { code: cs::SS_RECEIVED, flags: RO, text: "ss_received",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.received) },
    SysVar { code: cs::SS_THISVER, flags: RO, text: "ss_thisver",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.thisver) },
    SysVar { code: cs::SS_OLDVER, flags: RO, text: "ss_oldver",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.oldver) },
    SysVar { code: cs::SS_BADFORMAT, flags: RO, text: "ss_badformat",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.badformat) },
    SysVar { code: cs::SS_BADAUTH, flags: RO, text: "ss_badauth",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.badauth) },
    SysVar { code: cs::SS_DECLINED, flags: RO, text: "ss_declined",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.declined) },
    SysVar { code: cs::SS_RESTRICTED, flags: RO, text: "ss_restricted",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.restricted) },
    SysVar { code: cs::SS_LIMITED, flags: RO, text: "ss_limited",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.limited) },
    SysVar { code: cs::SS_KODSENT, flags: RO, text: "ss_kodsent",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.kodsent) },
    SysVar { code: cs::SS_PROCESSED, flags: RO, text: "ss_processed",
        emit: |w, t, e| w.put_uint(t, e.sys().stats.processed) },
    SysVar { code: cs::PEERADR, flags: RO, text: "peeradr",
        emit: |w, t, e| {
            let txt = e
                .view
                .sys_peer()
                .map_or_else(|| "0.0.0.0:0".to_owned(), |p| p.srcadr.to_string());
            w.put_unq(t, &txt)
        } },
    SysVar { code: cs::PEERMODE, flags: RO, text: "peermode",
        emit: |w, t, e| {
            w.put_uint(t, e.view.sys_peer().map_or(0, |p| p.hmode.into()))
        } },
    SysVar { code: cs::AUTHDELAY, flags: RO, text: "authdelay",
        emit: |w, t, e| w.put_dbl(t, e.sys().auth.delay * 1e3) },
    SysVar { code: cs::AUTHKEYS, flags: RO, text: "authkeys",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.keys) },
    SysVar { code: cs::AUTHFREEK, flags: RO, text: "authfreek",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.freekeys) },
    SysVar { code: cs::AUTHKLOOKUPS, flags: RO, text: "authklookups",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.lookups) },
    SysVar { code: cs::AUTHKNOTFOUND, flags: RO, text: "authknotfound",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.notfound) },
    SysVar { code: cs::AUTHKUNCACHED, flags: RO, text: "authkuncached",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.uncached) },
    SysVar { code: cs::AUTHKEXPIRED, flags: RO, text: "authkexpired",
        // Historical relic; keys no longer expire.
        emit: |w, t, _| w.put_uint(t, 0) },
    SysVar { code: cs::AUTHENCRYPTS, flags: RO, text: "authencrypts",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.encrypts) },
    SysVar { code: cs::AUTHDECRYPTS, flags: RO, text: "authdecrypts",
        emit: |w, t, e| w.put_uint(t, e.sys().auth.decrypts) },
    SysVar { code: cs::AUTHRESET, flags: RO, text: "authreset",
        emit: |w, t, e| {
            w.put_uint(t, e.uptime.saturating_sub(e.sys().auth.timereset))
        } },
    SysVar { code: cs::K_OFFSET, flags: RO, text: "koffset",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_dblf(t, false, 6, k.offset),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_FREQ, flags: RO, text: "kfreq",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_dblf(t, false, 6, k.freq),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_MAXERR, flags: RO, text: "kmaxerr",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_dblf(t, false, 6, k.maxerr),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_ESTERR, flags: RO, text: "kesterr",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_dblf(t, false, 6, k.esterr),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_STFLAGS, flags: RO, text: "kstflags",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_str(t, &k.status_flags),
            None => w.put_str(t, ""),
        } },
    SysVar { code: cs::K_TIMECONST, flags: RO, text: "ktimeconst",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_int(t, k.time_constant),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PRECISION, flags: RO, text: "kprecis",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_dblf(t, false, 6, k.precision),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_FREQTOL, flags: RO, text: "kfreqtol",
        emit: |w, t, e| match &e.sys().kernel {
            Some(k) => w.put_dblf(t, false, 6, k.freq_tolerance),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_FREQ, flags: RO, text: "kppsfreq",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_dblf(t, false, 6, p.freq),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_STABIL, flags: RO, text: "kppsstab",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_dblf(t, false, 6, p.stability),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_JITTER, flags: RO, text: "kppsjitter",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_dbl(t, p.jitter),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_CALIBDUR, flags: RO, text: "kppscalibdur",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_int(t, p.calibdur),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_CALIBS, flags: RO, text: "kppscalibs",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_int(t, p.calibs),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_CALIBERRS, flags: RO, text: "kppscaliberrs",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_int(t, p.caliberrs),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_JITEXC, flags: RO, text: "kppsjitexc",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_int(t, p.jitter_exceeded),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::K_PPS_STBEXC, flags: RO, text: "kppsstbexc",
        emit: |w, t, e| match e.sys().kernel.as_ref().and_then(|k| k.pps.as_ref()) {
            Some(p) => w.put_int(t, p.stability_exceeded),
            None => w.put_int(t, 0),
        } },
    SysVar { code: cs::IOSTATS_RESET, flags: RO, text: "iostats_reset",
        emit: |w, t, e| {
            w.put_uint(t, e.uptime.saturating_sub(e.sys().io.timereset))
        } },
    SysVar { code: cs::TOTAL_RBUF, flags: RO, text: "total_rbuf",
        emit: |w, t, e| w.put_uint(t, e.sys().io.total_rbuf) },
    SysVar { code: cs::FREE_RBUF, flags: RO, text: "free_rbuf",
        emit: |w, t, e| w.put_uint(t, e.sys().io.free_rbuf) },
    SysVar { code: cs::USED_RBUF, flags: RO, text: "used_rbuf",
        emit: |w, t, e| w.put_uint(t, e.sys().io.used_rbuf) },
    SysVar { code: cs::RBUF_LOWATER, flags: RO, text: "rbuf_lowater",
        emit: |w, t, e| w.put_uint(t, e.sys().io.rbuf_lowater) },
    SysVar { code: cs::IO_DROPPED, flags: RO, text: "io_dropped",
        emit: |w, t, e| w.put_uint(t, e.sys().io.dropped) },
    SysVar { code: cs::IO_IGNORED, flags: RO, text: "io_ignored",
        emit: |w, t, e| w.put_uint(t, e.sys().io.ignored) },
    SysVar { code: cs::IO_RECEIVED, flags: RO, text: "io_received",
        emit: |w, t, e| w.put_uint(t, e.sys().io.received) },
    SysVar { code: cs::IO_SENT, flags: RO, text: "io_sent",
        emit: |w, t, e| w.put_uint(t, e.sys().io.sent) },
    SysVar { code: cs::IO_SENDFAILED, flags: RO, text: "io_sendfailed",
        emit: |w, t, e| w.put_uint(t, e.sys().io.sendfailed) },
    SysVar { code: cs::IO_WAKEUPS, flags: RO, text: "io_wakeups",
        emit: |w, t, e| w.put_uint(t, e.sys().io.wakeups) },
    SysVar { code: cs::IO_GOODWAKEUPS, flags: RO, text: "io_goodwakeups",
        emit: |w, t, e| w.put_uint(t, e.sys().io.goodwakeups) },
    SysVar { code: cs::TIMERSTATS_RESET, flags: RO, text: "timerstats_reset",
        emit: |w, t, e| {
            w.put_uint(t, e.uptime.saturating_sub(e.sys().timer.timereset))
        } },
    SysVar { code: cs::TIMER_OVERRUNS, flags: RO, text: "timer_overruns",
        emit: |w, t, e| w.put_uint(t, e.sys().timer.overruns) },
    SysVar { code: cs::TIMER_XMTS, flags: RO, text: "timer_xmts",
        emit: |w, t, e| w.put_uint(t, e.sys().timer.xmts) },
    SysVar { code: cs::FUZZ, flags: RO, text: "fuzz",
        emit: |w, t, e| w.put_dbl6(t, e.sys().fuzz * 1e3) },
    SysVar { code: cs::WANDER_THRESH, flags: RO, text: "clk_wander_threshold",
        emit: |w, t, e| w.put_dbl(t, e.sys().wander_threshold * 1e6) },
    SysVar { code: cs::MRU_EXISTS, flags: RO, text: "mru_exists",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.exists) },
    SysVar { code: cs::MRU_NEW, flags: RO, text: "mru_new",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.new) },
    SysVar { code: cs::MRU_RECYCLEOLD, flags: RO, text: "mru_recycleold",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.recycle_old) },
    SysVar { code: cs::MRU_RECYCLEFULL, flags: RO, text: "mru_recyclefull",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.recycle_full) },
    SysVar { code: cs::MRU_NONE, flags: RO, text: "mru_none",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.none) },
    SysVar { code: cs::MRU_OLDEST_AGE, flags: RO, text: "mru_oldest_age",
        emit: |w, t, e| w.put_uint(t, e.sys().mru.oldest_age) },
    SysVar { code: cs::LEAPSMEARINTV, flags: RO, text: "leapsmearinterval",
        emit: |w, t, e| {
            if e.sys().leap_smear_interval > 0 {
                w.put_uint(t, e.sys().leap_smear_interval.into())
            } else {
                Ok(())
            }
        } },
    SysVar { code: cs::LEAPSMEAROFFS, flags: RO, text: "leapsmearoffset",
        emit: |w, t, e| {
            if e.sys().leap_smear_interval > 0 {
                w.put_dbl(t, e.sys().leap_smear_offset * 1e3)
            } else {
                Ok(())
            }
        } },
    SysVar { code: cs::TICK, flags: RO, text: "tick",
        emit: |w, t, e| w.put_dbl6(t, e.sys().tick * 1e3) },
    SysVar { code: 0, flags: VarFlags::EOV, text: "", emit: |_, _, _| Ok(()) },
];

/// System variables emitted when a READVAR names none.
pub static DEF_SYS_VAR: &[u16] = &[
    cs::VERSION,
    cs::PROCESSOR,
    cs::SYSTEM,
    cs::LEAP,
    cs::STRATUM,
    cs::PRECISION,
    cs::ROOTDELAY,
    cs::ROOTDISPERSION,
    cs::REFID,
    cs::REFTIME,
    cs::CLOCK,
    cs::PEERID,
    cs::POLL,
    cs::RATE,
    cs::OFFSET,
    cs::DRIFT,
    cs::JITTER,
    cs::ERROR,
    cs::STABIL,
    cs::TAI,
    cs::LEAPTAB,
    cs::LEAPEND,
];

const fn pad_peer() -> PeerVar {
    PeerVar {
        code: 0,
        flags: VarFlags::PADDING,
        text: "",
        emit: |_, _, _, _| Ok(()),
    }
}

/// Peer variables, indexed by code.
pub static PEER_VAR: &[PeerVar] = &[
    pad_peer(), /* 0 */
    PeerVar { code: cp::CONFIG, flags: RO, text: "config",
        emit: |w, t, p, _| {
            w.put_uint(t, u64::from(!p.flags.contains(PeerFlags::PREEMPT)))
        } },
    PeerVar { code: cp::AUTHENABLE, flags: RO, text: "authenable",
        emit: |w, t, p, _| w.put_uint(t, u64::from(p.keyid == 0)) },
    PeerVar { code: cp::AUTHENTIC, flags: RO, text: "authentic",
        emit: |w, t, p, _| {
            w.put_uint(t, u64::from(p.flags.contains(PeerFlags::AUTHENTIC)))
        } },
    PeerVar { code: cp::SRCADR, flags: RO, text: "srcadr",
        emit: |w, t, p, _| w.put_adr(t, p.srcadr.ip()) },
    PeerVar { code: cp::SRCPORT, flags: RO, text: "srcport",
        emit: |w, t, p, _| w.put_uint(t, p.srcadr.port().into()) },
    PeerVar { code: cp::DSTADR, flags: RO, text: "dstadr",
        emit: |w, t, p, _| {
            w.put_adr(t, p.dstadr.map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |a| a.ip()))
        } },
    PeerVar { code: cp::DSTPORT, flags: RO, text: "dstport",
        emit: |w, t, p, _| w.put_uint(t, p.dstadr.map_or(0, |a| a.port().into())) },
    PeerVar { code: cp::LEAP, flags: RO, text: "leap",
        emit: |w, t, p, _| w.put_uint(t, p.leap.into()) },
    PeerVar { code: cp::HMODE, flags: RO, text: "hmode",
        emit: |w, t, p, _| w.put_uint(t, p.hmode.into()) },
    PeerVar { code: cp::STRATUM, flags: RO, text: "stratum",
        emit: |w, t, p, _| w.put_uint(t, p.stratum.into()) },
    PeerVar { code: cp::PPOLL, flags: RO, text: "ppoll",
        emit: |w, t, p, _| w.put_uint(t, p.ppoll.into()) },
    PeerVar { code: cp::HPOLL, flags: RO, text: "hpoll",
        emit: |w, t, p, _| w.put_uint(t, p.hpoll.into()) },
    PeerVar { code: cp::PRECISION, flags: RO, text: "precision",
        emit: |w, t, p, _| w.put_int(t, p.precision.into()) },
    PeerVar { code: cp::ROOTDELAY, flags: RO, text: "rootdelay",
        emit: |w, t, p, _| w.put_dbl(t, p.rootdelay * 1e3) },
    PeerVar { code: cp::ROOTDISPERSION, flags: RO, text: "rootdisp",
        emit: |w, t, p, _| w.put_dbl(t, p.rootdisp * 1e3) },
    PeerVar { code: cp::REFID, flags: RO, text: "refid",
        emit: |w, t, p, _| {
            if p.is_refclock() || !refid_is_address(p.stratum) {
                w.put_refid(t, p.refid)
            } else {
                w.put_adr(t, IpAddr::V4(Ipv4Addr::from(p.refid)))
            }
        } },
    PeerVar { code: cp::REFTIME, flags: RO, text: "reftime",
        emit: |w, t, p, _| w.put_ts(t, p.reftime) },
    // Reporting disabled: leaking the origin timestamp is a
    // vulnerability.
    PeerVar { code: cp::ORG, flags: RO, text: "org",
        emit: |_, _, _, _| Ok(()) },
    PeerVar { code: cp::REC, flags: RO, text: "rec",
        emit: |w, t, p, _| w.put_ts(t, p.rec) },
    PeerVar { code: cp::XMT, flags: RO, text: "xmt",
        emit: |w, t, p, _| w.put_ts(t, p.xmt) },
    PeerVar { code: cp::REACH, flags: RO, text: "reach",
        emit: |w, t, p, _| w.put_hex(t, p.reach.into()) },
    PeerVar { code: cp::UNREACH, flags: RO, text: "unreach",
        emit: |w, t, p, _| w.put_uint(t, p.unreach.into()) },
    PeerVar { code: cp::TIMER, flags: RO, text: "timer",
        emit: |w, t, p, e| w.put_uint(t, p.next_poll.saturating_sub(e.uptime)) },
    PeerVar { code: cp::DELAY, flags: RO, text: "delay",
        emit: |w, t, p, _| w.put_dbl6(t, p.delay * 1e3) },
    PeerVar { code: cp::OFFSET, flags: RO, text: "offset",
        emit: |w, t, p, _| w.put_dbl6(t, p.offset * 1e3) },
    PeerVar { code: cp::JITTER, flags: RO, text: "jitter",
        emit: |w, t, p, _| w.put_dbl6(t, p.jitter * 1e3) },
    PeerVar { code: cp::DISPERSION, flags: RO, text: "dispersion",
        emit: |w, t, p, _| w.put_dbl6(t, p.disp * 1e3) },
    PeerVar { code: cp::KEYID, flags: RO, text: "keyid",
        emit: |w, t, p, _| {
            if p.keyid > NTP_MAXKEY {
                w.put_hex(t, p.keyid.into())
            } else {
                w.put_uint(t, p.keyid.into())
            }
        } },
    PeerVar { code: cp::FILTDELAY, flags: RO, text: "filtdelay",
        emit: |w, t, p, _| w.put_array(t, &p.filter_delay, p.filter_nextpt) },
    PeerVar { code: cp::FILTOFFSET, flags: RO, text: "filtoffset",
        emit: |w, t, p, _| w.put_array(t, &p.filter_offset, p.filter_nextpt) },
    PeerVar { code: cp::PMODE, flags: RO, text: "pmode",
        emit: |w, t, p, _| w.put_uint(t, p.pmode.into()) },
    PeerVar { code: cp::RECEIVED, flags: RO, text: "received",
        emit: |w, t, p, _| w.put_uint(t, p.received) },
    PeerVar { code: cp::SENT, flags: RO, text: "sent",
        emit: |w, t, p, _| w.put_uint(t, p.sent) },
    PeerVar { code: cp::FILTERROR, flags: RO, text: "filtdisp",
        emit: |w, t, p, _| w.put_array(t, &p.filter_disp, p.filter_nextpt) },
    PeerVar { code: cp::FLASH, flags: RO, text: "flash",
        emit: |w, t, p, _| w.put_hex(t, p.flash.into()) },
    PeerVar { code: cp::TTL, flags: RO, text: "ttl",
        emit: |w, t, p, _| {
            if p.is_refclock() {
                w.put_uint(t, p.ttl.into())
            } else {
                Ok(())
            }
        } },
    PeerVar { code: cp::VARLIST, flags: RO, text: "peer_var_list",
        emit: |w, t, _, _| {
            let names: Vec<&str> = PEER_VAR
                .iter()
                .filter(|v| !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING))
                .map(|v| v.text)
                .collect();
            put_varlist(w, t, &names)
        } },
    PeerVar { code: cp::IN, flags: RO, text: "in",
        emit: |w, t, p, _| {
            if p.rate_in > 0.0 {
                w.put_dbl(t, p.rate_in / 1e3)
            } else {
                Ok(())
            }
        } },
    PeerVar { code: cp::OUT, flags: RO, text: "out",
        emit: |w, t, p, _| {
            if p.rate_out > 0.0 {
                w.put_dbl(t, p.rate_out / 1e3)
            } else {
                Ok(())
            }
        } },
    PeerVar { code: cp::RATE, flags: RO, text: "headway",
        emit: |w, t, p, _| w.put_uint(t, p.throttle.into()) },
    PeerVar { code: cp::BIAS, flags: RO, text: "bias",
        emit: |w, t, p, _| {
            if p.bias != 0.0 {
                w.put_dbl(t, p.bias * 1e3)
            } else {
                Ok(())
            }
        } },
    PeerVar { code: cp::SRCHOST, flags: RO, text: "srchost",
        emit: |w, t, p, _| match &p.hostname {
            Some(host) => w.put_str(t, host),
            None => Ok(()),
        } },
    PeerVar { code: cp::TIMEREC, flags: RO, text: "timerec",
        emit: |w, t, p, e| w.put_uint(t, e.uptime.saturating_sub(p.time_received)) },
    PeerVar { code: cp::TIMEREACH, flags: RO, text: "timereach",
        emit: |w, t, p, e| {
            w.put_uint(t, e.uptime.saturating_sub(p.time_reachable))
        } },
    PeerVar { code: cp::BADAUTH, flags: RO, text: "badauth",
        emit: |w, t, p, _| w.put_uint(t, p.badauth) },
    PeerVar { code: cp::BOGUSORG, flags: RO, text: "bogusorg",
        emit: |w, t, p, _| w.put_uint(t, p.bogusorg) },
    PeerVar { code: cp::OLDPKT, flags: RO, text: "oldpkt",
        emit: |w, t, p, _| w.put_uint(t, p.oldpkt) },
    PeerVar { code: cp::SELDISP, flags: RO, text: "seldisp",
        emit: |w, t, p, _| w.put_uint(t, p.seldisp_too_large) },
    PeerVar { code: cp::SELBROKEN, flags: RO, text: "selbroken",
        emit: |w, t, p, _| w.put_uint(t, p.selbroken) },
    PeerVar { code: cp::CANDIDATE, flags: RO, text: "candidate",
        emit: |w, t, p, _| w.put_uint(t, p.selection.into()) },
    PeerVar { code: 0, flags: VarFlags::EOV, text: "", emit: |_, _, _, _| Ok(()) },
];

/// Peer variables emitted when a READVAR/READSTAT names none.
pub static DEF_PEER_VAR: &[u16] = &[
    cp::SRCADR,
    cp::SRCPORT,
    cp::SRCHOST,
    cp::DSTADR,
    cp::DSTPORT,
    cp::OUT,
    cp::IN,
    cp::LEAP,
    cp::STRATUM,
    cp::PRECISION,
    cp::ROOTDELAY,
    cp::ROOTDISPERSION,
    cp::REFID,
    cp::REFTIME,
    cp::REC,
    cp::REACH,
    cp::UNREACH,
    cp::HMODE,
    cp::PMODE,
    cp::HPOLL,
    cp::PPOLL,
    cp::RATE,
    cp::FLASH,
    cp::KEYID,
    cp::TTL,
    cp::OFFSET,
    cp::DELAY,
    cp::DISPERSION,
    cp::JITTER,
    cp::XMT,
    cp::BIAS,
    cp::FILTDELAY,
    cp::FILTOFFSET,
    cp::FILTERROR,
];

const fn pad_clock() -> ClockVar {
    ClockVar {
        code: 0,
        flags: VarFlags::PADDING,
        text: "",
        emit: |_, _, _, _, _| Ok(()),
    }
}

/// Clock variables, indexed by code.
pub static CLOCK_VAR: &[ClockVar] = &[
    pad_clock(), /* 0 */
    ClockVar { code: cc::NAME, flags: RO, text: "name",
        emit: |w, t, cs, mustput, _| match cs.name.as_deref() {
            Some(name) if !name.is_empty() => w.put_str(t, name),
            _ if mustput => w.put_str(t, ""),
            _ => Ok(()),
        } },
    ClockVar { code: cc::TIMECODE, flags: RO, text: "timecode",
        emit: |w, t, cs, _, _| w.put_str(t, &cs.timecode) },
    ClockVar { code: cc::POLL, flags: RO, text: "poll",
        emit: |w, t, cs, _, _| w.put_uint(t, cs.polls) },
    ClockVar { code: cc::NOREPLY, flags: RO, text: "noreply",
        emit: |w, t, cs, _, _| w.put_uint(t, cs.noreply) },
    ClockVar { code: cc::BADFORMAT, flags: RO, text: "badformat",
        emit: |w, t, cs, _, _| w.put_uint(t, cs.badformat) },
    ClockVar { code: cc::BADDATA, flags: RO, text: "baddata",
        emit: |w, t, cs, _, _| w.put_uint(t, cs.baddata) },
    ClockVar { code: cc::FUDGETIME1, flags: RO, text: "fudgetime1",
        emit: |w, t, cs, mustput, _| {
            if mustput || cs.have.contains(ClockHaveFlags::TIME1) {
                w.put_dbl(t, cs.fudgetime1 * 1e3)
            } else {
                Ok(())
            }
        } },
    ClockVar { code: cc::FUDGETIME2, flags: RO, text: "fudgetime2",
        emit: |w, t, cs, mustput, _| {
            if mustput || cs.have.contains(ClockHaveFlags::TIME2) {
                w.put_dbl(t, cs.fudgetime2 * 1e3)
            } else {
                Ok(())
            }
        } },
    ClockVar { code: cc::FUDGEVAL1, flags: RO, text: "stratum",
        emit: |w, t, cs, mustput, _| {
            if mustput || cs.have.contains(ClockHaveFlags::VAL1) {
                w.put_int(t, cs.fudgeval1)
            } else {
                Ok(())
            }
        } },
    ClockVar { code: cc::FUDGEVAL2, flags: RO, text: "refid",
        emit: |w, t, cs, mustput, _| {
            if mustput || cs.have.contains(ClockHaveFlags::VAL2) {
                if cs.fudgeval1 > 1 {
                    w.put_adr(t, IpAddr::V4(Ipv4Addr::from(cs.fudgeval2)))
                } else {
                    w.put_refid(t, cs.fudgeval2)
                }
            } else {
                Ok(())
            }
        } },
    ClockVar { code: cc::FLAGS, flags: RO, text: "flags",
        emit: |w, t, cs, _, _| w.put_uint(t, cs.flags.into()) },
    ClockVar { code: cc::DEVICE, flags: RO, text: "device",
        emit: |w, t, cs, mustput, _| match cs.device.as_deref() {
            Some(device) if !device.is_empty() => w.put_str(t, device),
            _ if mustput => w.put_str(t, ""),
            _ => Ok(()),
        } },
    ClockVar { code: cc::VARLIST, flags: RO, text: "clock_var_list",
        emit: |w, t, cs, _, _| {
            let mut names: Vec<&str> = CLOCK_VAR
                .iter()
                .filter(|v| !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING))
                .map(|v| v.text)
                .collect();
            names.extend(
                cs.kv_list
                    .iter()
                    .filter(|v| {
                        !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING)
                    })
                    .map(|v| v.name()),
            );
            put_varlist(w, t, &names)
        } },
    ClockVar { code: 0, flags: VarFlags::EOV, text: "", emit: |_, _, _, _, _| Ok(()) },
];

/// Clock variables emitted when a READCLOCK names none.
pub static DEF_CLOCK_VAR: &[u16] = &[
    cc::DEVICE,
    cc::NAME,
    cc::TIMECODE,
    cc::POLL,
    cc::NOREPLY,
    cc::BADFORMAT,
    cc::BADDATA,
    cc::FUDGETIME1,
    cc::FUDGETIME2,
    cc::FUDGEVAL1,
    cc::FUDGEVAL2,
    cc::FLAGS,
];

/// Emit one system variable by code.
pub fn emit_sys(code: u16, w: &mut ResponseWriter<'_>, ctx: &EmitCtx<'_>) -> Result<()> {
    match SYS_VAR.get(code as usize) {
        Some(v) if !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING) => {
            (v.emit)(w, v.text, ctx)
        },
        _ => Ok(()),
    }
}

/// Emit one peer variable by code.
pub fn emit_peer(
    code: u16,
    w: &mut ResponseWriter<'_>,
    peer: &Peer,
    ctx: &EmitCtx<'_>,
) -> Result<()> {
    match PEER_VAR.get(code as usize) {
        Some(v) if !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING) => {
            (v.emit)(w, v.text, peer, ctx)
        },
        _ => Ok(()),
    }
}

/// Emit one clock variable by code; `mustput` forces the optional
/// fudge values out on explicit request.
pub fn emit_clock(
    code: u16,
    w: &mut ResponseWriter<'_>,
    cs: &RefclockStatus,
    mustput: bool,
    ctx: &EmitCtx<'_>,
) -> Result<()> {
    match CLOCK_VAR.get(code as usize) {
        Some(v) if !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING) => {
            (v.emit)(w, v.text, cs, mustput, ctx)
        },
        _ => Ok(()),
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::models::lfp::LfpTimestamp;

/// Monitor (MRU subsystem) gauges surfaced through the `mru_*`
/// system variables.
#[derive(Debug, Default, Clone)]
pub struct MruStats {
    pub enabled: u32,
    pub depth: u64,
    pub deepest: u64,
    pub mindepth: u64,
    pub maxage: i64,
    pub minage: i64,
    pub maxdepth: u64,
    pub mem_kb: u64,
    pub maxmem_kb: u64,
    pub exists: u64,
    pub new: u64,
    pub recycle_old: u64,
    pub recycle_full: u64,
    pub none: u64,
    pub oldest_age: u64,
}

/// Packet-machinery counters (`ss_*` variables).
#[derive(Debug, Default, Clone)]
pub struct SysStats {
    /// Uptime second of the last stats reset.
    pub stattime: u64,
    pub received: u64,
    pub thisver: u64,
    pub oldver: u64,
    pub badformat: u64,
    pub badauth: u64,
    pub declined: u64,
    pub restricted: u64,
    pub limited: u64,
    pub kodsent: u64,
    pub processed: u64,
}

/// Symmetric-key authentication counters (`auth*` variables).
#[derive(Debug, Default, Clone)]
pub struct AuthStats {
    /// Measured authentication delay, seconds.
    pub delay: f64,
    pub keys: u64,
    pub freekeys: u64,
    pub lookups: u64,
    pub notfound: u64,
    pub uncached: u64,
    pub encrypts: u64,
    pub decrypts: u64,
    pub timereset: u64,
}

/// I/O machinery counters (`io_*` and buffer variables).
#[derive(Debug, Default, Clone)]
pub struct IoStats {
    pub timereset: u64,
    pub total_rbuf: u64,
    pub free_rbuf: u64,
    pub used_rbuf: u64,
    pub rbuf_lowater: u64,
    pub dropped: u64,
    pub ignored: u64,
    pub received: u64,
    pub sent: u64,
    pub sendfailed: u64,
    pub wakeups: u64,
    pub goodwakeups: u64,
}

#[derive(Debug, Default, Clone)]
pub struct TimerStats {
    pub timereset: u64,
    pub overruns: u64,
    pub xmts: u64,
}

/// Hardware-PPS block of the kernel loop, present only while the
/// kernel discipline reports an active PPS signal.
#[derive(Debug, Default, Clone)]
pub struct KernelPps {
    pub freq: f64,
    pub stability: f64,
    pub jitter: f64,
    pub calibdur: i64,
    pub calibs: i64,
    pub caliberrs: i64,
    pub jitter_exceeded: i64,
    pub stability_exceeded: i64,
}

/// Kernel loop-discipline snapshot (`k*` variables).  Absent on
/// builds without a kernel PLL; the emitters then report zeros.
#[derive(Debug, Default, Clone)]
pub struct KernelVars {
    /// Residual offset, milliseconds.
    pub offset: f64,
    /// Frequency correction, ppm.
    pub freq: f64,
    pub maxerr: f64,
    pub esterr: f64,
    pub status_flags: String,
    pub time_constant: i64,
    pub precision: f64,
    pub freq_tolerance: f64,
    pub pps: Option<KernelPps>,
}

/// Read-only snapshot of the daemon state behind the `CS_*` system
/// variables.  Units follow the daemon: seconds for float time
/// quantities (the emitters scale to ms/ppm), seconds since 1900 for
/// filestamps.
#[derive(Debug, Clone)]
pub struct SystemVars {
    pub leap: u8,
    pub stratum: u8,
    pub precision: i8,
    pub rootdelay: f64,
    pub rootdisp: f64,
    pub refid: u32,
    pub reftime: LfpTimestamp,
    pub poll: u8,
    pub min_poll: u8,
    pub clock_offset: f64,
    pub drift: f64,
    pub jitter: f64,
    pub clk_jitter: f64,
    pub clk_wander: f64,
    pub wander_threshold: f64,
    pub fuzz: f64,
    pub tick: f64,
    pub processor: String,
    pub system: String,
    pub version: String,
    pub tai: u32,
    /// Leap-table arrival filestamp (seconds since 1900), 0 if none.
    pub leap_table: u32,
    /// Leap-table expiry filestamp (seconds since 1900), 0 if none.
    pub leap_expire: u32,
    pub leap_smear_interval: u32,
    pub leap_smear_offset: f64,
    /// Clock-source code for the system status word
    /// (`models::status::source`).
    pub clock_source: u8,
    pub mru: MruStats,
    pub stats: SysStats,
    pub auth: AuthStats,
    pub io: IoStats,
    pub timer: TimerStats,
    pub kernel: Option<KernelVars>,
}

impl Default for SystemVars {
    fn default() -> Self {
        Self {
            leap: 0,
            stratum: 16,
            precision: -20,
            rootdelay: 0.0,
            rootdisp: 0.0,
            refid: 0,
            reftime: LfpTimestamp::ZERO,
            poll: 6,
            min_poll: 3,
            clock_offset: 0.0,
            drift: 0.0,
            jitter: 0.0,
            clk_jitter: 0.0,
            clk_wander: 0.0,
            wander_threshold: 5e-7,
            fuzz: 0.0,
            tick: 1e-5,
            processor: "x86_64".to_owned(),
            system: "Linux/6.0".to_owned(),
            version: concat!("ntp-control-rs ", env!("CARGO_PKG_VERSION")).to_owned(),
            tai: 0,
            leap_table: 0,
            leap_expire: 0,
            leap_smear_interval: 0,
            leap_smear_offset: 0.0,
            clock_source: 0,
            mru: MruStats::default(),
            stats: SysStats::default(),
            auth: AuthStats::default(),
            io: IoStats::default(),
            timer: TimerStats::default(),
            kernel: None,
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bitflags::bitflags;

use crate::responder::registry::CtlVar;

bitflags! {
    /// Which fudge knobs the driver actually reported.  Unreported
    /// knobs are omitted from default emission but still printed on
    /// explicit request.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ClockHaveFlags: u8 {
        const TIME1 = 0x01;
        const TIME2 = 0x02;
        const VAL1  = 0x04;
        const VAL2  = 0x08;
    }
}

/// Status snapshot of one reference-clock driver, as handed back by
/// the refclock subsystem for a READCLOCK query.
#[derive(Debug, Default, Clone)]
pub struct RefclockStatus {
    pub name: Option<String>,
    /// Driver description ("device").
    pub device: Option<String>,
    /// Last timecode string received from the hardware.
    pub timecode: String,
    pub polls: u64,
    pub noreply: u64,
    pub badformat: u64,
    pub baddata: u64,
    pub fudgetime1: f64,
    pub fudgetime2: f64,
    pub fudgeval1: i64,
    pub fudgeval2: u32,
    pub have: ClockHaveFlags,
    pub flags: u8,
    pub last_event: u8,
    pub current_status: u8,
    /// Driver-specific extension variables (`name=value` rows).
    pub kv_list: Vec<CtlVar>,
}

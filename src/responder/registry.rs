// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Variable descriptors: the name↔code mapping behind every readvar,
//! writevar and readclock lookup.

use std::borrow::Cow;

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct VarFlags: u16 {
        const CAN_READ  = 0x01;
        const CAN_WRITE = 0x02;
        /// Included in the default emission set (extension tables).
        const DEF       = 0x20;
        /// Placeholder row, skipped by lookups.
        const PADDING   = 0x40;
        /// End-of-vector sentinel terminating a table.
        const EOV       = 0x80;
    }
}

/// Read-only variable.
pub const RO: VarFlags = VarFlags::CAN_READ;
/// Read/write variable.
pub const RW: VarFlags = VarFlags::CAN_READ.union(VarFlags::CAN_WRITE);

/// One variable descriptor.  Built-in tables borrow their text;
/// extension entries own a full `name=value` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtlVar {
    pub code: u16,
    pub flags: VarFlags,
    pub text: Cow<'static, str>,
}

impl CtlVar {
    pub const fn fixed(code: u16, flags: VarFlags, text: &'static str) -> Self {
        Self {
            code,
            flags,
            text: Cow::Borrowed(text),
        }
    }

    pub const fn eov() -> Self {
        Self {
            code: 0,
            flags: VarFlags::EOV,
            text: Cow::Borrowed(""),
        }
    }
}

/// What the request tokenizer and the emission loops need from a
/// table row; lets the typed sys/peer/clock tables share the scanner
/// with plain [`CtlVar`] lists.
pub trait Descriptor {
    fn code(&self) -> u16;
    fn flags(&self) -> VarFlags;
    fn text(&self) -> &str;

    /// Descriptor name: the text up to `'='` or end.
    fn name(&self) -> &str {
        let text = self.text();
        match text.split_once('=') {
            Some((name, _)) => name,
            None => text,
        }
    }
}

impl Descriptor for CtlVar {
    fn code(&self) -> u16 {
        self.code
    }

    fn flags(&self) -> VarFlags {
        self.flags
    }

    fn text(&self) -> &str {
        &self.text
    }
}

/// Non-sentinel entries in a table.
pub fn count_var<D: Descriptor>(table: &[D]) -> usize {
    table
        .iter()
        .take_while(|v| !v.flags().contains(VarFlags::EOV))
        .count()
}

/// Case-sensitive lookup by name (exact match up to the descriptor's
/// `'='`).  Built-in callers pass the built-in table first; the first
/// matching row wins.
pub fn lookup<'t, D: Descriptor>(table: &'t [D], name: &str) -> Option<&'t D> {
    table.iter().find(|v| {
        !v.flags().intersects(VarFlags::EOV | VarFlags::PADDING) && v.name() == name
    })
}

/// A dynamically grown `name=value` table (user-set system variables,
/// per-clock driver variables).  Codes are the 0-based insertion
/// positions; a sentinel row keeps the on-wire table shape.
#[derive(Debug, Clone)]
pub struct ExtVarList {
    vars: Vec<CtlVar>,
}

impl Default for ExtVarList {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtVarList {
    pub fn new() -> Self {
        Self {
            vars: vec![CtlVar::eov()],
        }
    }

    pub fn as_slice(&self) -> &[CtlVar] {
        &self.vars
    }

    pub fn count(&self) -> usize {
        count_var(&self.vars)
    }

    /// Replace an entry with the same name or append a new one.
    pub fn set(&mut self, name_eq_value: &str, flags: VarFlags) {
        if name_eq_value.is_empty() {
            return;
        }
        let name = match name_eq_value.split_once('=') {
            Some((n, _)) => n,
            None => name_eq_value,
        };
        if let Some(existing) = self
            .vars
            .iter_mut()
            .filter(|v| !v.flags.contains(VarFlags::EOV))
            .find(|v| v.name() == name)
        {
            existing.text = Cow::Owned(name_eq_value.to_owned());
            existing.flags = flags;
            return;
        }
        let code = self.count() as u16;
        let sentinel = self.vars.len() - 1;
        self.vars.insert(sentinel, CtlVar {
            code,
            flags,
            text: Cow::Owned(name_eq_value.to_owned()),
        });
    }

    /// Value of a user-set variable, `None` if it was never set.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.vars
            .iter()
            .filter(|v| !v.flags.contains(VarFlags::EOV))
            .find(|v| v.name() == tag)
            .map(|v| match v.text.split_once('=') {
                Some((_, value)) => value,
                None => "",
            })
    }
}

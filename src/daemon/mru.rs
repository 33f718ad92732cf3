// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, net::SocketAddr};

use crate::models::lfp::LfpTimestamp;

/// One Most-Recently-Used client entry.
#[derive(Debug, Clone)]
pub struct MonEntry {
    /// Remote address and port the packets came from.
    pub rmtadr: SocketAddr,
    /// Receive timestamp of the first packet seen.
    pub first: LfpTimestamp,
    /// Receive timestamp of the most recent packet.
    pub last: LfpTimestamp,
    /// Packets received from this client.
    pub count: i64,
    /// Version + mode octet of the last packet.
    pub vn_mode: u8,
    /// Restriction-mask snapshot at last receive.
    pub flags: u16,
    /// Index of the local endpoint that received the traffic.
    pub lcladr: usize,
}

/// Read-side interface the MRU pager walks.  Entry handles are opaque
/// tokens valid only until the handler returns; the pager never holds
/// one across requests (it re-anchors via address + timestamp).
pub trait MruView {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest entry, where a full enumeration starts.
    fn oldest(&self) -> Option<usize>;

    /// Step from `id` toward the newest end of the list.
    fn newer(&self, id: usize) -> Option<usize>;

    /// Hash lookup by remote address + port.
    fn lookup(&self, addr: &SocketAddr) -> Option<usize>;

    fn entry(&self, id: usize) -> &MonEntry;
}

/// In-memory MRU list: entries held oldest-first with an address
/// index, which makes `newer` a plain increment.
#[derive(Debug, Default)]
pub struct MruList {
    entries: Vec<MonEntry>,
    by_addr: HashMap<SocketAddr, usize>,
}

impl MruList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a packet from `addr`: bump an existing entry to the
    /// newest position or append a fresh one.
    pub fn observe(
        &mut self,
        addr: SocketAddr,
        now: LfpTimestamp,
        vn_mode: u8,
        flags: u16,
        lcladr: usize,
    ) {
        if let Some(&pos) = self.by_addr.get(&addr) {
            let mut ent = self.entries.remove(pos);
            ent.last = now;
            ent.count += 1;
            ent.vn_mode = vn_mode;
            ent.flags = flags;
            self.entries.push(ent);
            self.reindex(pos);
        } else {
            self.entries.push(MonEntry {
                rmtadr: addr,
                first: now,
                last: now,
                count: 1,
                vn_mode,
                flags,
                lcladr,
            });
            self.by_addr.insert(addr, self.entries.len() - 1);
        }
    }

    /// Seed an entry verbatim (newest position); test scaffolding and
    /// state import.
    pub fn push_newest(&mut self, entry: MonEntry) {
        self.by_addr.insert(entry.rmtadr, self.entries.len());
        self.entries.push(entry);
    }

    /// Newest entry, if any.
    pub fn newest(&self) -> Option<&MonEntry> {
        self.entries.last()
    }

    pub fn entry_by_addr(&self, addr: &SocketAddr) -> Option<&MonEntry> {
        self.by_addr.get(addr).map(|&i| &self.entries[i])
    }

    /// Drop the oldest entry (recycling).
    pub fn pop_oldest(&mut self) -> Option<MonEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let ent = self.entries.remove(0);
        self.by_addr.remove(&ent.rmtadr);
        self.reindex(0);
        Some(ent)
    }

    fn reindex(&mut self, from: usize) {
        for (i, ent) in self.entries.iter().enumerate().skip(from) {
            self.by_addr.insert(ent.rmtadr, i);
        }
    }
}

impl MruView for MruList {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn oldest(&self) -> Option<usize> {
        if self.entries.is_empty() { None } else { Some(0) }
    }

    fn newer(&self, id: usize) -> Option<usize> {
        let next = id + 1;
        (next < self.entries.len()).then_some(next)
    }

    fn lookup(&self, addr: &SocketAddr) -> Option<usize> {
        self.by_addr.get(addr).copied()
    }

    fn entry(&self, id: usize) -> &MonEntry {
        &self.entries[id]
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! MRU pager scenarios: nonce gating, paging, resync anchors and
//! filters.

use std::net::SocketAddr;

use ntp_control_rs::{
    daemon::{mru::MonEntry, restrict::RestrictFlags},
    models::{error::CtlError, lfp::LfpTimestamp},
};

use crate::unit_tests::common::{
    Harness, assert_error_response, base_time, build_request, text_of, token_value,
    tokens,
};

const OP_REQ_NONCE: u8 = 13;
const OP_READ_MRU: u8 = 10;

fn mru_addr(n: u8) -> SocketAddr {
    format!("10.1.2.{n}:123").parse().expect("addr")
}

/// Seed `n` entries, oldest first; entry `k` was last seen `n - k`
/// seconds before the harness base time.
fn seed_mru(h: &mut Harness, n: u8) {
    for k in 0..n {
        let last = LfpTimestamp::new(
            base_time().seconds() - u32::from(n - k),
            0x8000_0001,
        );
        h.state.mru.push_newest(MonEntry {
            rmtadr: mru_addr(k),
            first: LfpTimestamp::new(last.seconds() - 600, 0x4000_0001),
            last,
            count: i64::from(k) + 1,
            vn_mode: 0x23,
            flags: if k % 2 == 0 { 0x0020 } else { 0 },
            lcladr: usize::from(k % 2),
        });
    }
}

fn fetch_nonce(h: &mut Harness) -> String {
    let sent = h.submit(&build_request(OP_REQ_NONCE, 0, b""));
    let text = text_of(&sent);
    let nonce = token_value(&text, "nonce").expect("nonce token");
    assert_eq!(nonce.len(), 24, "nonce is 24 hex digits: {nonce}");
    assert_eq!(hex::decode(&nonce).expect("hex").len(), 12);
    nonce
}

/// Addresses emitted for a page, in emission order.
fn page_addrs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for k in 0.. {
        match token_value(text, &format!("addr.{k}")) {
            Some(v) => out.push(v),
            None => break,
        }
    }
    out
}

#[test]
fn read_mru_without_nonce_is_silent() {
    let mut h = Harness::new();
    seed_mru(&mut h, 3);
    let sent = h.submit(&build_request(OP_READ_MRU, 0, b"frags=32"));
    assert!(sent.is_empty(), "no nonce, no response");
}

#[test]
fn nonce_round_trip_and_expiry() {
    let mut h = Harness::new();
    seed_mru(&mut h, 2);
    let nonce = fetch_nonce(&mut h);

    // Immediate reuse succeeds.
    let data = format!("nonce={nonce}, frags=32");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert!(!sent.is_empty());

    // 17 seconds later the same nonce fails silently.
    h.clock
        .now
        .set(LfpTimestamp::new(base_time().seconds() + 17, 0));
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert!(sent.is_empty(), "expired nonce must be dropped silently");
}

#[test]
fn tampered_nonce_is_silent() {
    let mut h = Harness::new();
    seed_mru(&mut h, 2);
    let nonce = fetch_nonce(&mut h);
    let mut bad = nonce.into_bytes();
    bad[23] = if bad[23] == b'0' { b'1' } else { b'0' };
    let data = format!("nonce={}, frags=32", String::from_utf8(bad).expect("hex"));
    assert!(h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())).is_empty());
}

#[test]
fn missing_bounds_and_oversize_frags_are_badvalue() {
    let mut h = Harness::new();
    seed_mru(&mut h, 2);

    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert_error_response(&sent, CtlError::BadValue);

    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=33");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert_error_response(&sent, CtlError::BadValue);

    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, limit=257");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert_error_response(&sent, CtlError::BadValue);
}

#[test]
fn full_enumeration_walks_oldest_to_newest() {
    let mut h = Harness::new();
    seed_mru(&mut h, 4);
    let nonce = fetch_nonce(&mut h);

    let data = format!("nonce={nonce}, frags=32");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    let text = text_of(&sent);

    let addrs = page_addrs(&text);
    let expected: Vec<String> = (0..4).map(|k| mru_addr(k).to_string()).collect();
    assert_eq!(addrs, expected, "oldest first: {text}");

    // Every entry carries its six values.
    for k in 0..4 {
        for tag in ["addr", "last", "first", "ct", "mv", "rs"] {
            assert!(
                token_value(&text, &format!("{tag}.{k}")).is_some(),
                "missing {tag}.{k}: {text}"
            );
        }
    }
    assert_eq!(token_value(&text, "ct.0").as_deref(), Some("1"));
    assert_eq!(token_value(&text, "mv.3").as_deref(), Some("35"));

    // The page closes with a fresh nonce, now= and last.newest=.
    let next_nonce = token_value(&text, "nonce").expect("follow-up nonce");
    assert_eq!(next_nonce.len(), 24);
    assert!(token_value(&text, "now").is_some());
    let newest = h.state.mru.newest().expect("seeded").last;
    assert_eq!(
        token_value(&text, "last.newest"),
        Some(newest.to_string()),
        "last.newest confirms the final entry"
    );
}

#[test]
fn limit_bounds_entries_and_leaves_page_open() {
    let mut h = Harness::new();
    seed_mru(&mut h, 3);
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, limit=2");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));

    assert_eq!(page_addrs(&text).len(), 2);
    assert!(token_value(&text, "now").is_none(), "page not final: {text}");
    assert!(token_value(&text, "last.newest").is_none());
}

#[test]
fn frags_one_sends_only_the_nonce() {
    let mut h = Harness::new();
    seed_mru(&mut h, 3);
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=1");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert_eq!(sent.len(), 1);
    let text = text_of(&sent);
    assert!(token_value(&text, "nonce").is_some());
    assert!(page_addrs(&text).is_empty());
}

#[test]
fn resync_anchor_continues_after_known_entry() {
    let mut h = Harness::new();
    seed_mru(&mut h, 4);
    let anchor = h.state.mru.entry_by_addr(&mru_addr(1)).expect("seeded");
    let (anchor_addr, anchor_last) = (anchor.rmtadr, anchor.last);

    let nonce = fetch_nonce(&mut h);
    let data = format!(
        "nonce={nonce}, frags=32, last.0={anchor_last}, addr.0={anchor_addr}"
    );
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));

    // The anchor is confirmed, then the walk resumes with its newer
    // neighbor.
    assert_eq!(
        token_value(&text, "last.older"),
        Some(anchor_last.to_string())
    );
    assert_eq!(
        token_value(&text, "addr.older"),
        Some(anchor_addr.to_string())
    );
    let addrs = page_addrs(&text);
    assert_eq!(addrs, vec![mru_addr(2).to_string(), mru_addr(3).to_string()]);
}

#[test]
fn limit_one_returns_the_anchor_itself() {
    let mut h = Harness::new();
    seed_mru(&mut h, 4);
    let anchor = h.state.mru.entry_by_addr(&mru_addr(2)).expect("seeded");
    let (anchor_addr, anchor_last) = (anchor.rmtadr, anchor.last);

    let nonce = fetch_nonce(&mut h);
    let data = format!(
        "nonce={nonce}, limit=1, last.0={anchor_last}, addr.0={anchor_addr}"
    );
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(page_addrs(&text), vec![anchor_addr.to_string()]);
}

#[test]
fn bumped_anchor_forces_resync_retry() {
    let mut h = Harness::new();
    seed_mru(&mut h, 4);
    let stale = h.state.mru.entry_by_addr(&mru_addr(1)).expect("seeded");
    let (stale_addr, stale_last) = (stale.rmtadr, stale.last);

    // The anchor address gets fresh traffic and moves to the head.
    h.state.mru.observe(
        mru_addr(1),
        LfpTimestamp::new(base_time().seconds(), 0x0000_0001),
        0x23,
        0,
        0,
    );

    let nonce = fetch_nonce(&mut h);
    let data =
        format!("nonce={nonce}, frags=32, last.0={stale_last}, addr.0={stale_addr}");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert_error_response(&sent, CtlError::UnknownVar);

    // Retrying with the next-older anchor works.
    let older = h.state.mru.entry_by_addr(&mru_addr(2)).expect("seeded");
    let (older_addr, older_last) = (older.rmtadr, older.last);
    let nonce = fetch_nonce(&mut h);
    let data = format!(
        "nonce={nonce}, frags=32, last.0={stale_last}, addr.0={stale_addr}, \
         last.1={older_last}, addr.1={older_addr}"
    );
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        token_value(&text, "addr.older"),
        Some(older_addr.to_string())
    );
}

#[test]
fn filters_select_matching_entries() {
    let mut h = Harness::new();
    seed_mru(&mut h, 4);

    // mincount: only entries with ct >= 3 (seeded ct is k+1).
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32, mincount=3");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        page_addrs(&text),
        vec![mru_addr(2).to_string(), mru_addr(3).to_string()]
    );

    // resall: restrict snapshot bit 0x20 is set on even entries.
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32, resall=0x20");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        page_addrs(&text),
        vec![mru_addr(0).to_string(), mru_addr(2).to_string()]
    );

    // resany with a bit nobody has.
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32, resany=0x4000");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert!(page_addrs(&text).is_empty());

    // laddr: entries seen on the second endpoint only.
    h.state.endpoints.push(ntp_control_rs::daemon::endpoint::Endpoint::new(
        1,
        "eth0",
        "192.0.2.1:123".parse().expect("addr"),
    ));
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32, laddr=192.0.2.1");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        page_addrs(&text),
        vec![mru_addr(1).to_string(), mru_addr(3).to_string()]
    );

    // maxlstint: only entries seen within the last 2 seconds.
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32, maxlstint=2");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        page_addrs(&text),
        vec![mru_addr(2).to_string(), mru_addr(3).to_string()]
    );
}

#[test]
fn recent_skips_to_the_newest_entries() {
    let mut h = Harness::new();
    seed_mru(&mut h, 5);
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32, recent=2");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        page_addrs(&text),
        vec![mru_addr(3).to_string(), mru_addr(4).to_string()]
    );
}

#[test]
fn nomrulist_restriction_refuses_with_permission() {
    let mut h = Harness::new();
    seed_mru(&mut h, 2);
    h.state.default_restrict = RestrictFlags::NOMRULIST;
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32");
    let sent = h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert_error_response(&sent, CtlError::Permission);
    assert_eq!(h.state.system.stats.restricted, 1);
}

#[test]
fn fingerprint_tokens_ride_along() {
    let mut h = Harness::new();
    seed_mru(&mut h, 3);
    let nonce = fetch_nonce(&mut h);
    let data = format!("nonce={nonce}, frags=32");
    let text = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));

    // Three random lowercase letters, then ".0" / ".2".
    let fingerprints: Vec<String> = tokens(&text)
        .into_iter()
        .map(|(tag, _)| tag)
        .filter(|tag| {
            tag.len() > 4
                && tag.as_bytes()[3] == b'.'
                && tag[..3].bytes().all(|b| b.is_ascii_lowercase())
                && !tag.starts_with("addr")
                && !tag.starts_with("last")
        })
        .collect();
    assert!(
        fingerprints.iter().any(|t| t.ends_with(".0")),
        "first row fingerprint missing: {text}"
    );
    assert!(
        fingerprints.iter().any(|t| t.ends_with(".2")),
        "last row fingerprint missing: {text}"
    );
}

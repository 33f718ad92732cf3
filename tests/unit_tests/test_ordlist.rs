// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::IpAddr;

use ntp_control_rs::{
    daemon::{
        endpoint::Endpoint,
        keys::KeyStore,
        restrict::{RestrictEntry, RestrictFlags, RestrictMatchFlags},
    },
    models::{error::CtlError, header::CTL_HEADER_LEN},
};

use crate::unit_tests::common::{
    CTL_KEYID, Harness, assert_error_response, build_request, build_request_auth,
    header_of, text_of, token_value,
};

const OP_ORDLIST: u8 = 12;

fn restrict_row(addr: &str, mask: &str, flags: RestrictFlags) -> RestrictEntry {
    RestrictEntry {
        addr: addr.parse::<IpAddr>().expect("addr"),
        mask: mask.parse::<IpAddr>().expect("mask"),
        hits: 17,
        flags,
        mflags: RestrictMatchFlags::empty(),
    }
}

#[test]
fn ordlist_requires_authentication() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(OP_ORDLIST, 0, b"ifstats"));
    assert_error_response(&sent, CtlError::Permission);
}

#[test]
fn empty_selector_means_ifstats() {
    let mut h = Harness::new();
    for selector in [&b""[..], b"ifstats"] {
        let pkt = build_request_auth(OP_ORDLIST, 0, selector, CTL_KEYID, &h.keys);
        let text = text_of(&h.submit(&pkt));
        assert_eq!(
            token_value(&text, "name.0").as_deref(),
            Some("lo"),
            "selector {selector:?}: {text}"
        );
        assert_eq!(token_value(&text, "addr.0").as_deref(), Some("127.0.0.1:123"));
        for tag in [
            "addr.0", "bcast.0", "en.0", "name.0", "flags.0", "tl.0", "mc.0",
            "rx.0", "tx.0", "txerr.0", "pc.0", "up.0",
        ] {
            assert!(token_value(&text, tag).is_some(), "missing {tag}: {text}");
        }
    }
}

#[test]
fn ifstats_reports_every_endpoint_with_counters() {
    let mut h = Harness::new();
    let mut eth = Endpoint::new(1, "eth0", "192.0.2.1:123".parse().expect("addr"));
    eth.received = 1234;
    eth.sent = 999;
    eth.notsent = 3;
    eth.enabled = false;
    h.state.endpoints.push(eth);

    let pkt = build_request_auth(OP_ORDLIST, 0, b"ifstats", CTL_KEYID, &h.keys);
    let text = text_of(&h.submit(&pkt));
    assert_eq!(token_value(&text, "name.1").as_deref(), Some("eth0"));
    assert_eq!(token_value(&text, "rx.1").as_deref(), Some("1234"));
    assert_eq!(token_value(&text, "tx.1").as_deref(), Some("999"));
    assert_eq!(token_value(&text, "txerr.1").as_deref(), Some("3"));
    assert_eq!(token_value(&text, "en.1").as_deref(), Some("0"));
}

#[test]
fn reslist_concatenates_v4_then_v6() {
    let mut h = Harness::new();
    h.state.restrict4.push(restrict_row(
        "0.0.0.0",
        "0.0.0.0",
        RestrictFlags::KOD | RestrictFlags::LIMITED,
    ));
    h.state.restrict4.push(restrict_row(
        "198.51.100.0",
        "255.255.255.0",
        RestrictFlags::NOMODIFY,
    ));
    h.state
        .restrict6
        .push(restrict_row("::", "::", RestrictFlags::NOQUERY));

    let pkt =
        build_request_auth(OP_ORDLIST, 0, b"addr_restrictions", CTL_KEYID, &h.keys);
    let text = text_of(&h.submit(&pkt));

    assert_eq!(token_value(&text, "addr.0").as_deref(), Some("0.0.0.0"));
    assert_eq!(token_value(&text, "flags.0").as_deref(), Some("limited kod"));
    assert_eq!(token_value(&text, "addr.1").as_deref(), Some("198.51.100.0"));
    assert_eq!(token_value(&text, "mask.1").as_deref(), Some("255.255.255.0"));
    assert_eq!(token_value(&text, "hits.1").as_deref(), Some("17"));
    // v6 rows continue the same index sequence.
    assert_eq!(token_value(&text, "addr.2").as_deref(), Some("::"));
    assert_eq!(token_value(&text, "flags.2").as_deref(), Some("noquery"));
    assert!(token_value(&text, "addr.3").is_none());
}

#[test]
fn unknown_selector_is_unknownvar() {
    let mut h = Harness::new();
    let pkt = build_request_auth(OP_ORDLIST, 0, b"peers", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::UnknownVar);
}

#[test]
fn authenticated_responses_carry_a_verifying_mac() {
    let mut h = Harness::new();
    let pkt = build_request_auth(OP_ORDLIST, 0, b"ifstats", CTL_KEYID, &h.keys);
    let sent = h.submit(&pkt);
    assert_eq!(sent.len(), 1);

    let frag = &sent[0];
    let hdr = header_of(frag);
    let mut sendlen = CTL_HEADER_LEN + hdr.count.get() as usize;
    while sendlen % 4 != 0 {
        sendlen += 1;
    }
    let mut totlen = sendlen;
    while totlen % 8 != 0 {
        totlen += 1;
    }
    assert_eq!(frag.len(), totlen + 20, "keyid word + MD5 digest");
    assert_eq!(&frag[totlen..totlen + 4], &CTL_KEYID.to_be_bytes());
    assert!(
        h.keys
            .verify_mac(CTL_KEYID, &frag[..totlen], &frag[totlen..]),
        "response MAC must verify under the request key"
    );
}

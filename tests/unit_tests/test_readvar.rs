// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use ntp_control_rs::{
    daemon::{
        peer::{Peer, PeerFlags},
        refclock::RefclockStatus,
    },
    models::{
        error::CtlError,
        opcode::{CTL_MORE, CTL_RESPONSE},
    },
    responder::registry::VarFlags,
};

use crate::unit_tests::common::{
    Harness, assert_error_response, build_request, data_of, header_of, text_of,
    token_value,
};

#[test]
fn unknown_opcode_yields_badop() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(0x1f, 0, b""));
    assert_error_response(&sent, CtlError::BadOp);
    assert_eq!(h.resp.stats.numctlbadop, 1);
    // The sequence number is echoed into the error response.
    assert_eq!(header_of(&sent[0]).sequence.get(), 1);
}

#[test]
fn readvar_default_set_contains_core_variables() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(2, 0, b""));
    assert_eq!(sent.len(), 1);

    let hdr = header_of(&sent[0]);
    assert_ne!(hdr.r_m_e_op.raw() & CTL_RESPONSE, 0);
    assert_eq!(hdr.r_m_e_op.raw() & CTL_MORE, 0);

    let text = text_of(&sent);
    assert!(text.ends_with("\r\n"), "text payloads end with CRLF");
    for tag in ["version", "stratum", "offset", "refid", "clock"] {
        assert!(
            token_value(&text, tag).is_some(),
            "default set must contain {tag}: {text}"
        );
    }
    assert_eq!(token_value(&text, "stratum").as_deref(), Some("16"));
}

#[test]
fn readvar_selects_named_variables_only() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(2, 0, b"stratum,precision"));
    let text = text_of(&sent);
    assert!(token_value(&text, "stratum").is_some());
    assert!(token_value(&text, "precision").is_some());
    assert!(token_value(&text, "version").is_none());
}

#[test]
fn readvar_unknown_name_yields_unknownvar() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(2, 0, b"nonesuch"));
    assert_error_response(&sent, CtlError::UnknownVar);
}

#[test]
fn readvar_peer_requires_known_association() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(2, 99, b""));
    assert_error_response(&sent, CtlError::BadAssoc);

    h.add_peer(99);
    let sent = h.submit(&build_request(2, 99, b""));
    let text = text_of(&sent);
    assert_eq!(token_value(&text, "srcadr").as_deref(), Some("203.0.113.99"));
    assert_eq!(token_value(&text, "stratum").as_deref(), Some("2"));
    assert_eq!(token_value(&text, "refid").as_deref(), Some("198.51.100.1"));
    let status = header_of(&sent[0]).status.get();
    assert_eq!(status, h.state.peers[0].status_word());
}

#[test]
fn readstat_zero_packs_association_status_pairs() {
    let mut h = Harness::new();
    h.add_peer(5);
    h.add_peer(6);
    let expected: Vec<u8> = h
        .state
        .peers
        .iter()
        .flat_map(|p| {
            let mut v = p.associd.to_be_bytes().to_vec();
            v.extend_from_slice(&p.status_word().to_be_bytes());
            v
        })
        .collect();

    let sent = h.submit(&build_request(1, 0, b""));
    assert_eq!(sent.len(), 1);
    assert_eq!(data_of(&sent[0]), &expected[..]);
}

#[test]
fn unspec_reports_status_only() {
    let mut h = Harness::new();
    h.add_peer(3);
    let sent = h.submit(&build_request(0, 3, b""));
    assert_eq!(sent.len(), 1);
    let hdr = header_of(&sent[0]);
    assert_eq!(hdr.count.get(), 0);
    assert_eq!(hdr.status.get(), h.state.peers[0].status_word());

    let sent = h.submit(&build_request(0, 42, b""));
    assert_error_response(&sent, CtlError::BadAssoc);
}

#[test]
fn readclock_picks_a_refclock_and_reports_badassoc_without_one() {
    let mut h = Harness::new();
    h.add_peer(4);
    let sent = h.submit(&build_request(4, 0, b""));
    assert_error_response(&sent, CtlError::BadAssoc);

    let clk = Peer {
        flags: PeerFlags::REFCLOCK,
        ..Peer::new(8, "127.127.20.0:123".parse().expect("addr"))
    };
    h.state.peers.push(clk);
    h.state.refclocks.push((8, RefclockStatus {
        name: Some("NMEA".to_owned()),
        device: Some("/dev/gps0".to_owned()),
        timecode: "$GPRMC,0".to_owned(),
        polls: 12,
        ..RefclockStatus::default()
    }));

    let sent = h.submit(&build_request(4, 0, b""));
    let text = text_of(&sent);
    assert_eq!(token_value(&text, "name").as_deref(), Some("NMEA"));
    assert_eq!(token_value(&text, "device").as_deref(), Some("/dev/gps0"));
    assert_eq!(token_value(&text, "poll").as_deref(), Some("12"));
}

#[test]
fn readvar_reports_user_set_def_variables() {
    let mut h = Harness::new();
    h.resp
        .set_sys_var("sitename=antenna-hut", VarFlags::DEF);
    let text = text_of(&h.submit(&build_request(2, 0, b"")));
    assert_eq!(token_value(&text, "sitename").as_deref(), Some("antenna-hut"));

    // Explicit request works too.
    let text = text_of(&h.submit(&build_request(2, 0, b"sitename")));
    assert_eq!(token_value(&text, "sitename").as_deref(), Some("antenna-hut"));
}

#[test]
fn long_peer_response_fragments_with_offsets() {
    let mut h = Harness::new();
    {
        let peer = h.add_peer(11);
        peer.hostname = Some("h".repeat(180));
        for i in 0..8 {
            peer.filter_delay[i] = 1.5 + i as f64;
            peer.filter_offset[i] = -0.25 * i as f64;
            peer.filter_disp[i] = 0.125 * i as f64;
        }
    }

    // Ask for every peer variable; the hostname pushes the payload
    // past one datagram.
    let all: String = ntp_control_rs::responder::vars::PEER_VAR
        .iter()
        .filter(|v| !v.flags.intersects(VarFlags::EOV | VarFlags::PADDING))
        .map(|v| v.text)
        .collect::<Vec<_>>()
        .join(",");
    let sent = h.submit(&build_request(2, 11, all.as_bytes()));
    assert!(sent.len() >= 2, "expected fragmentation, got {}", sent.len());

    let mut expected_offset = 0u16;
    for (i, frag) in sent.iter().enumerate() {
        let hdr = header_of(frag);
        assert_eq!(hdr.offset.get(), expected_offset);
        let more = hdr.r_m_e_op.raw() & CTL_MORE != 0;
        assert_eq!(more, i + 1 < sent.len(), "More set on all but the last");
        assert_eq!(hdr.sequence.get(), 1);
        expected_offset += hdr.count.get();
    }

    let text = text_of(&sent);
    assert_eq!(
        token_value(&text, "srchost").as_deref(),
        Some("h".repeat(180).as_str())
    );
    assert!(token_value(&text, "filtdelay").is_some());
}

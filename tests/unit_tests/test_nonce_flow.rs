// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use ntp_control_rs::{
    daemon::mru::MonEntry,
    models::{lfp::LfpTimestamp, opcode::CTL_RESPONSE},
};

use crate::unit_tests::common::{
    Harness, base_time, build_request, client_addr, header_of, text_of, token_value,
};

const OP_REQ_NONCE: u8 = 13;
const OP_READ_MRU: u8 = 10;

#[test]
fn req_nonce_answers_with_one_datagram() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(OP_REQ_NONCE, 0, b""));
    assert_eq!(sent.len(), 1);

    let hdr = header_of(&sent[0]);
    assert_ne!(hdr.r_m_e_op.raw() & CTL_RESPONSE, 0);
    assert_eq!(hdr.sequence.get(), 1);

    let text = text_of(&sent);
    let nonce = token_value(&text, "nonce").expect("nonce token");
    assert_eq!(nonce.len(), 24);
    // The leading 16 digits are the receive timestamp of the request.
    assert_eq!(
        LfpTimestamp::parse_hex(&format!("0x{}.{}", &nonce[..8], &nonce[8..16]))
            .expect("timestamp halves"),
        base_time()
    );
}

#[test]
fn nonce_is_bound_to_the_requesting_client() {
    let mut h = Harness::new();
    h.state.mru.push_newest(MonEntry {
        rmtadr: "10.9.9.9:123".parse().expect("addr"),
        first: base_time(),
        last: base_time(),
        count: 1,
        vn_mode: 0x23,
        flags: 0,
        lcladr: 0,
    });

    let sent = h.submit(&build_request(OP_REQ_NONCE, 0, b""));
    let nonce = token_value(&text_of(&sent), "nonce").expect("nonce");

    // Another client replaying the same nonce gets nothing.
    let data = format!("nonce={nonce}, frags=32");
    let other: std::net::SocketAddr = "198.51.100.200:40000".parse().expect("addr");
    let sent = h.submit_from(other, &build_request(OP_READ_MRU, 0, data.as_bytes()));
    assert!(sent.is_empty());

    // The rightful client is served.
    let sent = h.submit_from(
        client_addr(),
        &build_request(OP_READ_MRU, 0, data.as_bytes()),
    );
    assert!(!sent.is_empty());
}

#[test]
fn mru_page_carries_a_usable_follow_up_nonce() {
    let mut h = Harness::new();
    for n in 1..=3u8 {
        h.state.mru.push_newest(MonEntry {
            rmtadr: format!("10.4.4.{n}:123").parse().expect("addr"),
            first: base_time(),
            last: LfpTimestamp::new(base_time().seconds(), u32::from(n)),
            count: 1,
            vn_mode: 0x23,
            flags: 0,
            lcladr: 0,
        });
    }

    let first = h.submit(&build_request(OP_REQ_NONCE, 0, b""));
    let nonce = token_value(&text_of(&first), "nonce").expect("nonce");

    let data = format!("nonce={nonce}, limit=1");
    let page = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    let follow_up = token_value(&page, "nonce").expect("follow-up nonce");
    assert_eq!(follow_up.len(), 24);

    // Anchor on the single entry returned and keep paging with the
    // fresh nonce.
    let anchor_addr = token_value(&page, "addr.0").expect("entry");
    let anchor_last = token_value(&page, "last.0").expect("entry");
    let data = format!(
        "nonce={follow_up}, frags=32, last.0={anchor_last}, addr.0={anchor_addr}"
    );
    let next = text_of(&h.submit(&build_request(OP_READ_MRU, 0, data.as_bytes())));
    assert_eq!(
        token_value(&next, "addr.older").as_deref(),
        Some(anchor_addr.as_str())
    );
    assert!(token_value(&next, "now").is_some());
}

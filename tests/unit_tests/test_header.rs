// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use hex_literal::hex;
use ntp_control_rs::models::{
    header::{CTL_HEADER_LEN, CtlHeader, FrameError},
    opcode::{CTL_ERROR, CTL_MORE, CTL_RESPONSE, CtlOpcode, RawLiVnMode, RawRmeOp},
};
use zerocopy::{IntoBytes, U16};

use crate::unit_tests::common::{Harness, build_request};

fn valid_header() -> CtlHeader {
    CtlHeader {
        li_vn_mode: RawLiVnMode::compose(0, 4, 6),
        r_m_e_op: RawRmeOp::from_raw(2),
        sequence: U16::new(0x0102),
        status: U16::new(0),
        associd: U16::new(0x00aa),
        offset: U16::new(0),
        count: U16::new(0),
    }
}

#[test]
fn encode_decode_is_identity() -> Result<()> {
    let hdr = valid_header();
    let mut buf = [0u8; CTL_HEADER_LEN];
    hdr.encode_into(&mut buf)?;
    let back = CtlHeader::decode(&buf).expect("valid");
    assert_eq!(back, hdr);
    Ok(())
}

#[test]
fn decodes_a_captured_readvar_request() {
    // `ntpq -c rv` on the wire: version 4 control, opcode READVAR,
    // sequence 2, association 0, empty data area.
    let bytes = hex!("26 02 0002 0000 0000 0000 0000");
    let hdr = CtlHeader::decode(&bytes).expect("valid capture");
    assert_eq!(hdr.r_m_e_op.opcode_known(), Some(CtlOpcode::ReadVar));
    assert_eq!(hdr.sequence.get(), 2);
    assert_eq!(hdr.associd.get(), 0);
    assert_eq!(hdr.count.get(), 0);
}

#[test]
fn rejects_short_datagrams() {
    assert_eq!(CtlHeader::decode(&[0u8; 4]), Err(FrameError::TooShort));
}

#[test]
fn rejects_non_control_mode() {
    let mut hdr = valid_header();
    hdr.li_vn_mode = RawLiVnMode::compose(0, 4, 3);
    let err = CtlHeader::decode(hdr.as_bytes()).expect_err("mode 3");
    assert_eq!(err, FrameError::NotControl(3));
}

#[test]
fn rejects_response_flags_on_input() {
    for (bit, want) in [
        (CTL_RESPONSE, FrameError::ResponseOnInput),
        (CTL_MORE, FrameError::FragmentOnInput),
        (CTL_ERROR, FrameError::ErrorOnInput),
    ] {
        let mut hdr = valid_header();
        hdr.r_m_e_op = RawRmeOp::from_raw(2 | bit);
        assert_eq!(CtlHeader::decode(hdr.as_bytes()), Err(want));
    }
}

#[test]
fn rejects_nonzero_offset() {
    let mut hdr = valid_header();
    hdr.offset = U16::new(12);
    assert_eq!(
        CtlHeader::decode(hdr.as_bytes()),
        Err(FrameError::NonzeroOffset(12))
    );
}

#[test]
fn rejects_out_of_range_versions() {
    for version in [0u8, 1, 2, 5, 7] {
        let mut hdr = valid_header();
        hdr.li_vn_mode = RawLiVnMode::compose(0, version, 6);
        assert_eq!(
            CtlHeader::decode(hdr.as_bytes()),
            Err(FrameError::BadVersion(version)),
            "version {version} must be rejected"
        );
    }
    for version in [3u8, 4] {
        let mut hdr = valid_header();
        hdr.li_vn_mode = RawLiVnMode::compose(0, version, 6);
        assert!(CtlHeader::decode(hdr.as_bytes()).is_ok());
    }
}

#[test]
fn rejects_count_overrunning_payload() {
    let mut hdr = valid_header();
    hdr.count = U16::new(8);
    // 12 header bytes only, count says 8 more.
    assert_eq!(
        CtlHeader::decode(hdr.as_bytes()),
        Err(FrameError::CountOverrun { count: 8, have: 0 })
    );
}

#[test]
fn rejects_unaligned_datagrams() {
    let mut pkt = valid_header().as_bytes().to_vec();
    pkt.extend_from_slice(&[0, 0, 0]);
    assert_eq!(CtlHeader::decode(&pkt), Err(FrameError::Unaligned(15)));
}

#[test]
fn framing_failures_are_counted_and_silent() {
    let mut h = Harness::new();

    // Response bit set on input: dropped, counted, no reply.
    let mut pkt = build_request(2, 0, b"");
    pkt[1] |= CTL_RESPONSE;
    let sent = h.submit(&pkt);
    assert!(sent.is_empty());
    assert_eq!(h.resp.stats.numctlinputresp, 1);

    let sent = h.submit(&[0u8; 8]);
    assert!(sent.is_empty());
    assert_eq!(h.resp.stats.numctltooshort, 1);

    // Version 2 predates the supported range.
    let mut pkt = build_request(2, 0, b"");
    pkt[0] = (2 << 3) | 6;
    let sent = h.submit(&pkt);
    assert!(sent.is_empty());
    assert_eq!(h.resp.stats.numctlbadversion, 1);

    assert_eq!(h.resp.stats.numctlreq, 3);
}

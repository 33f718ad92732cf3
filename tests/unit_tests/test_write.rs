// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use ntp_control_rs::{
    daemon::{ConfigOutcome, restrict::RestrictFlags},
    models::error::CtlError,
    responder::registry::{RW, VarFlags},
};

use crate::unit_tests::common::{
    CTL_KEYID, Harness, assert_error_response, build_request, build_request_auth,
    text_of, token_value,
};

const OP_WRITEVAR: u8 = 3;
const OP_WRITECLOCK: u8 = 5;
const OP_CONFIGURE: u8 = 6;

#[test]
fn writevar_without_mac_is_refused() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(OP_WRITEVAR, 0, b"leap=0"));
    assert_error_response(&sent, CtlError::Permission);
}

#[test]
fn writevar_with_wrong_key_is_refused() {
    let mut h = Harness::new();
    h.keys.insert(8, b"other-secret".to_vec());
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"leap=0", 8, &h.keys);
    let sent = h.submit(&pkt);
    assert_error_response(&sent, CtlError::Permission);
}

#[test]
fn writevar_into_a_peer_is_refused() {
    let mut h = Harness::new();
    h.add_peer(3);
    let pkt = build_request_auth(OP_WRITEVAR, 3, b"leap=0", CTL_KEYID, &h.keys);
    let sent = h.submit(&pkt);
    assert_error_response(&sent, CtlError::Permission);
}

#[test]
fn writevar_leap_stays_a_pinned_noop() {
    let mut h = Harness::new();
    h.state.system.leap = 1;

    // Syntactically valid leap write: vetted, then nothing happens,
    // reported as the unspecified error.
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"leap=0", CTL_KEYID, &h.keys);
    let sent = h.submit(&pkt);
    assert_error_response(&sent, CtlError::Unspec);
    assert_eq!(h.state.system.leap, 1, "leap must not change");
}

#[test]
fn writevar_validates_before_the_noop() {
    let mut h = Harness::new();

    // Read-only built-in.
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"stratum=1", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::Permission);

    // Unknown name.
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"nonesuch=1", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::UnknownVar);

    // Missing and non-decimal values.
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"leap", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::BadFmt);
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"leap=fast", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::BadFmt);

    // Bits outside the writable mask.
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"leap=4", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::BadValue);
}

#[test]
fn writevar_stores_writable_extension_variables() {
    let mut h = Harness::new();
    h.resp.set_sys_var("sitename=old", RW);

    let pkt =
        build_request_auth(OP_WRITEVAR, 0, b"sitename=new-hut", CTL_KEYID, &h.keys);
    let sent = h.submit(&pkt);
    assert_eq!(sent.len(), 1, "successful write returns one response");
    assert_eq!(h.resp.ext_sys().get("sitename"), Some("new-hut"));

    // Observable through READVAR afterwards.
    let text = text_of(&h.submit(&build_request(2, 0, b"sitename")));
    assert_eq!(token_value(&text, "sitename").as_deref(), Some("new-hut"));
}

#[test]
fn writevar_refuses_readonly_extension_variables() {
    let mut h = Harness::new();
    h.resp.set_sys_var("sitename=fixed", VarFlags::DEF);
    let pkt = build_request_auth(OP_WRITEVAR, 0, b"sitename=x", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::Permission);
    assert_eq!(h.resp.ext_sys().get("sitename"), Some("fixed"));
}

#[test]
fn writeclock_always_refuses() {
    let mut h = Harness::new();
    let sent = h.submit(&build_request(OP_WRITECLOCK, 0, b""));
    assert_error_response(&sent, CtlError::Permission);
}

#[test]
fn oversize_value_token_is_badfmt_and_counted() {
    let mut h = Harness::new();
    let long = format!("leap={}", "9".repeat(200));
    let sent = h.submit(&build_request(2, 0, long.as_bytes()));
    assert_error_response(&sent, CtlError::BadFmt);
    assert_eq!(h.resp.stats.numctlbadpkts, 1);
}

#[test]
fn configure_rejects_nonzero_association() {
    let mut h = Harness::new();
    let pkt = build_request_auth(OP_CONFIGURE, 7, b"server x", CTL_KEYID, &h.keys);
    assert_error_response(&h.submit(&pkt), CtlError::BadValue);
}

#[test]
fn configure_refused_under_nomodify() {
    let mut h = Harness::new();
    h.state.default_restrict = RestrictFlags::NOMODIFY;

    let pkt = build_request_auth(
        OP_CONFIGURE,
        0,
        b"server 198.51.100.9",
        CTL_KEYID,
        &h.keys,
    );
    let sent = h.submit(&pkt);
    let text = text_of(&sent);
    assert!(text.contains("prohibited by restrict"), "got: {text}");
    assert_eq!(h.state.system.stats.restricted, 1);
    assert!(h.state.config_log.is_empty(), "nothing reaches the config layer");
}

#[test]
fn configure_delegates_and_reports_success() {
    let mut h = Harness::new();
    let pkt = build_request_auth(
        OP_CONFIGURE,
        0,
        b"server 198.51.100.9 iburst",
        CTL_KEYID,
        &h.keys,
    );
    let sent = h.submit(&pkt);
    let text = text_of(&sent);
    assert!(text.contains("Config Succeeded"), "got: {text}");
    assert_eq!(h.state.config_log.len(), 1);
    // The snippet is newline-terminated on the way in.
    assert_eq!(h.state.config_log[0], "server 198.51.100.9 iburst\n");
}

#[test]
fn configure_reports_collaborator_errors() {
    let mut h = Harness::new();
    h.state.config_outcome = Some(ConfigOutcome {
        ok_count: 0,
        err_count: 2,
        err_msg: "syntax error in line 1".to_owned(),
    });
    let pkt = build_request_auth(OP_CONFIGURE, 0, b"serve bogus", CTL_KEYID, &h.keys);
    let text = text_of(&h.submit(&pkt));
    assert!(text.contains("syntax error in line 1"), "got: {text}");
}

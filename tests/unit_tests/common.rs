// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared harness: an in-memory daemon, a deterministic clock and
//! noise source, and request builders for the control wire format.

use std::{cell::Cell, net::SocketAddr};

use bytes::Bytes;
use ntp_control_rs::{
    daemon::{
        CapturingTransport, InMemoryDaemon,
        clock::{Clock, Noise},
        endpoint::Endpoint,
        keys::{InMemoryKeyStore, KeyStore},
        peer::{Peer, PeerFlags},
    },
    models::{
        error::CtlError,
        header::{CTL_HEADER_LEN, CtlHeader},
        lfp::LfpTimestamp,
        opcode::{CTL_ERROR, CTL_MORE, CTL_RESPONSE},
    },
    responder::{Request, Responder},
};
use zerocopy::FromBytes as ZFromBytes;

/// Key id the harness responder accepts for authenticated opcodes.
pub const CTL_KEYID: u32 = 7;
pub const CTL_SECRET: &[u8] = b"mode6-secret";

pub fn client_addr() -> SocketAddr {
    "192.0.2.33:50123".parse().expect("addr")
}

/// Receive timestamp all harness requests carry unless advanced.
pub fn base_time() -> LfpTimestamp {
    LfpTimestamp::new(3_950_000_000, 0x2000_0000)
}

pub struct TestClock {
    pub now: Cell<LfpTimestamp>,
    pub uptime: Cell<u64>,
}

impl Clock for TestClock {
    fn now(&self) -> LfpTimestamp {
        self.now.get()
    }

    fn uptime(&self) -> u64 {
        self.uptime.get()
    }
}

/// Deterministic LCG noise so randomized field order stays stable
/// per test run.
pub struct SeqNoise(pub u32);

impl Noise for SeqNoise {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0
    }
}

pub struct Harness {
    pub resp: Responder,
    pub state: InMemoryDaemon,
    pub keys: InMemoryKeyStore,
    pub clock: TestClock,
    pub noise: SeqNoise,
}

impl Harness {
    pub fn new() -> Self {
        let mut keys = InMemoryKeyStore::new();
        keys.insert(CTL_KEYID, CTL_SECRET.to_vec());

        let mut state = InMemoryDaemon::new();
        state
            .endpoints
            .push(Endpoint::new(0, "lo", "127.0.0.1:123".parse().expect("addr")));

        Self {
            resp: Responder::new(CTL_KEYID, 16),
            state,
            keys,
            clock: TestClock {
                now: Cell::new(base_time()),
                uptime: Cell::new(1000),
            },
            noise: SeqNoise(0xfeed_1234),
        }
    }

    /// Seed one association with recognizable values.
    pub fn add_peer(&mut self, associd: u16) -> &mut Peer {
        let mut peer = Peer::new(
            associd,
            format!("203.0.113.{}:123", associd & 0xff).parse().expect("addr"),
        );
        peer.flags = PeerFlags::CONFIG;
        peer.stratum = 2;
        peer.reach = 0xff;
        // Upstream source address; rendered dotted-quad at stratum 2.
        peer.refid = u32::from_be_bytes([198, 51, 100, 1]);
        self.state.peers.push(peer);
        self.state.peers.last_mut().expect("just pushed")
    }

    pub fn submit(&mut self, payload: &[u8]) -> Vec<Vec<u8>> {
        self.submit_from(client_addr(), payload)
    }

    pub fn submit_from(&mut self, src: SocketAddr, payload: &[u8]) -> Vec<Vec<u8>> {
        let mut transport = CapturingTransport::default();
        let req = Request {
            src,
            endpoint: Some(0),
            payload: Bytes::copy_from_slice(payload),
            recv_time: self.clock.now.get(),
        };
        self.resp
            .process(
                &req,
                &mut self.state,
                &self.keys,
                &self.clock,
                &mut self.noise,
                &mut transport,
            )
            .expect("process");
        transport.sent
    }
}

/// Build an unauthenticated request: version 4, sequence 1, data
/// padded to a 4-octet multiple.
pub fn build_request(opcode: u8, associd: u16, data: &[u8]) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(CTL_HEADER_LEN + data.len() + 3);
    pkt.push(0x26); // leap 0, version 4, mode 6
    pkt.push(opcode & 0x1f);
    pkt.extend_from_slice(&1u16.to_be_bytes()); // sequence
    pkt.extend_from_slice(&0u16.to_be_bytes()); // status
    pkt.extend_from_slice(&associd.to_be_bytes());
    pkt.extend_from_slice(&0u16.to_be_bytes()); // offset
    pkt.extend_from_slice(&(data.len() as u16).to_be_bytes());
    pkt.extend_from_slice(data);
    while pkt.len() % 4 != 0 {
        pkt.push(0);
    }
    pkt
}

/// Build an authenticated request: padded to the 8-octet MAC
/// boundary, key id + MD5 digest appended.
pub fn build_request_auth(
    opcode: u8,
    associd: u16,
    data: &[u8],
    keyid: u32,
    keys: &InMemoryKeyStore,
) -> Vec<u8> {
    let mut pkt = build_request(opcode, associd, data);
    while pkt.len() % 8 != 0 {
        pkt.push(0);
    }
    let mac = keys.compute_mac(keyid, &pkt).expect("known key");
    pkt.extend_from_slice(&mac);
    pkt
}

pub fn header_of(datagram: &[u8]) -> CtlHeader {
    CtlHeader::read_from_bytes(&datagram[..CTL_HEADER_LEN]).expect("header")
}

pub fn data_of(datagram: &[u8]) -> &[u8] {
    let h = header_of(datagram);
    &datagram[CTL_HEADER_LEN..CTL_HEADER_LEN + h.count.get() as usize]
}

/// Concatenated data areas of all fragments, as text.
pub fn text_of(fragments: &[Vec<u8>]) -> String {
    let mut out = String::new();
    for frag in fragments {
        out.push_str(&String::from_utf8_lossy(data_of(frag)));
    }
    out
}

/// Split a text payload into `(tag, value)` pairs; quotes stripped.
pub fn tokens(text: &str) -> Vec<(String, String)> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|item| match item.split_once('=') {
            Some((tag, value)) => {
                (tag.to_owned(), value.trim_matches('"').to_owned())
            },
            None => (item.to_owned(), String::new()),
        })
        .collect()
}

pub fn token_value(text: &str, tag: &str) -> Option<String> {
    tokens(text)
        .into_iter()
        .find(|(t, _)| t == tag)
        .map(|(_, v)| v)
}

pub fn assert_error_response(fragments: &[Vec<u8>], code: CtlError) {
    assert_eq!(fragments.len(), 1, "error responses are a single datagram");
    let h = header_of(&fragments[0]);
    let op = h.r_m_e_op.raw();
    assert_ne!(op & CTL_RESPONSE, 0, "response bit must be set");
    assert_ne!(op & CTL_ERROR, 0, "error bit must be set");
    assert_eq!(op & CTL_MORE, 0, "error responses never set More");
    assert_eq!(h.status.get() >> 8, code as u16, "error code mismatch");
    assert_eq!(h.count.get(), 0, "error responses carry no data");
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytes::Bytes;
use ntp_control_rs::{
    cfg::{
        cli::{config_path_from_args, resolve_config_path},
        config::Config,
        logger::{init_default_logger, init_logger},
    },
    daemon::{
        DaemonView, InMemoryDaemon, Transport,
        clock::{Clock, OsNoise, SystemClock},
        endpoint::Endpoint,
        keys::InMemoryKeyStore,
        mru::MruView,
    },
    responder::{Request, Responder},
};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

struct UdpTransport<'a> {
    socket: &'a UdpSocket,
}

impl Transport for UdpTransport<'_> {
    fn send(
        &mut self,
        dst: SocketAddr,
        _local_endpoint: Option<usize>,
        datagram: &[u8],
    ) -> Result<()> {
        // The socket is writable in practice; a full send buffer just
        // drops the fragment, as UDP would anyway.
        match self.socket.try_send_to(datagram, dst) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                warn!(%dst, "send buffer full, fragment dropped");
                Ok(())
            },
            Err(e) => Err(e).context("send failed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = resolve_config_path(&config_path_from_args())
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let _log_guard = match &cfg.daemon.logger_config {
        Some(path) => Some(init_logger(path)?),
        None => {
            init_default_logger()?;
            None
        },
    };

    // Key secrets stay out of the log.
    debug!(
        daemon = %serde_json::to_string(&cfg.daemon).unwrap_or_default(),
        control_keyid = cfg.control.control_keyid,
        nonce_timeout = cfg.control.nonce_timeout_secs,
        "effective configuration"
    );

    let socket = UdpSocket::bind(cfg.daemon.listen)
        .await
        .with_context(|| format!("failed to bind {}", cfg.daemon.listen))?;
    let local = socket.local_addr().context("no local addr")?;
    info!(%local, "control socket up");

    let clock = SystemClock::new();
    let mut noise = OsNoise;
    let mut keys = InMemoryKeyStore::new();
    for key in &cfg.control.keys {
        keys.insert(key.id, key.secret.as_bytes().to_vec());
    }

    let mut responder =
        Responder::new(cfg.control.control_keyid, cfg.control.nonce_timeout_secs);
    let mut state = InMemoryDaemon::new();
    state.endpoints.push(Endpoint::new(0, "udp0", local));

    let mut buf = [0u8; 2048];
    loop {
        let (len, src) = socket.recv_from(&mut buf).await.context("recv failed")?;
        let now = clock.now();

        // Every arriving packet feeds the MRU list before handling.
        let rs = state.restrict_mask(&src).bits();
        let vn_mode = buf[..len].first().copied().unwrap_or(0);
        state.mru.observe(src, now, vn_mode, rs, 0);
        state.system.mru.depth = state.mru.len() as u64;
        state.system.stats.received += 1;

        let req = Request {
            src,
            endpoint: Some(0),
            payload: Bytes::copy_from_slice(&buf[..len]),
            recv_time: now,
        };
        let mut transport = UdpTransport { socket: &socket };
        responder.process(
            &req,
            &mut state,
            &keys,
            &clock,
            &mut noise,
            &mut transport,
        )?;
    }
}

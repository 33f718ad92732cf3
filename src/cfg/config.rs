// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, net::SocketAddr, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::responder::nonce::NONCE_TIMEOUT;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Socket and identity of the daemon itself.
    pub daemon: DaemonConfig,
    /// Control-protocol knobs (authentication, nonce window).
    pub control: ControlConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DaemonConfig {
    /// Local address the control socket binds.
    pub listen: SocketAddr,
    /// Optional logger configuration file (YAML); stderr when unset.
    #[serde(default)]
    pub logger_config: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ControlConfig {
    /// Key id WRITEVAR/CONFIGURE/ordered-list requests must carry.
    pub control_keyid: u32,
    /// Symmetric key table.
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    /// Seconds an MRU nonce stays valid.
    #[serde(default = "default_nonce_timeout")]
    pub nonce_timeout_secs: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct KeyConfig {
    pub id: u32,
    /// Shared secret for the MD5 keyed digest.
    pub secret: String,
}

fn default_nonce_timeout() -> u32 {
    NONCE_TIMEOUT
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns
    /// the ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.control.nonce_timeout_secs > 0,
            "nonce_timeout_secs must be > 0"
        );
        for key in &self.control.keys {
            ensure!(key.id != 0, "key id 0 is reserved");
            ensure!(!key.secret.is_empty(), "key {} has an empty secret", key.id);
        }
        if self.control.control_keyid != 0 {
            ensure!(
                self.control
                    .keys
                    .iter()
                    .any(|k| k.id == self.control.control_keyid),
                "control_keyid {} is not in the key table",
                self.control.control_keyid
            );
        }
        Ok(())
    }
}

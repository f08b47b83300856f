// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Pachyderm client configuration (`~/.pachyderm/config.json`).
//!
//! When the file exists, its active context supplies the server address and
//! session token, overriding whatever the URL or constructor passed.

use crate::error::{Error, Result};
use crate::location::RepoLocation;
use diagnostics::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "PACH_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PachydermConfig {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub v2: Option<ConfigV2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigV2 {
    #[serde(default)]
    pub active_context: Option<String>,
    #[serde(default)]
    pub contexts: HashMap<String, Context>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub pachd_address: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl PachydermConfig {
    /// `$PACH_CONFIG`, else `~/.pachyderm/config.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".pachyderm").join("config.json"))
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        serde_json::from_slice(&raw).map_err(|e| {
            Error::Config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Load the default config file if there is one.
    pub fn load() -> Result<Option<Self>> {
        let Some(path) = Self::default_path() else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        let display = path.display().to_string();
        debug!("Loading Pachyderm config from {path}", path: display);
        Self::load_from(&path).map(Some)
    }

    #[must_use]
    pub fn active_context(&self) -> Option<&Context> {
        let v2 = self.v2.as_ref()?;
        let name = v2.active_context.as_ref()?;
        v2.contexts.get(name)
    }

    /// Apply the active context's address and token to `location`.
    ///
    /// Without an active context the location is returned unchanged.
    pub fn apply(&self, location: RepoLocation) -> Result<RepoLocation> {
        let Some(context) = self.active_context() else {
            return Ok(location);
        };

        let mut location = location;
        if let Some(address) = context.pachd_address.as_deref() {
            let (host, port) = parse_pachd_address(address)?;
            location = location.with_host(host);
            if let Some(port) = port {
                location = location.with_port(port);
            }
        }
        if let Some(token) = context.session_token.as_deref() {
            location = location.with_auth_token(token);
        }
        Ok(location)
    }
}

/// Split a `pachd_address` such as `grpc://localhost:30650` into host and port.
fn parse_pachd_address(address: &str) -> Result<(String, Option<u16>)> {
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("grpc://{address}")
    };
    let parsed = url::Url::parse(&with_scheme)
        .map_err(|e| Error::Config(format!("invalid pachd_address '{address}': {e}")))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Config(format!("pachd_address '{address}' has no host")))?;
    Ok((host.to_string(), parsed.port()))
}

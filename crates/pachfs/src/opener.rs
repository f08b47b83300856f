// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! URL-based filesystem opening.
//!
//! Openers are registered at compile time in the `FS_OPENERS` distributed
//! slice, keyed by URL scheme. The table is fixed once the process starts.

// linkme uses #[link_section] which is considered unsafe by rustc
#![allow(unsafe_code)]

use crate::adapter::RepoAdapter;
use crate::client::{Connector, RemoteClient};
use crate::config::PachydermConfig;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::location::{self, PachUrl, RepoLocation};
use crate::s3::S3GatewayConnector;
use diagnostics::*;
use linkme::distributed_slice;
use std::sync::Arc;

/// Opener entry for distributed slice registration
pub struct FsOpenerEntry {
    /// URL scheme handled, lowercase (e.g. "pach")
    pub scheme: &'static str,
    pub description: &'static str,
    /// Build a filesystem from the full URL, connecting through `connector`
    pub open: fn(url: &str, connector: &dyn Connector) -> Result<Box<dyn FileSystem>>,
}

/// Distributed slice containing all registered openers
/// linkme's distributed_slice uses #[link_section] which is considered unsafe
#[allow(unsafe_code)]
#[allow(clippy::declare_interior_mutable_const)]
#[distributed_slice]
pub static FS_OPENERS: [FsOpenerEntry];

pub struct OpenerRegistry;

impl OpenerRegistry {
    #[must_use]
    pub fn get_opener(scheme: &str) -> Option<&'static FsOpenerEntry> {
        FS_OPENERS.iter().find(|entry| entry.scheme == scheme)
    }

    #[must_use]
    pub fn list_schemes() -> Vec<&'static str> {
        FS_OPENERS.iter().map(|entry| entry.scheme).collect()
    }
}

/// Register a filesystem opener for a URL scheme
///
/// Usage:
/// ```ignore
/// register_fs_opener!(
///     scheme: "pach",
///     description: "Pachyderm repository branch",
///     open: open_pach
/// );
/// ```
#[macro_export]
macro_rules! register_fs_opener {
    (scheme: $scheme:expr, description: $description:expr, open: $open:expr) => {
        paste::paste! {
            #[allow(unsafe_code)]
            #[linkme::distributed_slice($crate::opener::FS_OPENERS)]
            static [<FS_OPENER_ $scheme:snake:upper>]: $crate::opener::FsOpenerEntry =
                $crate::opener::FsOpenerEntry {
                    scheme: $scheme,
                    description: $description,
                    open: $open,
                };
        }
    };
}

/// Applies the Pachyderm config file's active context before connecting.
pub struct ConfiguredConnector<C> {
    config: PachydermConfig,
    inner: C,
}

impl<C: Connector> ConfiguredConnector<C> {
    pub fn new(config: PachydermConfig, inner: C) -> Self {
        Self { config, inner }
    }
}

impl<C: Connector> Connector for ConfiguredConnector<C> {
    fn connect(&self, location: &RepoLocation) -> Result<Arc<dyn RemoteClient>> {
        let location = self.config.apply(location.clone())?;
        self.inner.connect(&location)
    }
}

/// Open a filesystem URL over the network.
///
/// Connects through the S3 gateway; when a Pachyderm config file exists, its
/// active context overrides the host, port and credential in the URL.
pub fn open_fs(url: &str) -> Result<Box<dyn FileSystem>> {
    match PachydermConfig::load()? {
        Some(config) => open_fs_with(url, &ConfiguredConnector::new(config, S3GatewayConnector)),
        None => open_fs_with(url, &S3GatewayConnector),
    }
}

/// Open a filesystem URL with a caller-supplied connector.
pub fn open_fs_with(url: &str, connector: &dyn Connector) -> Result<Box<dyn FileSystem>> {
    let (scheme, _) = location::split_scheme(url)?;
    let entry =
        OpenerRegistry::get_opener(&scheme).ok_or_else(|| Error::UnsupportedScheme(scheme.clone()))?;
    debug!("Opening {scheme} filesystem", scheme: scheme.as_str());
    (entry.open)(url, connector)
}

fn open_pach(url: &str, connector: &dyn Connector) -> Result<Box<dyn FileSystem>> {
    let parsed = PachUrl::parse(url)?;
    let client = connector.connect(&parsed.location)?;
    let location = client.location().clone();
    let adapter = RepoAdapter::new(location, client).with_root(&parsed.dir_path)?;
    info!("Opened {fs}", fs: adapter.to_string());
    Ok(Box::new(adapter))
}

register_fs_opener!(
    scheme: "pach",
    description: "Pachyderm repository branch",
    open: open_pach
);

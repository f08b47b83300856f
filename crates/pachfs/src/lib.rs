// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Pachyderm repository branches as a generic filesystem.
//!
//! [`RepoAdapter`] implements [`FileSystem`] over one (project, repo, branch)
//! through a [`RemoteClient`]. Two clients are provided: the in-process
//! [`MemoryRepository`] and [`S3GatewayClient`], which talks to Pachyderm's
//! S3 gateway. Filesystems can also be opened from `pach://` URLs through
//! [`open_fs`].

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod fs;
pub mod handle;
pub mod info;
pub mod location;
pub mod memory;
pub mod mode;
pub mod opener;
pub mod path;
pub mod s3;

#[cfg(test)]
mod tests;

pub use adapter::{DIR_MARKER, RepoAdapter};
pub use client::{ClientError, ClientResult, Connector, FileType, RemoteClient, RemoteFileInfo};
pub use config::PachydermConfig;
pub use error::{Error, Result};
pub use fs::{BinaryFile, FileSystem, FsMeta};
pub use handle::RepoFile;
pub use info::{Info, ResourceType};
pub use location::{PachUrl, RepoLocation};
pub use memory::{FaultPoint, MemoryClient, MemoryRepository};
pub use mode::Mode;
pub use opener::{FS_OPENERS, FsOpenerEntry, OpenerRegistry, open_fs, open_fs_with};
pub use s3::{S3GatewayClient, S3GatewayConnector};

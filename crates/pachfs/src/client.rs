// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The seam between the adapter and a versioned-repository client.
//!
//! A client is bound to one (project, repo, branch). Paths handed to it are
//! absolute, normalized repository paths (`/dir/file`). Each `put_file` and
//! `delete_file` produces one commit on the bound branch; reads see the
//! branch head at the time of the call.

use crate::error::Result;
use crate::location::RepoLocation;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Content of one file, pulled chunk by chunk.
pub type ByteStream = BoxStream<'static, ClientResult<Bytes>>;

/// Faults reported by a remote client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ClientError {
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ClientError::Transport(err.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// One entry as reported by the remote system.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFileInfo {
    /// Absolute repository path of the entry
    pub path: String,
    pub file_type: FileType,
    pub size_bytes: u64,
    /// Commit time of the change that produced this entry, if known
    pub committed: Option<DateTime<Utc>>,
}

impl RemoteFileInfo {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// The namespace every call is scoped to.
    fn location(&self) -> &RepoLocation;

    /// Open the content of a file. Fails with `NotFound` before any bytes
    /// are produced if the file does not exist at the branch head.
    async fn get_file(&self, path: &str) -> ClientResult<ByteStream>;

    /// Immediate children of a directory.
    ///
    /// `NotFound` if nothing exists at `path`, `NotADirectory` if it is a file.
    async fn list_file(&self, path: &str) -> ClientResult<Vec<RemoteFileInfo>>;

    /// Describe a single entry.
    async fn inspect_file(&self, path: &str) -> ClientResult<RemoteFileInfo>;

    /// Replace the content at `path`, creating implied parent directories.
    async fn put_file(&self, path: &str, data: Bytes) -> ClientResult<()>;

    /// Delete a file, or a directory with everything below it.
    async fn delete_file(&self, path: &str) -> ClientResult<()>;

    /// Copy one file. Clients without a native copy read then write; the
    /// default does exactly that.
    async fn copy_file(&self, src: &str, dst: &str) -> ClientResult<()> {
        let stream = self.get_file(src).await?;
        let content = stream
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        self.put_file(dst, content.freeze()).await
    }
}

/// Builds a client for a location. Used by the opener registry so that URL
/// opening does not hard-wire one transport.
pub trait Connector: Send + Sync {
    fn connect(&self, location: &RepoLocation) -> Result<Arc<dyn RemoteClient>>;
}

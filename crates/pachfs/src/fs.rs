// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The generic filesystem capability set.
//!
//! Implementors provide the required operations; everything else is composed
//! from them. Paths are slash-separated strings relative to the filesystem's
//! own root.

use crate::error::{Error, Result};
use crate::info::Info;
use crate::mode::Mode;
use crate::path;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// An open binary stream returned by [`FileSystem::openbin`].
#[async_trait]
pub trait BinaryFile: AsyncRead + AsyncWrite + Send + Unpin {
    fn path(&self) -> &str;

    fn mode(&self) -> Mode;

    fn is_closed(&self) -> bool;

    /// Release the stream, committing buffered writes.
    async fn close(&mut self) -> Result<()>;
}

/// Feature flags reported by [`FileSystem::meta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FsMeta {
    pub case_insensitive: bool,
    pub network: bool,
    pub read_only: bool,
    pub thread_safe: bool,
    pub supports_rename: bool,
    pub invalid_path_chars: String,
    pub max_path_length: Option<usize>,
    pub max_sys_path_length: Option<usize>,
}

impl Default for FsMeta {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            network: false,
            read_only: false,
            thread_safe: false,
            supports_rename: false,
            invalid_path_chars: "\0".to_string(),
            max_path_length: None,
            max_sys_path_length: None,
        }
    }
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Metadata of one resource.
    async fn getinfo(&self, path: &str) -> Result<Info>;

    /// Names of the children of a directory.
    async fn listdir(&self, path: &str) -> Result<Vec<String>>;

    /// Metadata of the children of a directory.
    async fn scandir(&self, path: &str) -> Result<Vec<Info>>;

    /// Open a binary stream. `mode` is an `open()`-style string such as
    /// `"rb"` or `"wb"`; text modes are rejected.
    async fn openbin(&self, path: &str, mode: &str) -> Result<Box<dyn BinaryFile>>;

    /// Create a directory whose parent exists.
    async fn makedir(&self, path: &str, recreate: bool) -> Result<()>;

    async fn remove(&self, path: &str) -> Result<()>;

    /// Remove an empty directory.
    async fn removedir(&self, path: &str) -> Result<()>;

    fn meta(&self) -> FsMeta {
        FsMeta::default()
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match self.getinfo(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn isdir(&self, path: &str) -> Result<bool> {
        match self.getinfo(path).await {
            Ok(info) => Ok(info.is_dir()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn isfile(&self, path: &str) -> Result<bool> {
        match self.getinfo(path).await {
            Ok(info) => Ok(info.is_file()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// True if a directory has no children.
    async fn isempty(&self, path: &str) -> Result<bool> {
        Ok(self.scandir(path).await?.is_empty())
    }

    async fn readbytes(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.openbin(path, "rb").await?;
        let mut content = Vec::new();
        let read = file.read_to_end(&mut content).await.map_err(Error::from_io);
        file.close().await?;
        _ = read?;
        Ok(content)
    }

    /// Replace the content of a file. Durable once this returns.
    async fn writebytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut file = self.openbin(path, "wb").await?;
        file.write_all(data).await.map_err(Error::from_io)?;
        file.close().await
    }

    /// Stream a file into `writer`, returning the byte count.
    async fn download(
        &self,
        path: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        let mut file = self.openbin(path, "rb").await?;
        let copied = tokio::io::copy(&mut file, writer)
            .await
            .map_err(Error::from_io);
        file.close().await?;
        copied
    }

    /// Fill a file from `reader`, returning the byte count.
    async fn upload(
        &self,
        path: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64> {
        let mut file = self.openbin(path, "wb").await?;
        let copied = tokio::io::copy(reader, &mut file)
            .await
            .map_err(Error::from_io)?;
        file.close().await?;
        Ok(copied)
    }

    /// Copy a file.
    ///
    /// Not atomic: the destination is written as a separate step after the
    /// preconditions are checked.
    async fn copy(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        self.check_transfer(src, dst, overwrite).await?;
        let content = self.readbytes(src).await?;
        self.writebytes(dst, &content).await
    }

    /// Move a file: copy, then remove the source.
    ///
    /// Not atomic. A fault after the copy leaves both the destination and the
    /// source in place.
    async fn move_file(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        if path::normalize(src)? == path::normalize(dst)? {
            return self.check_transfer(src, dst, overwrite).await;
        }
        self.copy(src, dst, overwrite).await?;
        self.remove(src).await
    }

    /// Preconditions shared by copy and move, checked before any write.
    async fn check_transfer(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let info = self.getinfo(src).await?;
        if info.is_dir() {
            return Err(Error::file_expected(src));
        }
        let dst_norm = path::normalize(dst)?;
        let parent = path::dirname(&dst_norm);
        match self.getinfo(parent).await {
            Ok(info) if info.is_dir() => {}
            Ok(_) => return Err(Error::directory_expected(parent)),
            Err(e) => return Err(e),
        }
        match self.getinfo(&dst_norm).await {
            Ok(existing) if existing.is_dir() => Err(Error::file_expected(dst)),
            Ok(_) if !overwrite => Err(Error::DestinationExists(dst.to_string())),
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Every file below `path`, breadth first, as absolute paths.
    async fn walk_files(&self, path: &str) -> Result<Vec<String>> {
        let mut pending = VecDeque::from([path::normalize(path)?]);
        let mut files = Vec::new();
        while let Some(dir) = pending.pop_front() {
            for entry in self.scandir(&dir).await? {
                let child = path::join(&dir, entry.name());
                if entry.is_dir() {
                    pending.push_back(child);
                } else {
                    files.push(child);
                }
            }
        }
        Ok(files)
    }

    /// Set metadata on a resource. The resource must exist; namespaces the
    /// filesystem cannot store are ignored.
    async fn setinfo(&self, path: &str, _info: &serde_json::Value) -> Result<()> {
        _ = self.getinfo(path).await?;
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! A filesystem over one branch of a versioned repository.
//!
//! Every caller path is normalized and then resolved against the adapter's
//! root directory to form the repository key handed to the client. Results
//! and faults always carry the caller's path, never the key.
//!
//! Directories are implied by the files below them, as in PFS. `makedir`
//! writes a `.empty` marker so that a new directory is visible before it has
//! files; markers never appear in listings. Removing the last file in a
//! directory without a marker makes the directory disappear.

use crate::client::{RemoteClient, RemoteFileInfo};
use crate::error::{Error, Result};
use crate::fs::{BinaryFile, FileSystem, FsMeta};
use crate::handle::RepoFile;
use crate::info::Info;
use crate::location::RepoLocation;
use crate::mode::Mode;
use crate::path;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use diagnostics::*;
use futures::TryStreamExt;
use std::sync::Arc;

/// Name of the placeholder file that keeps an empty directory alive.
pub const DIR_MARKER: &str = ".empty";

/// A caller path and the repository key it resolves to.
struct Resolved {
    path: String,
    key: String,
}

/// A [`FileSystem`] over one branch, optionally scoped to a directory.
///
/// Not thread-safe unless the remote client is: the adapter takes no locks,
/// so concurrent callers must serialize their calls. Moves are not atomic;
/// the copy and the removal of the source are separate commits.
pub struct RepoAdapter {
    location: RepoLocation,
    client: Arc<dyn RemoteClient>,
    root: String,
    create_parents: bool,
}

impl RepoAdapter {
    #[must_use]
    pub fn new(location: RepoLocation, client: Arc<dyn RemoteClient>) -> Self {
        Self {
            location,
            client,
            root: path::SEPARATOR.to_string(),
            create_parents: false,
        }
    }

    /// Scope the adapter to a directory inside the repository.
    pub fn with_root<S: AsRef<str>>(mut self, dir_path: S) -> Result<Self> {
        self.root = path::normalize(dir_path)?;
        Ok(self)
    }

    /// Let write handles bring missing parent directories into being.
    #[must_use]
    pub fn with_create_parents(mut self, create_parents: bool) -> Self {
        self.create_parents = create_parents;
        self
    }

    #[must_use]
    pub fn location(&self) -> &RepoLocation {
        &self.location
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// Marker names are reserved and never addressable by callers.
    fn resolve(&self, target: &str) -> Result<Resolved> {
        let path = path::normalize(target)?;
        if path.split(path::SEPARATOR).any(|part| part == DIR_MARKER) {
            return Err(Error::InvalidPath(path));
        }
        let key = path::join(&self.root, path::strip_root(&path));
        Ok(Resolved { path, key })
    }

    /// Inspect a resolved path; `None` when nothing lives there.
    async fn lookup(&self, target: &Resolved) -> Result<Option<RemoteFileInfo>> {
        debug!("Inspect {key}", key: target.key.as_str());
        match self.client.inspect_file(&target.key).await {
            Ok(info) => Ok(Some(info)),
            Err(e) => match Error::from_client(&target.path, e) {
                Error::ResourceNotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    /// The parent of `target` must be an existing directory.
    async fn require_parent(&self, target: &Resolved) -> Result<()> {
        let parent = self.resolve(path::dirname(&target.path))?;
        if path::is_root(&parent.path) {
            return Ok(());
        }
        match self.lookup(&parent).await? {
            Some(info) if info.is_dir() => Ok(()),
            Some(_) => Err(Error::directory_expected(&parent.path)),
            None => Err(Error::not_found(&parent.path)),
        }
    }

    async fn fetch(&self, target: &Resolved) -> Result<Bytes> {
        let stream = self
            .client
            .get_file(&target.key)
            .await
            .map_err(|e| Error::from_client(&target.path, e))?;
        let content = stream
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| Error::from_client(&target.path, e))?;
        Ok(content.freeze())
    }

    /// Open a path, returning the concrete handle type.
    pub async fn open(&self, target: &str, mode: &str) -> Result<RepoFile> {
        let mode = Mode::parse(mode)?;
        mode.validate_bin()?;
        let target = self.resolve(target)?;
        if path::is_root(&target.path) {
            return Err(Error::file_expected(&target.path));
        }

        let existing = self.lookup(&target).await?;
        if existing.as_ref().is_some_and(RemoteFileInfo::is_dir) {
            return Err(Error::file_expected(&target.path));
        }

        if !mode.writing() {
            if existing.is_none() {
                return Err(Error::not_found(&target.path));
            }
            debug!("Open {key} for reading", key: target.key.as_str());
            let stream = self
                .client
                .get_file(&target.key)
                .await
                .map_err(|e| Error::from_client(&target.path, e))?;
            return Ok(RepoFile::reader(target.path, mode, stream));
        }

        let initial = match existing {
            Some(_) if mode.exclusive() => {
                return Err(Error::FileExists(target.path));
            }
            Some(_) if mode.truncate() => Vec::new(),
            Some(_) => self.fetch(&target).await?.to_vec(),
            None if !mode.create() => return Err(Error::not_found(&target.path)),
            None => {
                if !self.create_parents {
                    self.require_parent(&target).await?;
                }
                Vec::new()
            }
        };

        debug!("Open {key} for writing ({mode})", key: target.key.as_str(), mode: mode.to_string());
        Ok(RepoFile::writer(
            target.path,
            mode,
            self.client.clone(),
            target.key,
            initial,
        ))
    }

    fn entry_info(name: &str, remote: &RemoteFileInfo) -> Info {
        if remote.is_dir() {
            Info::directory(name, remote.committed)
        } else {
            Info::file(name, remote.size_bytes, remote.committed)
        }
    }
}

#[async_trait]
impl FileSystem for RepoAdapter {
    async fn getinfo(&self, target: &str) -> Result<Info> {
        let target = self.resolve(target)?;
        if path::is_root(&target.path) {
            return Ok(Info::directory("", None));
        }
        let remote = self
            .lookup(&target)
            .await?
            .ok_or_else(|| Error::not_found(&target.path))?;
        Ok(Self::entry_info(path::basename(&target.path), &remote))
    }

    async fn listdir(&self, target: &str) -> Result<Vec<String>> {
        Ok(self
            .scandir(target)
            .await?
            .into_iter()
            .map(|info| info.name().to_string())
            .collect())
    }

    async fn scandir(&self, target: &str) -> Result<Vec<Info>> {
        let target = self.resolve(target)?;
        debug!("List {key}", key: target.key.as_str());
        let entries = self
            .client
            .list_file(&target.key)
            .await
            .map_err(|e| Error::from_client(&target.path, e))?;
        Ok(entries
            .iter()
            .filter(|entry| path::basename(&entry.path) != DIR_MARKER)
            .map(|entry| Self::entry_info(path::basename(&entry.path), entry))
            .collect())
    }

    async fn openbin(&self, target: &str, mode: &str) -> Result<Box<dyn BinaryFile>> {
        Ok(Box::new(self.open(target, mode).await?))
    }

    async fn makedir(&self, target: &str, recreate: bool) -> Result<()> {
        let target = self.resolve(target)?;
        if path::is_root(&target.path) {
            return if recreate {
                Ok(())
            } else {
                Err(Error::DirectoryExists(target.path))
            };
        }
        match self.lookup(&target).await? {
            Some(info) if info.is_dir() && recreate => return Ok(()),
            Some(_) => return Err(Error::DirectoryExists(target.path)),
            None => {}
        }
        self.require_parent(&target).await?;

        let marker = path::join(&target.key, DIR_MARKER);
        self.client
            .put_file(&marker, Bytes::new())
            .await
            .map_err(|e| Error::from_client(&target.path, e))?;
        info!("Created directory {path}", path: target.path.as_str());
        Ok(())
    }

    async fn remove(&self, target: &str) -> Result<()> {
        let target = self.resolve(target)?;
        if path::is_root(&target.path) {
            return Err(Error::file_expected(&target.path));
        }
        match self.lookup(&target).await? {
            None => return Err(Error::not_found(&target.path)),
            Some(info) if info.is_dir() => return Err(Error::file_expected(&target.path)),
            Some(_) => {}
        }
        self.client
            .delete_file(&target.key)
            .await
            .map_err(|e| Error::from_client(&target.path, e))?;
        info!("Removed {path}", path: target.path.as_str());
        Ok(())
    }

    async fn removedir(&self, target: &str) -> Result<()> {
        let target = self.resolve(target)?;
        if path::is_root(&target.path) {
            return Err(Error::RemoveRoot);
        }
        match self.lookup(&target).await? {
            None => return Err(Error::not_found(&target.path)),
            Some(info) if !info.is_dir() => {
                return Err(Error::directory_expected(&target.path));
            }
            Some(_) => {}
        }
        if !self.isempty(&target.path).await? {
            return Err(Error::DirectoryNotEmpty(target.path));
        }
        self.client
            .delete_file(&target.key)
            .await
            .map_err(|e| Error::from_client(&target.path, e))?;
        info!("Removed directory {path}", path: target.path.as_str());
        Ok(())
    }

    fn meta(&self) -> FsMeta {
        FsMeta {
            network: true,
            ..FsMeta::default()
        }
    }

    /// Copy a file using the client's copy primitive.
    ///
    /// Not atomic: preconditions are checked first, then the destination is
    /// written by a separate remote commit.
    async fn copy(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        self.check_transfer(src, dst, overwrite).await?;
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        if from.key == to.key {
            return Ok(());
        }
        self.client
            .copy_file(&from.key, &to.key)
            .await
            .map_err(|e| Error::from_client(&from.path, e))?;
        info!("Copied {src} to {dst}", src: from.path.as_str(), dst: to.path.as_str());
        Ok(())
    }
}

impl std::fmt::Display for RepoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<pachfs '{}'>",
            path::join(self.location.repo(), path::strip_root(&self.root))
        )
    }
}

impl std::fmt::Debug for RepoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoAdapter")
            .field("location", &self.location)
            .field("root", &self.root)
            .field("create_parents", &self.create_parents)
            .finish()
    }
}

// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory versioned repository.
//!
//! Models the parts of PFS the adapter relies on: branches hold a history of
//! immutable commits, every put or delete appends one commit to the branch
//! head, and directories exist only as prefixes of file paths. Used by tests
//! and by embedders that want a scratch repository.

use crate::client::{
    ByteStream, ClientError, ClientResult, Connector, FileType, RemoteClient, RemoteFileInfo,
};
use crate::error::Result;
use crate::location::RepoLocation;
use crate::path;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Size of the chunks `get_file` streams out.
const CHUNK_SIZE: usize = 64 * 1024;

/// One file as stored in a commit.
#[derive(Debug, Clone)]
struct StoredFile {
    content: Bytes,
    committed: DateTime<Utc>,
}

/// Immutable snapshot of a branch's file tree.
#[derive(Debug, Default)]
struct Commit {
    files: BTreeMap<String, StoredFile>,
}

type Snapshot = Arc<Commit>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BranchKey {
    project: String,
    repo: String,
    branch: String,
}

impl BranchKey {
    fn of(location: &RepoLocation) -> Self {
        Self {
            project: location.project().to_string(),
            repo: location.repo().to_string(),
            branch: location.branch().to_string(),
        }
    }
}

/// Remote calls a one-shot fault can be armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Get,
    List,
    Inspect,
    Put,
    Delete,
    Copy,
}

#[derive(Default)]
struct State {
    auth_token: Option<String>,
    offline: bool,
    armed: HashSet<FaultPoint>,
    // Full commit history per branch; the last entry is the head
    branches: HashMap<BranchKey, Vec<Snapshot>>,
}

/// Shared handle to an in-memory repository server.
#[derive(Clone, Default)]
pub struct MemoryRepository(Arc<Mutex<State>>);

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository that requires callers to present `token` as their credential.
    #[must_use]
    pub fn with_auth_token<S: Into<String>>(token: S) -> Self {
        Self(Arc::new(Mutex::new(State {
            auth_token: Some(token.into()),
            ..State::default()
        })))
    }

    /// Create a branch with an empty initial commit. Existing branches are kept.
    pub async fn create_branch(&self, location: &RepoLocation) {
        let mut state = self.0.lock().await;
        _ = state
            .branches
            .entry(BranchKey::of(location))
            .or_insert_with(|| vec![Arc::new(Commit::default())]);
    }

    /// Number of commits on the branch, including the initial empty one.
    pub async fn commit_count(&self, location: &RepoLocation) -> usize {
        let state = self.0.lock().await;
        state
            .branches
            .get(&BranchKey::of(location))
            .map_or(0, Vec::len)
    }

    /// Make every call fail with a transport error until switched back.
    pub async fn set_offline(&self, offline: bool) {
        self.0.lock().await.offline = offline;
    }

    /// Fail the next call of the given kind with a transport error.
    pub async fn fail_next(&self, point: FaultPoint) {
        _ = self.0.lock().await.armed.insert(point);
    }

    /// Build a client bound to `location`.
    #[must_use]
    pub fn client(&self, location: RepoLocation) -> MemoryClient {
        MemoryClient {
            repository: self.clone(),
            location,
        }
    }
}

impl Connector for MemoryRepository {
    fn connect(&self, location: &RepoLocation) -> Result<Arc<dyn RemoteClient>> {
        Ok(Arc::new(self.client(location.clone())))
    }
}

/// A client for one branch of a [`MemoryRepository`].
pub struct MemoryClient {
    repository: MemoryRepository,
    location: RepoLocation,
}

impl State {
    fn check(&mut self, location: &RepoLocation, point: FaultPoint) -> ClientResult<()> {
        if self.offline || self.armed.remove(&point) {
            return Err(ClientError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "memory repository is offline",
            )));
        }
        if let Some(expected) = &self.auth_token {
            if expected != location.auth_token() {
                return Err(ClientError::PermissionDenied(format!(
                    "credential rejected for {}",
                    location.branch_uri()
                )));
            }
        }
        Ok(())
    }

    fn head(&self, location: &RepoLocation) -> ClientResult<Snapshot> {
        self.branches
            .get(&BranchKey::of(location))
            .and_then(|history| history.last().cloned())
            .ok_or_else(|| ClientError::NotFound(format!("branch {}", location.branch_uri())))
    }

    /// Append a commit derived from the current head.
    fn commit<F>(&mut self, location: &RepoLocation, change: F) -> ClientResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, StoredFile>) -> ClientResult<()>,
    {
        let head = self.head(location)?;
        let mut files = head.files.clone();
        change(&mut files)?;
        let history = self
            .branches
            .get_mut(&BranchKey::of(location))
            .ok_or_else(|| ClientError::NotFound(format!("branch {}", location.branch_uri())))?;
        history.push(Arc::new(Commit { files }));
        Ok(())
    }
}

impl Commit {
    fn has_children(&self, dir: &str) -> bool {
        let prefix = path::forcedir(dir);
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    fn children(&self, dir: &str) -> impl Iterator<Item = (&String, &StoredFile)> {
        let prefix = path::forcedir(dir);
        self.files
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
    }

    /// Aggregate info for a directory implied by the files below it.
    fn directory_info(&self, dir: &str) -> RemoteFileInfo {
        let mut size = 0;
        let mut committed = None;
        for (_, file) in self.children(dir) {
            size += file.content.len() as u64;
            committed = committed.max(Some(file.committed));
        }
        RemoteFileInfo {
            path: dir.to_string(),
            file_type: FileType::Directory,
            size_bytes: size,
            committed,
        }
    }

    fn inspect(&self, target: &str) -> ClientResult<RemoteFileInfo> {
        if let Some(file) = self.files.get(target) {
            return Ok(file_info(target, file));
        }
        if path::is_root(target) || self.has_children(target) {
            return Ok(self.directory_info(target));
        }
        Err(ClientError::NotFound(target.to_string()))
    }
}

fn file_info(key: &str, file: &StoredFile) -> RemoteFileInfo {
    RemoteFileInfo {
        path: key.to_string(),
        file_type: FileType::File,
        size_bytes: file.content.len() as u64,
        committed: Some(file.committed),
    }
}

#[async_trait]
impl RemoteClient for MemoryClient {
    fn location(&self) -> &RepoLocation {
        &self.location
    }

    async fn get_file(&self, target: &str) -> ClientResult<ByteStream> {
        let mut state = self.repository.0.lock().await;
        state.check(&self.location, FaultPoint::Get)?;
        let head = state.head(&self.location)?;
        drop(state);

        let file = head
            .files
            .get(target)
            .ok_or_else(|| ClientError::NotFound(target.to_string()))?;

        let content = file.content.clone();
        let chunks: Vec<ClientResult<Bytes>> = (0..content.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(content.slice(start..(start + CHUNK_SIZE).min(content.len()))))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn list_file(&self, target: &str) -> ClientResult<Vec<RemoteFileInfo>> {
        let mut state = self.repository.0.lock().await;
        state.check(&self.location, FaultPoint::List)?;
        let head = state.head(&self.location)?;
        drop(state);

        if head.files.contains_key(target) {
            return Err(ClientError::NotADirectory(target.to_string()));
        }

        let prefix = path::forcedir(target);
        let mut entries: Vec<RemoteFileInfo> = Vec::new();
        let mut seen_dirs: HashSet<String> = HashSet::new();
        for (key, file) in head.children(target) {
            let rest = &key[prefix.len()..];
            match rest.split_once(path::SEPARATOR) {
                None => entries.push(file_info(key, file)),
                Some((dir, _)) => {
                    let dir_path = format!("{prefix}{dir}");
                    if seen_dirs.insert(dir_path.clone()) {
                        entries.push(head.directory_info(&dir_path));
                    }
                }
            }
        }

        if entries.is_empty() && !path::is_root(target) {
            return Err(ClientError::NotFound(target.to_string()));
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn inspect_file(&self, target: &str) -> ClientResult<RemoteFileInfo> {
        let mut state = self.repository.0.lock().await;
        state.check(&self.location, FaultPoint::Inspect)?;
        state.head(&self.location)?.inspect(target)
    }

    async fn put_file(&self, target: &str, data: Bytes) -> ClientResult<()> {
        let mut state = self.repository.0.lock().await;
        state.check(&self.location, FaultPoint::Put)?;
        let target = target.to_string();
        state.commit(&self.location, |files| {
            let mut parent = path::dirname(&target);
            while !path::is_root(parent) {
                if files.contains_key(parent) {
                    return Err(ClientError::NotADirectory(parent.to_string()));
                }
                parent = path::dirname(parent);
            }
            let prefix = path::forcedir(&target);
            if files.keys().any(|key| key.starts_with(&prefix)) {
                return Err(ClientError::transport(format!(
                    "cannot overwrite directory {target} with a file"
                )));
            }
            _ = files.insert(
                target.clone(),
                StoredFile {
                    content: data,
                    committed: Utc::now(),
                },
            );
            Ok(())
        })
    }

    async fn delete_file(&self, target: &str) -> ClientResult<()> {
        let mut state = self.repository.0.lock().await;
        state.check(&self.location, FaultPoint::Delete)?;
        state.commit(&self.location, |files| {
            if files.remove(target).is_some() {
                return Ok(());
            }
            let prefix = path::forcedir(target);
            let before = files.len();
            files.retain(|key, _| !key.starts_with(&prefix));
            if files.len() == before {
                return Err(ClientError::NotFound(target.to_string()));
            }
            Ok(())
        })
    }

    async fn copy_file(&self, src: &str, dst: &str) -> ClientResult<()> {
        let mut state = self.repository.0.lock().await;
        state.check(&self.location, FaultPoint::Copy)?;
        state.commit(&self.location, |files| {
            let source = files
                .get(src)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(src.to_string()))?;
            _ = files.insert(
                dst.to_string(),
                StoredFile {
                    content: source.content,
                    committed: Utc::now(),
                },
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn setup() -> (MemoryRepository, MemoryClient) {
        let repo = MemoryRepository::new();
        let location = RepoLocation::new("default", "test", "master").unwrap();
        repo.create_branch(&location).await;
        let client = repo.client(location);
        (repo, client)
    }

    async fn read(client: &MemoryClient, target: &str) -> Vec<u8> {
        let chunks: Vec<Bytes> = client.get_file(target).await.unwrap().try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_put_get_and_commits() {
        let (repo, client) = setup().await;
        assert_eq!(repo.commit_count(client.location()).await, 1);

        client.put_file("/a/b.txt", Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(read(&client, "/a/b.txt").await, b"hello");
        assert_eq!(repo.commit_count(client.location()).await, 2);
    }

    #[tokio::test]
    async fn test_large_file_is_chunked() {
        let (_repo, client) = setup().await;
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        client.put_file("/big", Bytes::from(data.clone())).await.unwrap();
        let chunks: Vec<Bytes> = client.get_file("/big").await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_implied_directories() {
        let (_repo, client) = setup().await;
        client.put_file("/a/b/c.txt", Bytes::from_static(b"abc")).await.unwrap();
        client.put_file("/a/d.txt", Bytes::from_static(b"d")).await.unwrap();

        let listing = client.list_file("/a").await.unwrap();
        let paths: Vec<_> = listing.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/a/b", "/a/d.txt"]);
        assert!(listing[0].is_dir());
        assert_eq!(listing[0].size_bytes, 3);

        assert!(client.inspect_file("/a/b").await.unwrap().is_dir());
        assert!(matches!(
            client.list_file("/a/d.txt").await,
            Err(ClientError::NotADirectory(_))
        ));
        assert!(matches!(
            client.list_file("/nope").await,
            Err(ClientError::NotFound(_))
        ));
        assert!(client.list_file("/").await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_put_under_file_is_rejected() {
        let (_repo, client) = setup().await;
        client.put_file("/f", Bytes::from_static(b"x")).await.unwrap();
        assert!(matches!(
            client.put_file("/f/g", Bytes::new()).await,
            Err(ClientError::NotADirectory(p)) if p == "/f"
        ));
    }

    #[tokio::test]
    async fn test_delete_directory_and_missing() {
        let (_repo, client) = setup().await;
        client.put_file("/a/1", Bytes::new()).await.unwrap();
        client.put_file("/a/2", Bytes::new()).await.unwrap();
        client.delete_file("/a").await.unwrap();
        assert!(matches!(client.inspect_file("/a").await, Err(ClientError::NotFound(_))));
        assert!(matches!(client.delete_file("/a").await, Err(ClientError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_stream_keeps_snapshot() {
        let (_repo, client) = setup().await;
        client.put_file("/v", Bytes::from_static(b"one")).await.unwrap();
        let stream = client.get_file("/v").await.unwrap();
        client.put_file("/v", Bytes::from_static(b"two")).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"one");
        assert_eq!(read(&client, "/v").await, b"two");
    }

    #[tokio::test]
    async fn test_auth_and_faults() {
        let repo = MemoryRepository::with_auth_token("secret");
        let good = RepoLocation::new("default", "test", "master")
            .unwrap()
            .with_auth_token("secret");
        repo.create_branch(&good).await;

        let bad = repo.client(good.clone().with_auth_token("wrong"));
        assert!(matches!(
            bad.list_file("/").await,
            Err(ClientError::PermissionDenied(_))
        ));

        let client = repo.client(good);
        client.list_file("/").await.unwrap();

        repo.fail_next(FaultPoint::List).await;
        assert!(matches!(client.list_file("/").await, Err(ClientError::Transport(_))));
        client.list_file("/").await.unwrap();

        repo.set_offline(true).await;
        assert!(matches!(client.inspect_file("/").await, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_unknown_branch() {
        let repo = MemoryRepository::new();
        let client = repo.client(RepoLocation::new("default", "test", "nope").unwrap());
        assert!(matches!(client.list_file("/").await, Err(ClientError::NotFound(_))));
    }
}

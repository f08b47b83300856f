// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Remote client speaking to Pachyderm's S3-compatible gateway.
//!
//! The gateway exposes every branch as a bucket named
//! `<branch>.<repo>.<project>`; writing or deleting an object commits to
//! that branch. Authentication uses the session token as both access key and
//! secret. Directories are prefixes, exactly as they are in PFS.

use crate::client::{
    ByteStream, ClientError, ClientResult, Connector, FileType, RemoteClient, RemoteFileInfo,
};
use crate::error::{Error, Result};
use crate::location::RepoLocation;
use crate::path;
use async_trait::async_trait;
use bytes::Bytes;
use diagnostics::*;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::{ClientOptions, ObjectStore};
use object_store::path::Path as ObjectPath;
use std::sync::Arc;
use std::time::Duration;

/// Region reported to the gateway; Pachyderm ignores it but signing needs one.
const GATEWAY_REGION: &str = "us-east-1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct S3GatewayClient {
    location: RepoLocation,
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

impl S3GatewayClient {
    pub fn new(location: RepoLocation) -> Result<Self> {
        let bucket = bucket_name(&location);
        let endpoint = format!("http://{}:{}", location.host(), location.port());

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&bucket)
            .with_region(GATEWAY_REGION)
            .with_endpoint(&endpoint)
            .with_allow_http(true)
            .with_virtual_hosted_style_request(false)
            .with_client_options(ClientOptions::new().with_timeout(REQUEST_TIMEOUT));

        if location.auth_token().is_empty() {
            builder = builder.with_skip_signature(true);
        } else {
            builder = builder
                .with_access_key_id(location.auth_token())
                .with_secret_access_key(location.auth_token());
        }

        let store = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build S3 gateway client: {e}")))?;

        debug!("S3 gateway client for {bucket} at {endpoint}", bucket: bucket.as_str(), endpoint: endpoint.as_str());

        Ok(Self::with_store(location, Arc::new(store)))
    }

    /// Wrap an already-configured object store (any `ObjectStore` that
    /// behaves like the gateway, e.g. `object_store::memory::InMemory`).
    #[must_use]
    pub fn with_store(location: RepoLocation, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket_name(&location),
            location,
            store,
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_file(&self, target: &str) -> ClientResult<Option<RemoteFileInfo>> {
        match self.store.head(&object_path(target)).await {
            Ok(meta) => Ok(Some(object_info(&meta))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(map_err(target, e)),
        }
    }
}

/// `<branch>.<repo>.<project>`, the gateway's bucket naming.
#[must_use]
pub fn bucket_name(location: &RepoLocation) -> String {
    format!(
        "{}.{}.{}",
        location.branch(),
        location.repo(),
        location.project()
    )
}

fn object_path(target: &str) -> ObjectPath {
    ObjectPath::from(path::strip_root(target))
}

fn repo_path(location: &ObjectPath) -> String {
    format!("/{}", location.as_ref())
}

fn object_info(meta: &object_store::ObjectMeta) -> RemoteFileInfo {
    RemoteFileInfo {
        path: repo_path(&meta.location),
        file_type: FileType::File,
        size_bytes: meta.size,
        committed: Some(meta.last_modified),
    }
}

fn map_err(target: &str, err: object_store::Error) -> ClientError {
    match err {
        object_store::Error::NotFound { .. } => ClientError::NotFound(target.to_string()),
        err @ (object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. }) => {
            ClientError::PermissionDenied(err.to_string())
        }
        other => ClientError::transport(other),
    }
}

#[async_trait]
impl RemoteClient for S3GatewayClient {
    fn location(&self) -> &RepoLocation {
        &self.location
    }

    async fn get_file(&self, target: &str) -> ClientResult<ByteStream> {
        debug!("GET {bucket}{target}", bucket: self.bucket.as_str(), target: target);
        let result = self
            .store
            .get(&object_path(target))
            .await
            .map_err(|e| map_err(target, e))?;
        let owned = target.to_string();
        Ok(result
            .into_stream()
            .map_err(move |e| map_err(&owned, e))
            .boxed())
    }

    async fn list_file(&self, target: &str) -> ClientResult<Vec<RemoteFileInfo>> {
        let prefix = (!path::is_root(target)).then(|| object_path(target));
        let listing = self
            .store
            .list_with_delimiter(prefix.as_ref())
            .await
            .map_err(|e| map_err(target, e))?;

        let mut entries: Vec<RemoteFileInfo> = listing.objects.iter().map(object_info).collect();
        entries.extend(listing.common_prefixes.iter().map(|dir| RemoteFileInfo {
            path: repo_path(dir),
            file_type: FileType::Directory,
            size_bytes: 0,
            committed: None,
        }));

        if entries.is_empty() && !path::is_root(target) {
            return match self.head_file(target).await? {
                Some(_) => Err(ClientError::NotADirectory(target.to_string())),
                None => Err(ClientError::NotFound(target.to_string())),
            };
        }
        debug!("Listed {count} entries under {target}", count: entries.len(), target: target);
        Ok(entries)
    }

    async fn inspect_file(&self, target: &str) -> ClientResult<RemoteFileInfo> {
        let directory = || RemoteFileInfo {
            path: target.to_string(),
            file_type: FileType::Directory,
            size_bytes: 0,
            committed: None,
        };
        if path::is_root(target) {
            return Ok(directory());
        }
        if let Some(info) = self.head_file(target).await? {
            return Ok(info);
        }
        let listing = self
            .store
            .list_with_delimiter(Some(&object_path(target)))
            .await
            .map_err(|e| map_err(target, e))?;
        if listing.objects.is_empty() && listing.common_prefixes.is_empty() {
            return Err(ClientError::NotFound(target.to_string()));
        }
        Ok(directory())
    }

    async fn put_file(&self, target: &str, data: Bytes) -> ClientResult<()> {
        let size = data.len();
        _ = self
            .store
            .put(&object_path(target), data.into())
            .await
            .map_err(|e| map_err(target, e))?;
        info!("Committed {size} bytes to {bucket}{target}", size: size, bucket: self.bucket.as_str(), target: target);
        Ok(())
    }

    async fn delete_file(&self, target: &str) -> ClientResult<()> {
        if self.head_file(target).await?.is_some() {
            self.store
                .delete(&object_path(target))
                .await
                .map_err(|e| map_err(target, e))?;
            info!("Deleted {bucket}{target}", bucket: self.bucket.as_str(), target: target);
            return Ok(());
        }

        // A directory: the gateway has no recursive delete, remove each object
        let prefix = object_path(target);
        let objects: Vec<object_store::ObjectMeta> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(|e| map_err(target, e))?;
        if objects.is_empty() {
            return Err(ClientError::NotFound(target.to_string()));
        }
        for meta in &objects {
            self.store
                .delete(&meta.location)
                .await
                .map_err(|e| map_err(target, e))?;
        }
        info!("Deleted {count} objects under {bucket}{target}", count: objects.len(), bucket: self.bucket.as_str(), target: target);
        Ok(())
    }

    async fn copy_file(&self, src: &str, dst: &str) -> ClientResult<()> {
        self.store
            .copy(&object_path(src), &object_path(dst))
            .await
            .map_err(|e| map_err(src, e))?;
        info!("Copied {src} to {dst} in {bucket}", src: src, dst: dst, bucket: self.bucket.as_str());
        Ok(())
    }
}

/// Connects through the S3 gateway of the server named in the location.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3GatewayConnector;

impl Connector for S3GatewayConnector {
    fn connect(&self, location: &RepoLocation) -> Result<Arc<dyn RemoteClient>> {
        Ok(Arc::new(S3GatewayClient::new(location.clone())?))
    }
}

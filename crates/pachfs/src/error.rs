// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, Error>;

/// Faults surfaced to filesystem callers.
///
/// Every variant that concerns a node carries the caller-visible path (not the
/// remote key), so messages read the same regardless of the adapter's root.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Reserved for backends whose nodes can be neither file nor directory.
    #[error("resource is invalid for this operation: {0}")]
    ResourceInvalid(String),

    #[error("path should be a directory: {0}")]
    DirectoryExpected(String),

    #[error("path should be a file: {0}")]
    FileExpected(String),

    #[error("directory exists: {0}")]
    DirectoryExists(String),

    #[error("directory is not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("file exists: {0}")]
    FileExists(String),

    #[error("destination exists: {0}")]
    DestinationExists(String),

    #[error("root directory may not be removed")]
    RemoveRoot,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("operation failed on {path}: {source}")]
    OperationFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("handle is closed: {0}")]
    HandleClosed(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no filesystem registered for scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found<S: AsRef<str>>(path: S) -> Self {
        Error::ResourceNotFound(path.as_ref().to_string())
    }

    pub fn directory_expected<S: AsRef<str>>(path: S) -> Self {
        Error::DirectoryExpected(path.as_ref().to_string())
    }

    pub fn file_expected<S: AsRef<str>>(path: S) -> Self {
        Error::FileExpected(path.as_ref().to_string())
    }

    pub fn handle_closed<S: AsRef<str>>(path: S) -> Self {
        Error::HandleClosed(path.as_ref().to_string())
    }

    pub fn invalid_path<S: AsRef<str>>(path: S) -> Self {
        Error::InvalidPath(path.as_ref().to_string())
    }

    pub fn invalid_url<U: AsRef<str>, R: Into<String>>(url: U, reason: R) -> Self {
        Error::InvalidUrl {
            url: url.as_ref().to_string(),
            reason: reason.into(),
        }
    }

    /// Translate a remote-client fault into the filesystem taxonomy.
    ///
    /// `path` is the caller-visible path the operation was issued for.
    pub fn from_client<S: AsRef<str>>(path: S, err: ClientError) -> Self {
        let path = path.as_ref().to_string();
        match err {
            ClientError::NotFound(_) => Error::ResourceNotFound(path),
            ClientError::NotADirectory(_) => Error::DirectoryExpected(path),
            ClientError::PermissionDenied(_) => Error::PermissionDenied(path),
            ClientError::Transport(source) => Error::OperationFailed { path, source },
        }
    }

    /// Wrap this error for the `AsyncRead`/`AsyncWrite` surface of a handle.
    ///
    /// The original error stays reachable through `std::io::Error::get_ref`.
    pub fn into_io(self) -> std::io::Error {
        match self {
            Error::Io(err) => err,
            other => {
                let kind = match &other {
                    Error::ResourceNotFound(_) => std::io::ErrorKind::NotFound,
                    Error::PermissionDenied(_) => std::io::ErrorKind::PermissionDenied,
                    _ => std::io::ErrorKind::Other,
                };
                std::io::Error::new(kind, other)
            }
        }
    }

    /// Recover a filesystem error that travelled through `std::io::Error`.
    pub fn from_io(err: std::io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(fs_err)) => *fs_err,
            Some(Err(other)) => Error::Io(std::io::Error::new(kind, other)),
            None => Error::Io(std::io::Error::from(kind)),
        }
    }

    /// True for faults that mean "nothing lives at this path".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound(_))
    }
}

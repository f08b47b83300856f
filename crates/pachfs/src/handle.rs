// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Open file handles.
//!
//! A [`RepoFile`] only exists once a path has been opened, so its lifecycle
//! is `Open(read | write) -> Closed`:
//!
//! - read handles pull chunks from the remote commit as they are read; the
//!   snapshot is fixed when the handle is opened
//! - write handles buffer locally; `close()` (or `AsyncWriteExt::shutdown`)
//!   performs exactly one remote put, which is one commit on the branch
//! - dropping a write handle without closing it aborts: the buffer is
//!   discarded and nothing reaches the remote side
//!
//! Reads, writes and closes on a closed handle fail with `HandleClosed`
//! without touching the network.

use crate::client::{ByteStream, RemoteClient};
use crate::error::{Error, Result};
use crate::fs::BinaryFile;
use crate::mode::Mode;
use async_trait::async_trait;
use bytes::Bytes;
use diagnostics::*;
use futures::{FutureExt, TryStreamExt};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::io::StreamReader;

type ContentReader = StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes>;

/// Local buffer of a writable handle and where it goes on close.
struct WriteBuffer {
    client: Arc<dyn RemoteClient>,
    key: String,
    cursor: Cursor<Vec<u8>>,
}

enum HandleState {
    Reading(ContentReader),
    Writing(WriteBuffer),
    Committing(BoxFuture<'static, Result<()>>),
    Closed,
}

/// A byte stream bound to one path of the branch.
pub struct RepoFile {
    path: String,
    mode: Mode,
    state: HandleState,
}

impl RepoFile {
    /// Wrap a content stream opened for reading.
    pub(crate) fn reader(path: String, mode: Mode, stream: ByteStream) -> Self {
        let error_path = path.clone();
        let stream: BoxStream<'static, std::io::Result<Bytes>> = Box::pin(
            stream.map_err(move |e| Error::from_client(&error_path, e).into_io()),
        );
        Self {
            path,
            mode,
            state: HandleState::Reading(StreamReader::new(stream)),
        }
    }

    /// A writable handle whose buffer starts out as `initial`.
    ///
    /// Append handles start positioned at the end of the buffer.
    pub(crate) fn writer(
        path: String,
        mode: Mode,
        client: Arc<dyn RemoteClient>,
        key: String,
        initial: Vec<u8>,
    ) -> Self {
        let mut cursor = Cursor::new(initial);
        if mode.appending() {
            cursor.set_position(cursor.get_ref().len() as u64);
        }
        Self {
            path,
            mode,
            state: HandleState::Writing(WriteBuffer {
                client,
                key,
                cursor,
            }),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn readable(&self) -> bool {
        self.mode.reading()
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        self.mode.writing()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, HandleState::Closed)
    }

    /// Release the handle. Write handles commit their buffer here.
    ///
    /// The handle is closed afterwards even if the commit failed. Closing a
    /// closed handle fails with `HandleClosed`.
    pub async fn close(&mut self) -> Result<()> {
        self.shutdown().await.map_err(Error::from_io)
    }

    fn closed_error(&self) -> std::io::Error {
        Error::handle_closed(&self.path).into_io()
    }

    fn not_readable(&self) -> std::io::Error {
        Error::InvalidMode(format!("{} is not open for reading ({})", self.path, self.mode)).into_io()
    }

    fn not_writable(&self) -> std::io::Error {
        Error::InvalidMode(format!("{} is not open for writing ({})", self.path, self.mode)).into_io()
    }
}

impl AsyncRead for RepoFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let readable = this.mode.reading();
        match &mut this.state {
            HandleState::Reading(reader) => Pin::new(reader).poll_read(cx, buf),
            HandleState::Writing(buffer) if readable => {
                let n = buffer.cursor.read(buf.initialize_unfilled())?;
                buf.advance(n);
                Poll::Ready(Ok(()))
            }
            HandleState::Writing(_) => Poll::Ready(Err(this.not_readable())),
            HandleState::Committing(_) | HandleState::Closed => {
                Poll::Ready(Err(this.closed_error()))
            }
        }
    }
}

impl AsyncWrite for RepoFile {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        let appending = this.mode.appending();
        match &mut this.state {
            HandleState::Writing(buffer) => {
                if appending {
                    _ = buffer.cursor.seek(SeekFrom::End(0))?;
                }
                Poll::Ready(std::io::Write::write(&mut buffer.cursor, data))
            }
            HandleState::Reading(_) => Poll::Ready(Err(this.not_writable())),
            HandleState::Committing(_) | HandleState::Closed => {
                Poll::Ready(Err(this.closed_error()))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        // Data only leaves the process on close
        match self.state {
            HandleState::Closed => Poll::Ready(Err(self.closed_error())),
            _ => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();

        match std::mem::replace(&mut this.state, HandleState::Closed) {
            HandleState::Closed => return Poll::Ready(Err(this.closed_error())),
            HandleState::Reading(_) => {
                debug!("Closed read handle {path}", path: this.path.as_str());
                return Poll::Ready(Ok(()));
            }
            HandleState::Writing(buffer) => {
                let path = this.path.clone();
                let WriteBuffer {
                    client,
                    key,
                    cursor,
                } = buffer;
                let content = Bytes::from(cursor.into_inner());
                let size = content.len();
                info!("Committing {size} bytes to {path}", size: size, path: path.as_str());
                this.state = HandleState::Committing(Box::pin(async move {
                    client
                        .put_file(&key, content)
                        .await
                        .map_err(|e| Error::from_client(&path, e))
                }));
            }
            committing @ HandleState::Committing(_) => this.state = committing,
        }

        let result = match &mut this.state {
            HandleState::Committing(commit) => match commit.poll_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => result,
            },
            _ => Ok(()),
        };
        this.state = HandleState::Closed;
        Poll::Ready(result.map_err(Error::into_io))
    }
}

impl AsyncSeek for RepoFile {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> std::io::Result<()> {
        let this = self.get_mut();
        match &mut this.state {
            HandleState::Writing(buffer) => buffer.cursor.seek(position).map(|_| ()),
            HandleState::Reading(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("{} is streamed and cannot seek", this.path),
            )),
            HandleState::Committing(_) | HandleState::Closed => Err(this.closed_error()),
        }
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
        match &self.state {
            HandleState::Writing(buffer) => Poll::Ready(Ok(buffer.cursor.position())),
            HandleState::Reading(_) => Poll::Ready(Ok(0)),
            HandleState::Committing(_) | HandleState::Closed => {
                Poll::Ready(Err(self.closed_error()))
            }
        }
    }
}

impl Drop for RepoFile {
    fn drop(&mut self) {
        match &self.state {
            HandleState::Writing(buffer) => {
                let size = buffer.cursor.get_ref().len();
                warn!(
                    "Write handle for {path} dropped without close, discarding {size} bytes",
                    path: self.path.as_str(),
                    size: size
                );
            }
            HandleState::Committing(_) => {
                warn!("Commit of {path} abandoned before completion", path: self.path.as_str());
            }
            HandleState::Reading(_) | HandleState::Closed => {}
        }
    }
}

impl std::fmt::Debug for RepoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            HandleState::Reading(_) => "reading",
            HandleState::Writing(_) => "writing",
            HandleState::Committing(_) => "committing",
            HandleState::Closed => "closed",
        };
        f.debug_struct("RepoFile")
            .field("path", &self.path)
            .field("mode", &self.mode.to_string())
            .field("state", &state)
            .finish()
    }
}

#[async_trait]
impl BinaryFile for RepoFile {
    fn path(&self) -> &str {
        RepoFile::path(self)
    }

    fn mode(&self) -> Mode {
        RepoFile::mode(self)
    }

    fn is_closed(&self) -> bool {
        RepoFile::is_closed(self)
    }

    async fn close(&mut self) -> Result<()> {
        RepoFile::close(self).await
    }
}

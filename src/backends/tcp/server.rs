// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::consts::MAX_FRAME_BYTES;
use crate::errors::ChannelError;
use crate::observability::messages::channel::{
    ClientDisconnected, ConnectionReclaimed, RequestFailed, ServerListening,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{RemoteError, RemoteErrorKind, Request, Response};
use crate::session::HandleRegistry;
use crate::traits::RpcChannel;

/// Serves an [`RpcChannel`] backend to TCP clients.
///
/// Every accepted connection gets its own task. Requests from all clients
/// reach the same backend, which serializes them. A line that does not parse
/// as a request, or that is longer than the frame limit, is answered with an
/// `InvalidArgument` error and the connection stays open.
///
/// Handles a client acquires are tracked per connection. Whatever the client
/// has not released when the connection ends is released on its behalf,
/// engines first and definitions last.
pub struct EngineServer<C: RpcChannel + 'static> {
    backend: Arc<C>,
    shutdown: CancellationToken,
    max_frame_bytes: usize,
}

impl<C: RpcChannel + 'static> EngineServer<C> {
    pub fn new(backend: Arc<C>) -> Self {
        Self {
            backend,
            shutdown: CancellationToken::new(),
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }

    /// Longest request line accepted, excluding the newline.
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Token that stops the accept loop and all connection tasks when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn backend(&self) -> &Arc<C> {
        &self.backend
    }

    /// Accepts connections until the shutdown token is cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ChannelError> {
        let address = listener.local_addr()?.to_string();
        ServerListening {
            address: &address,
            backend: self.backend.name(),
        }
        .log();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(address = %address, "Engine server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let connection = Connection {
                        backend: self.backend.clone(),
                        shutdown: self.shutdown.clone(),
                        max_frame_bytes: self.max_frame_bytes,
                        peer: peer.to_string(),
                        acquired: HandleRegistry::new(),
                        requests: 0,
                    };
                    tokio::spawn(connection.run(stream));
                }
            }
        }
    }
}

enum Frame {
    Line,
    Oversized,
    Eof,
}

/// Reads one newline-terminated frame into `buf`, holding at most
/// `limit + 1` bytes. The remainder of an oversized line is discarded.
async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> io::Result<Frame> {
    let cap = (limit as u64).saturating_add(1);
    buf.clear();
    if (&mut *reader).take(cap).read_until(b'\n', buf).await? == 0 {
        return Ok(Frame::Eof);
    }
    if buf.len() <= limit || buf.ends_with(b"\n") {
        return Ok(Frame::Line);
    }

    loop {
        buf.clear();
        let read = (&mut *reader).take(cap).read_until(b'\n', buf).await?;
        if read == 0 || buf.ends_with(b"\n") {
            buf.clear();
            return Ok(Frame::Oversized);
        }
    }
}

fn invalid_request(message: String) -> Response {
    Response::Error {
        error: RemoteError::new(RemoteErrorKind::InvalidArgument, message),
    }
}

/// One client connection and the handles it currently holds.
struct Connection<C: RpcChannel + ?Sized> {
    backend: Arc<C>,
    shutdown: CancellationToken,
    max_frame_bytes: usize,
    peer: String,
    acquired: HandleRegistry,
    requests: u64,
}

impl<C: RpcChannel + ?Sized> Connection<C> {
    async fn run(mut self, stream: TcpStream) {
        if let Err(error) = self.serve(stream).await {
            tracing::warn!(peer = %self.peer, error = %error, "Connection ended with error");
        }
        self.reclaim().await;
        ClientDisconnected {
            peer: &self.peer,
            requests: self.requests,
        }
        .log();
    }

    async fn serve(&mut self, stream: TcpStream) -> Result<(), ChannelError> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = Vec::new();

        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                frame = read_frame(&mut reader, &mut line, self.max_frame_bytes) => frame?,
            };
            let response = match frame {
                Frame::Eof => return Ok(()),
                Frame::Oversized => {
                    self.requests += 1;
                    invalid_request(format!(
                        "request exceeds {} bytes",
                        self.max_frame_bytes
                    ))
                }
                Frame::Line if line.iter().all(u8::is_ascii_whitespace) => continue,
                Frame::Line => {
                    self.requests += 1;
                    match serde_json::from_slice::<Request>(&line) {
                        Ok(request) => self.forward(request).await?,
                        Err(e) => invalid_request(format!("malformed request: {}", e)),
                    }
                }
            };

            let mut bytes = serde_json::to_vec(&response)?;
            bytes.push(b'\n');
            writer.write_all(&bytes).await?;
        }
    }

    /// Passes `request` to the backend and keeps the connection's handle
    /// ledger in step with the answer.
    async fn forward(&mut self, request: Request) -> Result<Response, ChannelError> {
        let operation = request.operation();
        let released = request.released_handle();
        let response = match self.backend.call(request).await {
            Ok(response) => response,
            Err(error) => {
                RequestFailed {
                    operation,
                    error: &error,
                }
                .log();
                return Err(error);
            }
        };

        match (&response, released) {
            (Response::Handle { handle }, _) => {
                if let Err(e) = self.acquired.register(*handle, None) {
                    tracing::warn!(peer = %self.peer, error = %e, "Backend reissued a live handle");
                }
            }
            (Response::Done, Some(handle)) => self.acquired.mark_released(handle),
            _ => {}
        }
        Ok(response)
    }

    /// Releases every handle the client left behind, one attempt each.
    async fn reclaim(&mut self) {
        let leftovers = self.acquired.teardown_order();
        if leftovers.is_empty() {
            return;
        }

        let mut failed = 0;
        for handle in &leftovers {
            self.acquired.mark_released(*handle);
            match self.backend.call(Request::release(*handle)).await {
                Ok(Response::Done) => {}
                other => {
                    failed += 1;
                    tracing::warn!(peer = %self.peer, handle = %handle, outcome = ?other, "Reclaim failed");
                }
            }
        }

        ConnectionReclaimed {
            peer: &self.peer,
            released: leftovers.len() - failed,
            failed,
        }
        .log();
    }
}

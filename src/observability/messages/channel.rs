// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for channel connections and the TCP engine server.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Client channel connected to a remote engine server.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ChannelConnected<'a> {
    pub address: &'a str,
}

impl Display for ChannelConnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Connected to engine server at {}", self.address)
    }
}

impl StructuredLog for ChannelConnected<'_> {
    fn log(&self) {
        tracing::info!(address = self.address, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("channel", span_name = name, address = self.address)
    }
}

/// Engine server accepting connections.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ServerListening<'a> {
    pub address: &'a str,
    pub backend: &'a str,
}

impl Display for ServerListening<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Engine server listening on {} (backend: {})",
            self.address, self.backend
        )
    }
}

impl StructuredLog for ServerListening<'_> {
    fn log(&self) {
        tracing::info!(address = self.address, backend = self.backend, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "server",
            span_name = name,
            address = self.address,
            backend = self.backend,
        )
    }
}

/// A client connection finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ClientDisconnected<'a> {
    pub peer: &'a str,
    pub requests: u64,
}

impl Display for ClientDisconnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Client {} disconnected after {} requests",
            self.peer, self.requests
        )
    }
}

impl StructuredLog for ClientDisconnected<'_> {
    fn log(&self) {
        tracing::info!(peer = self.peer, requests = self.requests, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("client", span_name = name, peer = self.peer)
    }
}

/// A request could not be carried over the channel.
///
/// # Log Level
/// `warn!` - Transport problem, surfaced to the session
pub struct RequestFailed<'a> {
    pub operation: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RequestFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Request '{}' failed: {}", self.operation, self.error)
    }
}

impl StructuredLog for RequestFailed<'_> {
    fn log(&self) {
        tracing::warn!(operation = self.operation, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "request_failed",
            span_name = name,
            operation = self.operation,
            error = %self.error,
        )
    }
}

/// Handles a disconnected client left behind were given back to the backend.
///
/// # Log Level
/// `warn!` - Client ended its session without releasing everything
pub struct ConnectionReclaimed<'a> {
    pub peer: &'a str,
    pub released: usize,
    pub failed: usize,
}

impl Display for ConnectionReclaimed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reclaimed {} handles left by client {} ({} failed)",
            self.released, self.peer, self.failed
        )
    }
}

impl StructuredLog for ConnectionReclaimed<'_> {
    fn log(&self) {
        tracing::warn!(
            peer = self.peer,
            released = self.released,
            failed = self.failed,
            "{}",
            self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("reclaim", span_name = name, peer = self.peer)
    }
}

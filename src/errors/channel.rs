// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Transport failures raised by RPC channel implementations.

use std::time::Duration;
use thiserror::Error;

/// Failure of the channel itself, as opposed to a failure reported by the
/// remote engine. Never recoverable inside a session.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Connection could not be established.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Read or write on an open connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Peer closed the connection before answering.
    #[error("Connection closed by peer")]
    Closed,

    /// No response arrived within the configured request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

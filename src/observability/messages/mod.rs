// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for a human-readable line and
//! [`StructuredLog`] to emit the same event with structured fields.
//!
//! # Organization
//!
//! * `session` - definition/engine lifecycle, state changes and cleanup
//! * `transfer` - buffer allocation, release, upload and download
//! * `action` - run descriptor compilation and execution
//! * `channel` - connections and transport failures
//! * `verify` - comparison against the reference implementation
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_dfe_client::observability::messages::channel::ChannelConnected;
//! use the_dfe_client::observability::messages::StructuredLog;
//!
//! let msg = ChannelConnected {
//!     address: "localhost:9090",
//! };
//!
//! msg.log();
//! ```

use std::fmt::Display;
use tracing::Span;

pub mod action;
pub mod channel;
pub mod session;
pub mod transfer;
pub mod verify;

/// A log message that knows its level and structured fields.
pub trait StructuredLog: Display {
    /// Emit the event at the message's level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}

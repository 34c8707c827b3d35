// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational log lines go through message types in
//! [`messages`]. Each type implements `Display` plus [`messages::StructuredLog`]
//! so the same event is emitted with consistent text and structured fields.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::session` - definition/engine lifecycle and cleanup
//! * `messages::transfer` - buffers and data movement
//! * `messages::action` - run descriptor compilation and execution
//! * `messages::channel` - transport connections and failures
//! * `messages::verify` - reference comparison results
//!
//! # Usage
//!
//! ```rust
//! use the_dfe_client::observability::messages::session::CleanupFailed;
//! use the_dfe_client::protocol::{RemoteHandle, ResourceKind};
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
//! let msg = CleanupFailed {
//!     handle: RemoteHandle::new(5, ResourceKind::Buffer),
//!     error: &error,
//! };
//!
//! tracing::warn!("{}", msg);
//! ```

pub mod messages;

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run descriptors: compilation and execution on an engine.

use crate::observability::messages::StructuredLog;
use crate::protocol::RemoteHandle;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Run descriptor compiled by the remote side.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ActionCompiled<'a> {
    pub action: &'a str,
    pub handle: RemoteHandle,
}

impl Display for ActionCompiled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Action '{}' compiled as {}", self.action, self.handle)
    }
}

impl StructuredLog for ActionCompiled<'_> {
    fn log(&self) {
        tracing::debug!(action = self.action, handle = %self.handle, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "action_compiled",
            span_name = name,
            action = self.action,
            handle = %self.handle,
        )
    }
}

/// Action submitted to an engine.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_dfe_client::observability::messages::action::ActionRunStarted;
/// use the_dfe_client::protocol::{RemoteHandle, ResourceKind};
///
/// let msg = ActionRunStarted {
///     action: "writeLMem",
///     engine: RemoteHandle::new(2, ResourceKind::Engine),
///     mode: "compiled",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ActionRunStarted<'a> {
    pub action: &'a str,
    pub engine: RemoteHandle,
    pub mode: &'a str,
}

impl Display for ActionRunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Running action '{}' ({}) on {}",
            self.action, self.mode, self.engine
        )
    }
}

impl StructuredLog for ActionRunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            action = self.action,
            engine = %self.engine,
            mode = self.mode,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "action_run",
            span_name = name,
            action = self.action,
            engine = %self.engine,
            mode = self.mode,
        )
    }
}

/// Action finished on an engine.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ActionRunCompleted<'a> {
    pub action: &'a str,
    pub engine: RemoteHandle,
    pub duration: Duration,
}

impl Display for ActionRunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Action '{}' on {} completed in {:?}",
            self.action, self.engine, self.duration
        )
    }
}

impl StructuredLog for ActionRunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            action = self.action,
            engine = %self.engine,
            duration_us = self.duration.as_micros() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "action_completed",
            span_name = name,
            action = self.action,
            engine = %self.engine,
            duration = ?self.duration,
        )
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the session lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Computation definition init/free
//! * Engine load/unload
//! * Session state transitions
//! * Error-path cleanup

use crate::observability::messages::StructuredLog;
use crate::protocol::RemoteHandle;
use crate::session::SessionState;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Computation definition initialized on the remote side.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_dfe_client::observability::messages::session::DefinitionInitialized;
/// use the_dfe_client::protocol::{RemoteHandle, ResourceKind};
///
/// let msg = DefinitionInitialized {
///     name: "Simple",
///     handle: RemoteHandle::new(1, ResourceKind::Definition),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct DefinitionInitialized<'a> {
    pub name: &'a str,
    pub handle: RemoteHandle,
}

impl Display for DefinitionInitialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Definition '{}' initialized as {}", self.name, self.handle)
    }
}

impl StructuredLog for DefinitionInitialized<'_> {
    fn log(&self) {
        tracing::info!(
            definition = self.name,
            handle = %self.handle,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "definition",
            span_name = name,
            definition = self.name,
            handle = %self.handle,
        )
    }
}

/// Engine loaded from a definition.
///
/// # Log Level
/// `info!` - Important operational event
pub struct EngineLoaded<'a> {
    pub engine: RemoteHandle,
    pub definition: RemoteHandle,
    pub selector: &'a str,
}

impl Display for EngineLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Engine {} loaded from {} (selector '{}')",
            self.engine, self.definition, self.selector
        )
    }
}

impl StructuredLog for EngineLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            engine = %self.engine,
            definition = %self.definition,
            selector = self.selector,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "engine",
            span_name = name,
            engine = %self.engine,
            definition = %self.definition,
        )
    }
}

/// Engine unloaded.
///
/// # Log Level
/// `info!` - Important operational event
pub struct EngineUnloaded {
    pub engine: RemoteHandle,
}

impl Display for EngineUnloaded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Engine {} unloaded", self.engine)
    }
}

impl StructuredLog for EngineUnloaded {
    fn log(&self) {
        tracing::info!(engine = %self.engine, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("engine_unloaded", span_name = name, engine = %self.engine)
    }
}

/// Computation definition freed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DefinitionFreed {
    pub definition: RemoteHandle,
}

impl Display for DefinitionFreed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Definition {} freed", self.definition)
    }
}

impl StructuredLog for DefinitionFreed {
    fn log(&self) {
        tracing::info!(definition = %self.definition, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "definition_freed",
            span_name = name,
            definition = %self.definition,
        )
    }
}

/// Session moved to a new lifecycle state.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct SessionStateChanged {
    pub from: SessionState,
    pub to: SessionState,
}

impl Display for SessionStateChanged {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Session state {} -> {}", self.from, self.to)
    }
}

impl StructuredLog for SessionStateChanged {
    fn log(&self) {
        tracing::debug!(from = %self.from, to = %self.to, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "session_state",
            span_name = name,
            from = %self.from,
            to = %self.to,
        )
    }
}

/// Session is unwinding after a failure.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_dfe_client::observability::messages::session::SessionAborted;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "out of memory");
/// let msg = SessionAborted {
///     error: &error,
///     live_handles: 3,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct SessionAborted<'a> {
    pub error: &'a dyn std::error::Error,
    pub live_handles: usize,
}

impl Display for SessionAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session aborted ({}), releasing {} live handles",
            self.error, self.live_handles
        )
    }
}

impl StructuredLog for SessionAborted<'_> {
    fn log(&self) {
        tracing::error!(
            error = %self.error,
            live_handles = self.live_handles,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "session_aborted",
            span_name = name,
            error = %self.error,
            live_handles = self.live_handles,
        )
    }
}

/// Best-effort release of a handle failed during cleanup.
///
/// # Log Level
/// `warn!` - Reported, not retried
pub struct CleanupFailed<'a> {
    pub handle: RemoteHandle,
    pub error: &'a dyn std::error::Error,
}

impl Display for CleanupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to release {} during cleanup: {}", self.handle, self.error)
    }
}

impl StructuredLog for CleanupFailed<'_> {
    fn log(&self) {
        tracing::warn!(handle = %self.handle, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "cleanup_failed",
            span_name = name,
            handle = %self.handle,
            error = %self.error,
        )
    }
}

/// Full session plan executed and every handle released.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SessionCompleted<'a> {
    pub definition: &'a str,
    pub actions: usize,
    pub duration: Duration,
}

impl Display for SessionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session for '{}' completed: {} actions in {:?}",
            self.definition, self.actions, self.duration
        )
    }
}

impl StructuredLog for SessionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            definition = self.definition,
            actions = self.actions,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "session_completed",
            span_name = name,
            definition = self.definition,
            actions = self.actions,
            duration = ?self.duration,
        )
    }
}

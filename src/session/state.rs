// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Lifecycle state of a session.
///
/// ```text
/// Idle -> DefinitionLoaded -> EngineLoaded -> { Staged -> Running -> Completed }*
///      -> EngineUnloaded -> DefinitionFreed
/// ```
///
/// `DefinitionFreed` is terminal and is reached on success and on every
/// failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    DefinitionLoaded,
    EngineLoaded,
    Staged,
    Running,
    Completed,
    EngineUnloaded,
    DefinitionFreed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::DefinitionFreed)
    }

    /// True while at least one engine is expected to be loaded.
    pub fn has_engine(&self) -> bool {
        matches!(
            self,
            SessionState::EngineLoaded
                | SessionState::Staged
                | SessionState::Running
                | SessionState::Completed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::DefinitionLoaded => "DefinitionLoaded",
            SessionState::EngineLoaded => "EngineLoaded",
            SessionState::Staged => "Staged",
            SessionState::Running => "Running",
            SessionState::Completed => "Completed",
            SessionState::EngineUnloaded => "EngineUnloaded",
            SessionState::DefinitionFreed => "DefinitionFreed",
        };
        f.write_str(name)
    }
}

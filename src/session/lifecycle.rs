// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The session: one client's ordered conversation with a remote engine.
//!
//! `Session` owns the handle registry and the lifecycle state. Definition and
//! engine management live here; buffer management, data transfer and action
//! submission are implemented in the sibling `allocator`, `transfer` and
//! `action` modules as further `impl Session` blocks.

use crate::errors::{SessionError, SessionResult};
use crate::observability::messages::channel::RequestFailed;
use crate::observability::messages::session::{
    CleanupFailed, DefinitionFreed, DefinitionInitialized, EngineLoaded, EngineUnloaded,
    SessionStateChanged,
};
use crate::observability::messages::transfer::HandleReleased;
use crate::observability::messages::StructuredLog;
use crate::protocol::{
    DefinitionHandle, EngineHandle, RemoteHandle, Request, ResourceKind, Response,
};
use crate::session::registry::HandleRegistry;
use crate::session::SessionState;
use crate::traits::RpcChannel;

pub struct Session<'c, C: RpcChannel + ?Sized> {
    pub(crate) channel: &'c C,
    pub(crate) registry: HandleRegistry,
    state: SessionState,
}

impl<'c, C: RpcChannel + ?Sized> Session<'c, C> {
    pub fn new(channel: &'c C) -> Self {
        Self {
            channel,
            registry: HandleRegistry::new(),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of remote handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        self.registry.live_count()
    }

    pub(crate) fn transition(&mut self, to: SessionState) {
        if self.state != to {
            SessionStateChanged {
                from: self.state,
                to,
            }
            .log();
            self.state = to;
        }
    }

    pub(crate) fn ensure_open(&self, operation: &'static str) -> SessionResult<()> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// One blocking round trip. Transport failures become `SessionError::Channel`.
    pub(crate) async fn call(&self, request: Request) -> SessionResult<Response> {
        let operation = request.operation();
        self.channel.call(request).await.map_err(|source| {
            RequestFailed {
                operation,
                error: &source,
            }
            .log();
            SessionError::Channel { operation, source }
        })
    }

    /// Extracts a handle of `kind`. A handle of another kind is still a
    /// remote resource, so it is registered for teardown before failing.
    pub(crate) fn expect_handle(
        &mut self,
        operation: &'static str,
        response: Response,
        kind: ResourceKind,
    ) -> SessionResult<RemoteHandle> {
        match response {
            Response::Handle { handle } if handle.kind == kind => Ok(handle),
            Response::Handle { handle } => {
                self.registry.register(handle, None)?;
                Err(SessionError::UnexpectedResponse {
                    operation,
                    response: format!("{} where a {} was expected", handle, kind),
                })
            }
            Response::Error { error } => Err(SessionError::Remote { operation, error }),
            other => Err(SessionError::UnexpectedResponse {
                operation,
                response: format!("{:?}", other),
            }),
        }
    }

    pub(crate) fn expect_done(operation: &'static str, response: Response) -> SessionResult<()> {
        match response {
            Response::Done => Ok(()),
            Response::Error { error } => Err(SessionError::Remote { operation, error }),
            other => Err(SessionError::UnexpectedResponse {
                operation,
                response: format!("{:?}", other),
            }),
        }
    }

    /// `Idle -> DefinitionLoaded`. Further definitions may be initialized while
    /// the session is open; they share the session's engines and buffers.
    pub async fn init_definition(&mut self, name: &str) -> SessionResult<DefinitionHandle> {
        self.ensure_open("init_definition")?;

        let response = self
            .call(Request::InitDefinition {
                name: name.to_string(),
            })
            .await?;
        let handle = self.expect_handle("init_definition", response, ResourceKind::Definition)?;
        self.registry.register(handle, None)?;

        DefinitionInitialized { name, handle }.log();
        if self.state == SessionState::Idle {
            self.transition(SessionState::DefinitionLoaded);
        }

        Ok(DefinitionHandle {
            handle,
            name: name.to_string(),
        })
    }

    /// `DefinitionLoaded -> EngineLoaded`.
    pub async fn load_engine(
        &mut self,
        definition: &DefinitionHandle,
        selector: &str,
    ) -> SessionResult<EngineHandle> {
        self.ensure_open("load_engine")?;
        self.registry.check_live(definition.handle)?;

        let response = self
            .call(Request::LoadEngine {
                definition: definition.handle,
                selector: selector.to_string(),
            })
            .await?;
        let handle = self.expect_handle("load_engine", response, ResourceKind::Engine)?;
        self.registry.register(handle, Some(definition.handle))?;

        EngineLoaded {
            engine: handle,
            definition: definition.handle,
            selector,
        }
        .log();
        if !self.state.has_engine() {
            self.transition(SessionState::EngineLoaded);
        }

        Ok(EngineHandle {
            handle,
            definition: definition.handle,
        })
    }

    /// `Completed -> EngineUnloaded`. Consumes the handle, so each engine is
    /// unloaded at most once.
    pub async fn unload_engine(&mut self, engine: EngineHandle) -> SessionResult<()> {
        self.ensure_open("unload_engine")?;
        self.registry.check_releasable(engine.handle)?;

        self.registry.mark_released(engine.handle);
        let response = self
            .call(Request::UnloadEngine {
                engine: engine.handle,
            })
            .await?;
        Self::expect_done("unload_engine", response)?;

        EngineUnloaded {
            engine: engine.handle,
        }
        .log();
        if self.registry.live_of_kind(ResourceKind::Engine).is_empty() {
            self.transition(SessionState::EngineUnloaded);
        }
        Ok(())
    }

    /// Frees a definition. Engines and compiled actions derived from it must be
    /// gone, and the last definition can only be freed once every buffer has
    /// been released.
    pub async fn free_definition(&mut self, definition: DefinitionHandle) -> SessionResult<()> {
        self.ensure_open("free_definition")?;
        self.registry.check_releasable(definition.handle)?;

        let mut live = self.registry.live_dependents(definition.handle);
        let last_definition = self.registry.live_of_kind(ResourceKind::Definition).len() == 1;
        if last_definition {
            live = self.registry.live_count() - 1;
        }
        if live > 0 {
            return Err(SessionError::DefinitionInUse {
                definition: definition.handle,
                live,
            });
        }

        self.registry.mark_released(definition.handle);
        let response = self
            .call(Request::FreeDefinition {
                definition: definition.handle,
            })
            .await?;
        Self::expect_done("free_definition", response)?;

        DefinitionFreed {
            definition: definition.handle,
        }
        .log();
        if self.registry.live_count() == 0 {
            self.transition(SessionState::DefinitionFreed);
        }
        Ok(())
    }

    /// Best-effort release of everything still live, used on failure paths.
    ///
    /// Each handle gets exactly one release attempt. Failures are logged and
    /// returned; the session always ends in `DefinitionFreed`.
    pub async fn teardown(&mut self) -> Vec<SessionError> {
        let mut failures = Vec::new();

        for handle in self.registry.teardown_order() {
            self.registry.mark_released(handle);
            let request = Request::release(handle);
            let operation = request.operation();

            let outcome = match self.call(request).await {
                Ok(response) => Self::expect_done(operation, response),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => HandleReleased { handle }.log(),
                Err(error) => {
                    CleanupFailed {
                        handle,
                        error: &error,
                    }
                    .log();
                    failures.push(error);
                }
            }
        }

        self.transition(SessionState::DefinitionFreed);
        failures
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run descriptors and the two ways of submitting them.
//!
//! A [`RunDescriptor`] is built locally: scalar parameters and buffer bindings
//! keyed by name, last write wins. It is then either sent inline with the run
//! call or compiled once into a [`CompiledActionHandle`] that the remote side
//! has validated and that can be run repeatedly. Both shapes are a
//! [`Submittable`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use crate::errors::{SessionError, SessionResult};
use crate::observability::messages::action::{ActionCompiled, ActionRunCompleted, ActionRunStarted};
use crate::observability::messages::StructuredLog;
use crate::protocol::{
    ActionRef, ActionSpec, BufferHandle, CompiledActionHandle, DefinitionHandle, EngineHandle,
    ParamValue, RemoteHandle, Request, ResourceKind, StreamBinding, StreamDirection,
};
use crate::session::lifecycle::Session;
use crate::session::SessionState;
use crate::traits::RpcChannel;

/// How run descriptors reach the remote side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// Descriptor travels inside each run call.
    #[default]
    Inline,
    /// Descriptor is compiled once and run by handle.
    Compiled,
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMode::Inline => f.write_str("inline"),
            ActionMode::Compiled => f.write_str("compiled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunDescriptor {
    definition: RemoteHandle,
    action: String,
    params: BTreeMap<String, ParamValue>,
    streams: BTreeMap<String, StreamBinding>,
}

impl RunDescriptor {
    pub fn new(definition: &DefinitionHandle, action: impl Into<String>) -> Self {
        Self {
            definition: definition.handle,
            action: action.into(),
            params: BTreeMap::new(),
            streams: BTreeMap::new(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn definition(&self) -> RemoteHandle {
        self.definition
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name).copied()
    }

    pub fn binding(&self, port: &str) -> Option<&StreamBinding> {
        self.streams.get(port)
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Binds `buffer` to input port `name`. `byte_length` must cover the whole
    /// buffer.
    pub fn queue_input(
        &mut self,
        name: impl Into<String>,
        buffer: &BufferHandle,
        byte_length: u64,
    ) -> SessionResult<&mut Self> {
        self.queue(name.into(), buffer, byte_length, StreamDirection::Input)
    }

    /// Binds `buffer` to output port `name`. `byte_length` must cover the whole
    /// buffer.
    pub fn queue_output(
        &mut self,
        name: impl Into<String>,
        buffer: &BufferHandle,
        byte_length: u64,
    ) -> SessionResult<&mut Self> {
        self.queue(name.into(), buffer, byte_length, StreamDirection::Output)
    }

    fn queue(
        &mut self,
        port: String,
        buffer: &BufferHandle,
        byte_length: u64,
        direction: StreamDirection,
    ) -> SessionResult<&mut Self> {
        if byte_length != buffer.byte_len() {
            return Err(SessionError::BindingLengthMismatch {
                port,
                buffer: buffer.handle,
                byte_length,
                expected: buffer.byte_len(),
            });
        }
        self.streams.insert(
            port,
            StreamBinding {
                buffer: buffer.handle,
                byte_length,
                direction,
            },
        );
        Ok(self)
    }

    fn bound_buffers(&self) -> impl Iterator<Item = RemoteHandle> + '_ {
        self.streams.values().map(|binding| binding.buffer)
    }

    pub fn to_spec(&self) -> ActionSpec {
        ActionSpec {
            definition: self.definition,
            action: self.action.clone(),
            params: self.params.clone(),
            streams: self.streams.clone(),
        }
    }
}

/// Something a run call can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Submittable {
    Inline(RunDescriptor),
    Compiled(CompiledActionHandle),
}

impl Submittable {
    pub fn action(&self) -> &str {
        match self {
            Submittable::Inline(descriptor) => descriptor.action(),
            Submittable::Compiled(compiled) => compiled.action(),
        }
    }

    pub fn mode(&self) -> ActionMode {
        match self {
            Submittable::Inline(_) => ActionMode::Inline,
            Submittable::Compiled(_) => ActionMode::Compiled,
        }
    }
}

impl<'c, C: RpcChannel + ?Sized> Session<'c, C> {
    fn check_descriptor(&self, operation: &'static str, descriptor: &RunDescriptor) -> SessionResult<()> {
        self.ensure_open(operation)?;
        self.registry.check_live(descriptor.definition)?;
        for buffer in descriptor.bound_buffers() {
            self.registry.check_live(buffer)?;
        }
        Ok(())
    }

    /// Submits `descriptor` for up-front validation and returns a handle that
    /// must be released like a buffer.
    pub async fn compile(&mut self, descriptor: &RunDescriptor) -> SessionResult<CompiledActionHandle> {
        self.check_descriptor("compile_action", descriptor)?;

        let response = self
            .call(Request::CompileAction {
                action: descriptor.to_spec(),
            })
            .await?;
        let handle = self.expect_handle("compile_action", response, ResourceKind::Action)?;
        self.registry.register(handle, Some(descriptor.definition))?;

        ActionCompiled {
            action: descriptor.action(),
            handle,
        }
        .log();
        if matches!(self.state(), SessionState::EngineLoaded | SessionState::Completed) {
            self.transition(SessionState::Staged);
        }

        Ok(CompiledActionHandle {
            handle,
            definition: descriptor.definition,
            action: descriptor.action.clone(),
        })
    }

    /// Wraps `descriptor` in the requested submission mode, compiling it if
    /// needed.
    pub async fn submit(&mut self, descriptor: RunDescriptor, mode: ActionMode) -> SessionResult<Submittable> {
        match mode {
            ActionMode::Inline => {
                self.check_descriptor("submit", &descriptor)?;
                Ok(Submittable::Inline(descriptor))
            }
            ActionMode::Compiled => Ok(Submittable::Compiled(self.compile(&descriptor).await?)),
        }
    }

    /// `Staged -> Running -> Completed`. Blocks until the engine has finished
    /// the action.
    pub async fn run(&mut self, engine: &EngineHandle, action: &Submittable) -> SessionResult<()> {
        self.ensure_open("run")?;
        self.registry.check_live(engine.handle)?;

        let action_ref = match action {
            Submittable::Inline(descriptor) => {
                self.check_descriptor("run", descriptor)?;
                ActionRef::Inline(descriptor.to_spec())
            }
            Submittable::Compiled(compiled) => {
                self.registry.check_live(compiled.handle)?;
                ActionRef::Compiled(compiled.handle)
            }
        };

        let mode = action.mode().to_string();
        ActionRunStarted {
            action: action.action(),
            engine: engine.handle,
            mode: &mode,
        }
        .log();
        self.transition(SessionState::Running);

        let started = Instant::now();
        let response = self
            .call(Request::Run {
                engine: engine.handle,
                action: action_ref,
            })
            .await?;
        Self::expect_done("run", response)?;

        ActionRunCompleted {
            action: action.action(),
            engine: engine.handle,
            duration: started.elapsed(),
        }
        .log();
        self.transition(SessionState::Completed);
        Ok(())
    }
}

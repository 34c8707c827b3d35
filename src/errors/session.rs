// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy of the session core.
//!
//! Resource-acquisition failures unwind the session before they reach the
//! caller. A verification mismatch is not an error; see
//! [`crate::session::verifier::Verdict`].

use thiserror::Error;

use crate::errors::ChannelError;
use crate::protocol::{ElementType, ParamValue, RemoteError, RemoteHandle, ResourceKind};
use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The channel failed while carrying `operation`.
    #[error("Channel failure during {operation}: {source}")]
    Channel {
        operation: &'static str,
        #[source]
        source: ChannelError,
    },

    /// The remote side refused a buffer allocation.
    #[error("Remote allocation of {count} x {element_type} refused: {reason}")]
    RemoteAllocation {
        element_type: ElementType,
        count: usize,
        reason: RemoteError,
    },

    /// Any other failure reported by the remote side.
    #[error("Remote {operation} failed: {error}")]
    Remote {
        operation: &'static str,
        error: RemoteError,
    },

    #[error("Buffer overflow on {buffer}: {requested} elements requested, {capacity} allocated")]
    BufferOverflow {
        buffer: RemoteHandle,
        capacity: usize,
        requested: usize,
    },

    #[error("Transfer size mismatch on {buffer}: expected {expected} elements, received {actual}")]
    TransferSizeMismatch {
        buffer: RemoteHandle,
        expected: usize,
        actual: usize,
    },

    #[error("Element type mismatch on {buffer}: buffer holds {expected}, transfer carries {actual}")]
    ElementTypeMismatch {
        buffer: RemoteHandle,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("Handle {handle} released twice")]
    DoubleFree { handle: RemoteHandle },

    #[error("Handle {handle} used after release")]
    UseAfterFree { handle: RemoteHandle },

    /// Engines and definitions are given back by `unload_engine` and
    /// `free_definition`, not by `release`.
    #[error("Handle {handle} is a {kind} and cannot be released with free")]
    NotReleasable {
        handle: RemoteHandle,
        kind: ResourceKind,
    },

    #[error("Handle {handle} is not owned by this session")]
    UnknownHandle { handle: RemoteHandle },

    #[error("Port '{port}' binds {byte_length} bytes but {buffer} holds {expected} bytes")]
    BindingLengthMismatch {
        port: String,
        buffer: RemoteHandle,
        byte_length: u64,
        expected: u64,
    },

    /// A plan binds a port to a buffer name it never declares.
    #[error("Port '{port}' binds undeclared buffer '{buffer}'")]
    UnknownBuffer { port: String, buffer: String },

    #[error("Workload '{workload}' does not take parameter '{name}'")]
    UnknownParameter { workload: String, name: String },

    #[error("Parameter '{name}' of workload '{workload}' cannot be {value}")]
    InvalidParameter {
        workload: String,
        name: String,
        value: ParamValue,
    },

    #[error("Buffer name '{name}' declared more than once")]
    DuplicateBuffer { name: String },

    #[error("Definition {definition} cannot be freed while {live} resources are still live")]
    DefinitionInUse { definition: RemoteHandle, live: usize },

    #[error("Cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The remote side answered with a response of the wrong shape.
    #[error("Unexpected response to {operation}: {response}")]
    UnexpectedResponse {
        operation: &'static str,
        response: String,
    },
}

impl SessionError {
    /// True for transport failures, which make further remote calls pointless.
    pub fn is_channel(&self) -> bool {
        matches!(self, SessionError::Channel { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request and response messages exchanged with the remote engine.
//!
//! One [`Request`] yields exactly one [`Response`]. Application-level failures
//! come back as [`Response::Error`]; transport failures never reach this layer
//! and are reported by the channel as [`crate::errors::ChannelError`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::protocol::element::{ArrayData, ElementType};
use crate::protocol::handle::{RemoteHandle, ResourceKind};

/// Scalar value bound to a named action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    UInt(u64),
    Int(i64),
    Double(f64),
}

impl ParamValue {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            ParamValue::UInt(v) => Some(v),
            ParamValue::Int(v) => u64::try_from(v).ok(),
            ParamValue::Double(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ParamValue::UInt(v) => i64::try_from(v).ok(),
            ParamValue::Int(v) => Some(v),
            ParamValue::Double(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::UInt(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Double(v) => write!(f, "{}", v),
        }
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::UInt(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Double(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamDirection {
    Input,
    Output,
}

/// A buffer bound to a named port of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamBinding {
    pub buffer: RemoteHandle,
    pub byte_length: u64,
    pub direction: StreamDirection,
}

/// Wire form of a run descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub definition: RemoteHandle,
    pub action: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub streams: BTreeMap<String, StreamBinding>,
}

/// How a run call names the action to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRef {
    Inline(ActionSpec),
    Compiled(RemoteHandle),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    InitDefinition { name: String },
    FreeDefinition { definition: RemoteHandle },
    LoadEngine { definition: RemoteHandle, selector: String },
    UnloadEngine { engine: RemoteHandle },
    Allocate { element_type: ElementType, count: u64 },
    /// Releases a buffer or a compiled action.
    Free { handle: RemoteHandle },
    Send { buffer: RemoteHandle, data: ArrayData },
    Receive { buffer: RemoteHandle, element_type: ElementType, count: u64 },
    CompileAction { action: ActionSpec },
    Run { engine: RemoteHandle, action: ActionRef },
}

impl Request {
    /// Short operation name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::InitDefinition { .. } => "init_definition",
            Request::FreeDefinition { .. } => "free_definition",
            Request::LoadEngine { .. } => "load_engine",
            Request::UnloadEngine { .. } => "unload_engine",
            Request::Allocate { .. } => "allocate",
            Request::Free { .. } => "free",
            Request::Send { .. } => "send",
            Request::Receive { .. } => "receive",
            Request::CompileAction { .. } => "compile_action",
            Request::Run { .. } => "run",
        }
    }

    /// The request that gives `handle` back, chosen by its kind.
    pub fn release(handle: RemoteHandle) -> Request {
        match handle.kind {
            ResourceKind::Engine => Request::UnloadEngine { engine: handle },
            ResourceKind::Definition => Request::FreeDefinition { definition: handle },
            ResourceKind::Buffer | ResourceKind::Action => Request::Free { handle },
        }
    }

    /// Handle this request gives back, if it is a release of any kind.
    pub fn released_handle(&self) -> Option<RemoteHandle> {
        match *self {
            Request::UnloadEngine { engine } => Some(engine),
            Request::FreeDefinition { definition } => Some(definition),
            Request::Free { handle } => Some(handle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    OutOfMemory,
    UnknownDefinition,
    NoEngineAvailable,
    InvalidHandle,
    InvalidAction,
    InvalidArgument,
    ExecutionFailed,
}

/// Application-level failure reported by the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Handle { handle: RemoteHandle },
    Data { data: ArrayData },
    Done,
    Error { error: RemoteError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_json_is_tagged_by_operation() {
        let request = Request::Allocate {
            element_type: ElementType::Int32,
            count: 384,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"op":"allocate","element_type":"int32","count":384}"#);
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn run_with_compiled_action_survives_json() {
        let request = Request::Run {
            engine: RemoteHandle::new(2, ResourceKind::Engine),
            action: ActionRef::Compiled(RemoteHandle::new(9, ResourceKind::Action)),
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn param_values_convert_between_integer_kinds() {
        assert_eq!(ParamValue::UInt(3).as_i64(), Some(3));
        assert_eq!(ParamValue::Int(-1).as_u64(), None);
        assert_eq!(ParamValue::Double(1.5).as_u64(), None);
    }

    #[test]
    fn release_request_matches_handle_kind() {
        for (kind, op) in [
            (ResourceKind::Engine, "unload_engine"),
            (ResourceKind::Definition, "free_definition"),
            (ResourceKind::Buffer, "free"),
            (ResourceKind::Action, "free"),
        ] {
            let handle = RemoteHandle::new(7, kind);
            let request = Request::release(handle);
            assert_eq!(request.operation(), op);
            assert_eq!(request.released_handle(), Some(handle));
        }
        let allocate = Request::Allocate {
            element_type: ElementType::Int32,
            count: 1,
        };
        assert_eq!(allocate.released_handle(), None);
    }
}

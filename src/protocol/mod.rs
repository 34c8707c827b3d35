// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire-level vocabulary shared by the session core, the channels and the
//! simulated engine.

pub mod element;
pub mod handle;
pub mod message;

pub use element::{ArrayData, Element, ElementType, Scalar};
pub use handle::{
    BufferHandle, CompiledActionHandle, DefinitionHandle, EngineHandle, RemoteHandle, ResourceKind,
};
pub use message::{
    ActionRef, ActionSpec, ParamValue, RemoteError, RemoteErrorKind, Request, Response,
    StreamBinding, StreamDirection,
};

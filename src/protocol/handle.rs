// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Opaque references to resources living on the remote engine.
//!
//! Every remote object is addressed by a [`RemoteHandle`]: the identifier the
//! server handed out plus a tag naming what kind of resource it is. The typed
//! wrappers below carry the extra client-side facts the session needs to enforce
//! its invariants (element type and count for buffers, the originating definition
//! for engines and compiled actions).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::element::ElementType;

/// Kind of remote resource a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Definition,
    Engine,
    Buffer,
    Action,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Definition => "definition",
            ResourceKind::Engine => "engine",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Action => "action",
        };
        f.write_str(name)
    }
}

/// Server-side identifier tagged with its resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteHandle {
    pub id: u64,
    pub kind: ResourceKind,
}

impl RemoteHandle {
    pub fn new(id: u64, kind: ResourceKind) -> Self {
        Self { id, kind }
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// A loaded computation definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionHandle {
    pub(crate) handle: RemoteHandle,
    pub(crate) name: String,
}

impl DefinitionHandle {
    pub fn handle(&self) -> RemoteHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A runnable engine instance.
///
/// Deliberately not `Clone`: unloading consumes the value, so an engine can only
/// be unloaded once through the public API.
#[derive(Debug, PartialEq, Eq)]
pub struct EngineHandle {
    pub(crate) handle: RemoteHandle,
    pub(crate) definition: RemoteHandle,
}

impl EngineHandle {
    pub fn handle(&self) -> RemoteHandle {
        self.handle
    }

    /// The definition this engine was loaded from.
    pub fn definition(&self) -> RemoteHandle {
        self.definition
    }
}

/// A block of remote memory holding `count` elements of `element_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    pub(crate) handle: RemoteHandle,
    pub(crate) element_type: ElementType,
    pub(crate) count: usize,
}

impl BufferHandle {
    pub fn handle(&self) -> RemoteHandle {
        self.handle
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn byte_len(&self) -> u64 {
        self.count as u64 * self.element_type.size_bytes() as u64
    }
}

/// A run descriptor the remote side has already validated and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledActionHandle {
    pub(crate) handle: RemoteHandle,
    pub(crate) definition: RemoteHandle,
    pub(crate) action: String,
}

impl CompiledActionHandle {
    pub fn handle(&self) -> RemoteHandle {
        self.handle
    }

    pub fn definition(&self) -> RemoteHandle {
        self.definition
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl From<&BufferHandle> for RemoteHandle {
    fn from(buffer: &BufferHandle) -> Self {
        buffer.handle
    }
}

impl From<&CompiledActionHandle> for RemoteHandle {
    fn from(action: &CompiledActionHandle) -> Self {
        action.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_byte_len_uses_element_size() {
        let buffer = BufferHandle {
            handle: RemoteHandle::new(7, ResourceKind::Buffer),
            element_type: ElementType::Float64,
            count: 1024,
        };
        assert_eq!(buffer.byte_len(), 8192);
    }

    #[test]
    fn handle_display_includes_kind() {
        let handle = RemoteHandle::new(3, ResourceKind::Engine);
        assert_eq!(handle.to_string(), "engine#3");
    }
}

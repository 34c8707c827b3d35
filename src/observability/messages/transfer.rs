// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for remote buffers and the data moved through them.

use crate::observability::messages::StructuredLog;
use crate::protocol::{ElementType, RemoteHandle};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Remote buffer allocated.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct BufferAllocated {
    pub buffer: RemoteHandle,
    pub element_type: ElementType,
    pub count: usize,
}

impl Display for BufferAllocated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Allocated {} ({} x {})",
            self.buffer, self.count, self.element_type
        )
    }
}

impl StructuredLog for BufferAllocated {
    fn log(&self) {
        tracing::debug!(
            buffer = %self.buffer,
            element_type = %self.element_type,
            count = self.count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "buffer_allocated",
            span_name = name,
            buffer = %self.buffer,
            count = self.count,
        )
    }
}

/// Remote buffer or compiled action released.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct HandleReleased {
    pub handle: RemoteHandle,
}

impl Display for HandleReleased {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Released {}", self.handle)
    }
}

impl StructuredLog for HandleReleased {
    fn log(&self) {
        tracing::debug!(handle = %self.handle, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("handle_released", span_name = name, handle = %self.handle)
    }
}

/// Direction of a completed data transfer.
#[derive(Debug, Clone, Copy)]
pub enum TransferDirection {
    Upload,
    Download,
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TransferDirection::Upload => write!(f, "upload"),
            TransferDirection::Download => write!(f, "download"),
        }
    }
}

/// Data moved to or from a remote buffer.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use the_dfe_client::observability::messages::transfer::{DataTransferred, TransferDirection};
/// use the_dfe_client::protocol::{RemoteHandle, ResourceKind};
/// use std::time::Duration;
///
/// let msg = DataTransferred {
///     direction: TransferDirection::Upload,
///     buffer: RemoteHandle::new(4, ResourceKind::Buffer),
///     elements: 1024,
///     bytes: 8192,
///     duration: Duration::from_micros(250),
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct DataTransferred {
    pub direction: TransferDirection,
    pub buffer: RemoteHandle,
    pub elements: usize,
    pub bytes: usize,
    pub duration: Duration,
}

impl Display for DataTransferred {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} of {} elements ({} bytes) on {} took {:?}",
            self.direction, self.elements, self.bytes, self.buffer, self.duration
        )
    }
}

impl StructuredLog for DataTransferred {
    fn log(&self) {
        tracing::debug!(
            direction = %self.direction,
            buffer = %self.buffer,
            elements = self.elements,
            bytes = self.bytes,
            duration_us = self.duration.as_micros() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "data_transfer",
            span_name = name,
            direction = %self.direction,
            buffer = %self.buffer,
            elements = self.elements,
        )
    }
}

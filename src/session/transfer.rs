// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Moving typed arrays to and from remote buffers.
//!
//! Sizes are checked against the buffer's allocated count before any data is
//! sent, and the length the remote side returns must match what was asked for.
//! A failed download leaves the output slice in an unspecified state.

use std::time::Instant;

use crate::errors::{SessionError, SessionResult};
use crate::observability::messages::transfer::{DataTransferred, TransferDirection};
use crate::observability::messages::StructuredLog;
use crate::protocol::{BufferHandle, Element, Request, Response};
use crate::session::lifecycle::Session;
use crate::traits::RpcChannel;

impl<'c, C: RpcChannel + ?Sized> Session<'c, C> {
    fn check_transfer<T: Element>(
        &self,
        operation: &'static str,
        buffer: &BufferHandle,
        elements: usize,
    ) -> SessionResult<()> {
        self.ensure_open(operation)?;
        self.registry.check_live(buffer.handle)?;

        if T::TYPE != buffer.element_type {
            return Err(SessionError::ElementTypeMismatch {
                buffer: buffer.handle,
                expected: buffer.element_type,
                actual: T::TYPE,
            });
        }
        if elements > buffer.count {
            return Err(SessionError::BufferOverflow {
                buffer: buffer.handle,
                capacity: buffer.count,
                requested: elements,
            });
        }
        Ok(())
    }

    /// Sends exactly `data.len()` elements into `buffer`.
    pub async fn upload<T: Element>(&mut self, buffer: &BufferHandle, data: &[T]) -> SessionResult<()> {
        self.check_transfer::<T>("upload", buffer, data.len())?;

        let started = Instant::now();
        let response = self
            .call(Request::Send {
                buffer: buffer.handle,
                data: T::into_array(data.to_vec()),
            })
            .await?;
        Self::expect_done("send", response)?;

        DataTransferred {
            direction: TransferDirection::Upload,
            buffer: buffer.handle,
            elements: data.len(),
            bytes: data.len() * T::TYPE.size_bytes(),
            duration: started.elapsed(),
        }
        .log();
        Ok(())
    }

    /// Fills `out` with the first `out.len()` elements of `buffer`.
    pub async fn download<T: Element>(
        &mut self,
        buffer: &BufferHandle,
        out: &mut [T],
    ) -> SessionResult<()> {
        let count = out.len();
        self.check_transfer::<T>("download", buffer, count)?;

        let started = Instant::now();
        let response = self
            .call(Request::Receive {
                buffer: buffer.handle,
                element_type: buffer.element_type,
                count: count as u64,
            })
            .await?;

        let data = match response {
            Response::Data { data } => data,
            Response::Error { error } => {
                return Err(SessionError::Remote {
                    operation: "receive",
                    error,
                })
            }
            other => {
                return Err(SessionError::UnexpectedResponse {
                    operation: "receive",
                    response: format!("{:?}", other),
                })
            }
        };

        let values = T::from_array(data).map_err(|other| SessionError::ElementTypeMismatch {
            buffer: buffer.handle,
            expected: buffer.element_type,
            actual: other.element_type(),
        })?;
        if values.len() != count {
            return Err(SessionError::TransferSizeMismatch {
                buffer: buffer.handle,
                expected: count,
                actual: values.len(),
            });
        }
        out.copy_from_slice(&values);

        DataTransferred {
            direction: TransferDirection::Download,
            buffer: buffer.handle,
            elements: count,
            bytes: count * T::TYPE.size_bytes(),
            duration: started.elapsed(),
        }
        .log();
        Ok(())
    }
}

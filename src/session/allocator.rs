// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Remote buffer allocation and release.

use crate::errors::{SessionError, SessionResult};
use crate::observability::messages::transfer::{BufferAllocated, HandleReleased};
use crate::observability::messages::StructuredLog;
use crate::protocol::{BufferHandle, ElementType, RemoteHandle, Request, ResourceKind, Response};
use crate::session::lifecycle::Session;
use crate::session::SessionState;
use crate::traits::RpcChannel;

impl<'c, C: RpcChannel + ?Sized> Session<'c, C> {
    /// Allocates `count` elements of `element_type` on the remote side.
    ///
    /// A refusal is surfaced as `RemoteAllocation` and is never retried.
    pub async fn allocate(
        &mut self,
        element_type: ElementType,
        count: usize,
    ) -> SessionResult<BufferHandle> {
        self.ensure_open("allocate")?;

        let response = self
            .call(Request::Allocate {
                element_type,
                count: count as u64,
            })
            .await?;

        let handle = match response {
            Response::Error { error } => {
                return Err(SessionError::RemoteAllocation {
                    element_type,
                    count,
                    reason: error,
                })
            }
            other => self.expect_handle("allocate", other, ResourceKind::Buffer)?,
        };
        self.registry.register(handle, None)?;

        BufferAllocated {
            buffer: handle,
            element_type,
            count,
        }
        .log();
        if matches!(self.state(), SessionState::EngineLoaded | SessionState::Completed) {
            self.transition(SessionState::Staged);
        }

        Ok(BufferHandle {
            handle,
            element_type,
            count,
        })
    }

    /// Releases a buffer or compiled action. Releasing the same handle twice is
    /// a `DoubleFree`, detected before anything is sent.
    pub async fn release(&mut self, handle: impl Into<RemoteHandle>) -> SessionResult<()> {
        let handle = handle.into();
        self.ensure_open("release")?;
        if !matches!(handle.kind, ResourceKind::Buffer | ResourceKind::Action) {
            return Err(SessionError::NotReleasable {
                handle,
                kind: handle.kind,
            });
        }
        self.registry.check_releasable(handle)?;

        self.registry.mark_released(handle);
        let response = self.call(Request::Free { handle }).await?;
        Self::expect_done("free", response)?;

        HandleReleased { handle }.log();
        Ok(())
    }

    /// Releases every live buffer and compiled action, newest first.
    pub async fn release_all(&mut self) -> SessionResult<()> {
        for handle in self.registry.releasable_in_reverse() {
            self.release(handle).await?;
        }
        Ok(())
    }
}

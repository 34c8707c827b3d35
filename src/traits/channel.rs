// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::ChannelError;
use crate::protocol::{Request, Response};

/// Request/response channel to a remote dataflow engine.
///
/// Implementations carry one outstanding call at a time: `call` resolves only
/// once the matching response has arrived. Transport problems are reported as
/// `Err(ChannelError)`; failures of the remote operation itself come back as
/// `Ok(Response::Error { .. })`.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response, ChannelError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<C: RpcChannel + ?Sized> RpcChannel for Arc<C> {
    async fn call(&self, request: Request) -> Result<Response, ChannelError> {
        (**self).call(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

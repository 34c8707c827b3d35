// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process dataflow engine.
//!
//! `SimulatedEngine` implements [`RpcChannel`] directly, answering every
//! request from an in-memory model of the remote side: a pool of engine slots,
//! host-visible buffer memory with a hard limit, per-engine LMem, and the
//! computations registered in a [`KernelRegistry`]. Run descriptors are checked
//! against the action's signature both when compiled and when run.
//!
//! # Example
//! ```rust
//! use the_dfe_client::backends::simulated::{SimulatedConfig, SimulatedEngine};
//! use the_dfe_client::session::Session;
//!
//! let engine = SimulatedEngine::new(SimulatedConfig::default());
//! let runtime = tokio::runtime::Runtime::new()?;
//! runtime.block_on(async {
//!     let mut session = Session::new(&engine);
//!     let definition = session.init_definition("PassThrough").await?;
//!     session.free_definition(definition).await
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod kernels;
pub mod state;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::consts::{DEFAULT_ENGINES, DEFAULT_LMEM_BYTES, DEFAULT_MEMORY_LIMIT_BYTES};
use crate::errors::ChannelError;
use crate::protocol::{Request, Response};
use crate::traits::RpcChannel;

pub use kernels::{ActionSignature, Kernel, KernelContext, KernelRegistry};
pub use state::EngineState;

/// Capacity of the simulated remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Number of engine slots `load_engine` can fill.
    pub engines: usize,
    /// Total bytes of live buffers.
    pub memory_limit_bytes: usize,
    /// Addressable LMem per engine.
    pub lmem_bytes: usize,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            engines: DEFAULT_ENGINES,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            lmem_bytes: DEFAULT_LMEM_BYTES,
        }
    }
}

pub struct SimulatedEngine {
    config: SimulatedConfig,
    kernels: KernelRegistry,
    state: Mutex<EngineState>,
}

impl SimulatedEngine {
    pub fn new(config: SimulatedConfig) -> Self {
        Self::with_kernels(config, KernelRegistry::default())
    }

    pub fn with_kernels(config: SimulatedConfig, kernels: KernelRegistry) -> Self {
        let state = Mutex::new(EngineState::new(config.engines));
        Self {
            config,
            kernels,
            state,
        }
    }

    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    /// Definitions, engines, buffers and compiled actions not yet released.
    pub async fn live_resources(&self) -> usize {
        self.state.lock().await.live_resources()
    }

    pub async fn memory_in_use(&self) -> usize {
        self.state.lock().await.memory_in_use()
    }
}

#[async_trait]
impl RpcChannel for SimulatedEngine {
    async fn call(&self, request: Request) -> Result<Response, ChannelError> {
        let operation = request.operation();
        let mut state = self.state.lock().await;
        let response = state.handle(request, &self.kernels, &self.config);
        if let Response::Error { error } = &response {
            tracing::debug!(operation = operation, kind = ?error.kind, "{}", error.message);
        }
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::simulated::SimulatedEngine;
use crate::backends::tcp::TcpChannel;
use crate::config::{ChannelConfig, Config};
use crate::errors::ChannelError;
use crate::traits::RpcChannel;
use crate::workloads::{SessionRequest, WorkloadKind};

/// Builds a ready-to-drive runtime from configuration.
///
/// # Example
/// ```
/// use the_dfe_client::config::{Config, RuntimeBuilder};
/// use the_dfe_client::traits::RpcChannel;
///
/// let config: Config = serde_yaml::from_str("sessions:\n  - workload: simple\n")?;
/// let runtime = tokio::runtime::Runtime::new()?;
/// let (channel, sessions) = runtime.block_on(RuntimeBuilder::from_config(&config))?;
///
/// assert_eq!(channel.name(), "simulated");
/// assert_eq!(sessions.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Opens the configured channel and turns every session entry into a
    /// request, in file order.
    pub async fn from_config(
        cfg: &Config,
    ) -> Result<(Arc<dyn RpcChannel>, Vec<(WorkloadKind, SessionRequest)>), ChannelError> {
        let channel = Self::channel(&cfg.channel).await?;
        let sessions = cfg
            .sessions
            .iter()
            .map(|s| (s.workload, s.to_request()))
            .collect();
        Ok((channel, sessions))
    }

    /// Opens a channel. TCP channels connect eagerly.
    pub async fn channel(cfg: &ChannelConfig) -> Result<Arc<dyn RpcChannel>, ChannelError> {
        match cfg {
            ChannelConfig::Simulated(sim) => Ok(Arc::new(SimulatedEngine::new(sim.clone()))),
            ChannelConfig::Tcp(tcp) => Ok(Arc::new(
                TcpChannel::connect(tcp.address.clone(), tcp.request_timeout()).await?,
            )),
        }
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::backends::simulated::SimulatedConfig;
use crate::config::consts::{ANY_ENGINE, DEFAULT_ADDRESS};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;
use crate::protocol::ParamValue;
use crate::session::ActionMode;
use crate::workloads::{SessionRequest, WorkloadKind};

/// Top-level configuration: which channel to drive and which sessions to run
/// over it, in order.
///
/// # Example
/// ```yaml
/// channel:
///   kind: tcp
///   address: "dfe-host:9090"
///   request_timeout_ms: 5000
/// sessions:
///   - workload: simple
///   - workload: vector_addition
///     size: 1024
///     action_mode: compiled
///     params:
///       A: 7
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

/// Transport used to reach the engine.
///
/// # Variants
/// * `Simulated` - In-process engine, no network involved
/// * `Tcp` - Engine server reached over newline-delimited JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelConfig {
    Simulated(SimulatedConfig),
    Tcp(TcpConfig),
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig::Simulated(SimulatedConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TcpConfig {
    #[serde(default = "default_address")]
    pub address: String,
    /// Per-request limit; requests wait indefinitely when absent.
    pub request_timeout_ms: Option<u64>,
}

impl TcpConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout_ms: None,
        }
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn any_engine() -> String {
    ANY_ENGINE.to_string()
}

/// One session to run.
///
/// # Fields
/// * `workload` - Computation to drive
/// * `size` - Elements per stream (defaults to the workload's own size)
/// * `action_mode` - `inline` or `compiled` run descriptors
/// * `selector` - Engine selector passed to `load_engine`
/// * `params` - Scalar parameter overrides, e.g. `A` for `vector_addition`
/// * `seed` - Seed for random inputs
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    pub workload: WorkloadKind,
    pub size: Option<usize>,
    #[serde(default)]
    pub action_mode: ActionMode,
    #[serde(default = "any_engine")]
    pub selector: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn size(&self) -> usize {
        self.size.unwrap_or_else(|| self.workload.default_size())
    }

    pub fn to_request(&self) -> SessionRequest {
        SessionRequest {
            size: self.size(),
            params: self.params.clone(),
            mode: self.action_mode,
            selector: self.selector.clone(),
            seed: self.seed,
        }
    }
}

/// Load a config from a YAML (`.yaml`, `.yml`) or TOML (`.toml`) file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        "toml" => Ok(toml::from_str(&content)?),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Load a config and validate it, reporting every problem found at once.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_yaml_uses_defaults() {
        let yaml = r#"
sessions:
  - workload: simple
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.channel, ChannelConfig::default());
        let session = &cfg.sessions[0];
        assert_eq!(session.size(), WorkloadKind::Simple.default_size());
        assert_eq!(session.action_mode, ActionMode::Inline);
        assert_eq!(session.selector, ANY_ENGINE);
        assert!(session.params.is_empty());
    }

    #[test]
    fn parse_tcp_channel_with_timeout() {
        let yaml = r#"
channel:
  kind: tcp
  address: "10.0.0.5:9090"
  request_timeout_ms: 250
sessions: []
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        match cfg.channel {
            ChannelConfig::Tcp(tcp) => {
                assert_eq!(tcp.address, "10.0.0.5:9090");
                assert_eq!(tcp.request_timeout(), Some(Duration::from_millis(250)));
            }
            other => panic!("expected tcp channel, got {:?}", other),
        }
    }

    #[test]
    fn parse_partial_simulated_channel() {
        let yaml = r#"
channel:
  kind: simulated
  engines: 4
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let expected = SimulatedConfig {
            engines: 4,
            ..SimulatedConfig::default()
        };
        assert_eq!(cfg.channel, ChannelConfig::Simulated(expected));
        assert!(cfg.sessions.is_empty());
    }

    #[test]
    fn session_config_becomes_request() {
        let yaml = r#"
workload: vector_addition
size: 64
action_mode: compiled
selector: "local:0"
params:
  A: -2
seed: 9
"#;
        let session: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        let request = session.to_request();
        assert_eq!(request.size, 64);
        assert_eq!(request.mode, ActionMode::Compiled);
        assert_eq!(request.selector, "local:0");
        assert_eq!(request.params.get("A"), Some(&ParamValue::Int(-2)));
        assert_eq!(request.seed, Some(9));
    }

    #[test]
    fn unknown_workload_fails_to_parse() {
        let yaml = "workload: matrix_multiply\n";
        assert!(serde_yaml::from_str::<SessionConfig>(yaml).is_err());
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

use crate::workloads::WorkloadKind;

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A single problem found while validating a loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The configuration declares no sessions to run
    NoSessions,
    /// The simulated engine was configured without any engines
    NoEngines,
    /// A TCP channel was configured with an empty address
    EmptyAddress,
    /// A session requested zero elements
    ZeroSize { session: usize },
    /// A session is smaller than its workload can process
    SizeBelowMinimum {
        session: usize,
        workload: WorkloadKind,
        size: usize,
        minimum: usize,
    },
    /// A session sets a parameter its workload does not accept
    UnknownParameter {
        session: usize,
        workload: WorkloadKind,
        name: String,
    },
    /// A session uses an empty engine selector
    EmptySelector { session: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoSessions => write!(f, "No sessions configured"),
            ValidationError::NoEngines => {
                write!(f, "Simulated channel must provide at least one engine")
            }
            ValidationError::EmptyAddress => write!(f, "TCP channel address is empty"),
            ValidationError::ZeroSize { session } => {
                write!(f, "Session {} requests zero elements", session)
            }
            ValidationError::SizeBelowMinimum {
                session,
                workload,
                size,
                minimum,
            } => write!(
                f,
                "Session {} ({}) requests {} elements but needs at least {}",
                session, workload, size, minimum
            ),
            ValidationError::UnknownParameter {
                session,
                workload,
                name,
            } => write!(
                f,
                "Session {} ({}) sets unknown parameter '{}'",
                session, workload, name
            ),
            ValidationError::EmptySelector { session } => {
                write!(f, "Session {} has an empty engine selector", session)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every check runs regardless of earlier failures so a broken config file is
//! reported in one pass:
//!
//! 1. **Channel**: a simulated channel needs at least one engine, a TCP channel
//!    needs an address
//! 2. **Sessions**: at least one must be configured
//! 3. **Per session**: size is non-zero and at least the workload minimum,
//!    every parameter is one the workload accepts, the selector is non-empty
//!
//! Session numbers in the errors are positions in the `sessions` list,
//! starting at 1.

use crate::config::{ChannelConfig, Config, SessionConfig};
use crate::errors::ValidationError;

pub fn validate_config(cfg: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &cfg.channel {
        ChannelConfig::Simulated(sim) if sim.engines == 0 => errors.push(ValidationError::NoEngines),
        ChannelConfig::Tcp(tcp) if tcp.address.trim().is_empty() => {
            errors.push(ValidationError::EmptyAddress)
        }
        _ => {}
    }

    if cfg.sessions.is_empty() {
        errors.push(ValidationError::NoSessions);
    }

    for (index, session) in cfg.sessions.iter().enumerate() {
        validate_session(index + 1, session, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_session(number: usize, session: &SessionConfig, errors: &mut Vec<ValidationError>) {
    let workload = session.workload;
    let size = session.size();

    if size == 0 {
        errors.push(ValidationError::ZeroSize { session: number });
    } else if size < workload.minimum_size() {
        errors.push(ValidationError::SizeBelowMinimum {
            session: number,
            workload,
            size,
            minimum: workload.minimum_size(),
        });
    }

    for name in session.params.keys() {
        if !workload.accepted_params().contains(&name.as_str()) {
            errors.push(ValidationError::UnknownParameter {
                session: number,
                workload,
                name: name.clone(),
            });
        }
    }

    if session.selector.trim().is_empty() {
        errors.push(ValidationError::EmptySelector { session: number });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::SimulatedConfig;
    use crate::config::TcpConfig;
    use crate::workloads::WorkloadKind;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let cfg = parse(
            r#"
sessions:
  - workload: moving_average
    size: 2
  - workload: vector_addition
    params:
      A: 5
"#,
        );
        assert_eq!(validate_config(&cfg), Ok(()));
    }

    #[test]
    fn all_problems_are_reported_together() {
        let cfg = parse(
            r#"
sessions:
  - workload: simple
    size: 0
  - workload: moving_average
    size: 1
  - workload: pass_through
    selector: ""
    params:
      A: 1
"#,
        );
        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroSize { session: 1 },
                ValidationError::SizeBelowMinimum {
                    session: 2,
                    workload: WorkloadKind::MovingAverage,
                    size: 1,
                    minimum: 2,
                },
                ValidationError::UnknownParameter {
                    session: 3,
                    workload: WorkloadKind::PassThrough,
                    name: "A".to_string(),
                },
                ValidationError::EmptySelector { session: 3 },
            ]
        );
    }

    #[test]
    fn channel_problems_are_reported() {
        let mut cfg = parse("sessions: []\n");
        cfg.channel = ChannelConfig::Simulated(SimulatedConfig {
            engines: 0,
            ..SimulatedConfig::default()
        });
        assert_eq!(
            validate_config(&cfg).unwrap_err(),
            vec![ValidationError::NoEngines, ValidationError::NoSessions]
        );

        cfg.channel = ChannelConfig::Tcp(TcpConfig {
            address: "  ".to_string(),
            request_timeout_ms: None,
        });
        assert_eq!(
            validate_config(&cfg).unwrap_err(),
            vec![ValidationError::EmptyAddress, ValidationError::NoSessions]
        );
    }
}

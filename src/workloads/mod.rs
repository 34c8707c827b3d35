// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready-made sessions for the computations the engine ships with.
//!
//! Each workload module provides three pieces: an input generator, the
//! [`SessionPlan`] that drives the computation, and a pure reference function
//! the accelerated output is compared against. [`run_session`] ties them
//! together:
//!
//! ```text
//! inputs -> plan -> ExecutionController::execute -> compare(output, reference)
//! ```
//!
//! # Example
//! ```rust
//! use the_dfe_client::backends::simulated::{SimulatedConfig, SimulatedEngine};
//! use the_dfe_client::workloads::{run_session, SessionRequest, WorkloadKind};
//!
//! let engine = SimulatedEngine::new(SimulatedConfig::default());
//! let runtime = tokio::runtime::Runtime::new()?;
//! let report = runtime.block_on(run_session(
//!     &engine,
//!     WorkloadKind::Simple,
//!     &SessionRequest::for_workload(WorkloadKind::Simple),
//! ))?;
//! assert!(report.passed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod lmem_loopback;
pub mod moving_average;
pub mod pass_through;
pub mod simple;
pub mod vector_addition;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::consts::ANY_ENGINE;
use crate::errors::{SessionError, SessionResult};
use crate::protocol::{ArrayData, Element, ElementType, ParamValue, Scalar};
use crate::session::verifier::{self, Verdict};
use crate::session::{ActionMode, ExecutionController, SessionPlan, StepTiming};
use crate::traits::RpcChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Simple,
    PassThrough,
    VectorAddition,
    LmemLoopback,
    MovingAverage,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 5] = [
        WorkloadKind::Simple,
        WorkloadKind::PassThrough,
        WorkloadKind::VectorAddition,
        WorkloadKind::LmemLoopback,
        WorkloadKind::MovingAverage,
    ];

    /// Name of the computation definition on the remote side.
    pub fn definition_name(&self) -> &'static str {
        match self {
            WorkloadKind::Simple => "Simple",
            WorkloadKind::PassThrough => "PassThrough",
            WorkloadKind::VectorAddition => "VectorAddition",
            WorkloadKind::LmemLoopback => "LMemLoopback",
            WorkloadKind::MovingAverage => "MovingAverage",
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            WorkloadKind::Simple => ElementType::Float64,
            WorkloadKind::PassThrough | WorkloadKind::MovingAverage => ElementType::Float32,
            WorkloadKind::VectorAddition | WorkloadKind::LmemLoopback => ElementType::Int32,
        }
    }

    pub fn default_size(&self) -> usize {
        match self {
            WorkloadKind::Simple => simple::DEFAULT_SIZE,
            WorkloadKind::PassThrough => pass_through::DEFAULT_SIZE,
            WorkloadKind::VectorAddition => vector_addition::DEFAULT_SIZE,
            WorkloadKind::LmemLoopback => lmem_loopback::DEFAULT_SIZE,
            WorkloadKind::MovingAverage => moving_average::DEFAULT_SIZE,
        }
    }

    pub fn minimum_size(&self) -> usize {
        match self {
            WorkloadKind::MovingAverage => moving_average::MINIMUM_SIZE,
            _ => 1,
        }
    }

    /// Scalar parameters a request may override.
    pub fn accepted_params(&self) -> &'static [&'static str] {
        match self {
            WorkloadKind::VectorAddition => &[vector_addition::SCALAR_PARAM],
            _ => &[],
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkloadKind::Simple => "simple",
            WorkloadKind::PassThrough => "pass_through",
            WorkloadKind::VectorAddition => "vector_addition",
            WorkloadKind::LmemLoopback => "lmem_loopback",
            WorkloadKind::MovingAverage => "moving_average",
        };
        f.write_str(name)
    }
}

/// Knobs for one run of a workload.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub size: usize,
    pub params: BTreeMap<String, ParamValue>,
    pub mode: ActionMode,
    pub selector: String,
    /// Seed for randomly generated inputs; fresh entropy when absent.
    pub seed: Option<u64>,
}

impl SessionRequest {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            params: BTreeMap::new(),
            mode: ActionMode::default(),
            selector: ANY_ENGINE.to_string(),
            seed: None,
        }
    }

    pub fn for_workload(kind: WorkloadKind) -> Self {
        Self::new(kind.default_size())
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn mode(mut self, mode: ActionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn apply<T: Element>(&self, plan: SessionPlan<T>) -> SessionPlan<T> {
        plan.selector(self.selector.clone()).with_mode(self.mode)
    }
}

/// What a completed session produced and how it compared to the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub workload: WorkloadKind,
    pub element_type: ElementType,
    pub output: ArrayData,
    pub verdict: Verdict<Scalar>,
    pub timings: Vec<StepTiming>,
}

impl SessionReport {
    pub fn passed(&self) -> bool {
        self.verdict.passed()
    }
}

/// Runs one complete session of `kind` and verifies its output.
///
/// A mismatching output is reported through the verdict; `Err` means the
/// session itself failed, after all remote resources were released.
pub async fn run_session<C: RpcChannel + ?Sized>(
    channel: &C,
    kind: WorkloadKind,
    request: &SessionRequest,
) -> SessionResult<SessionReport> {
    if let Some(name) = request
        .params
        .keys()
        .find(|name| !kind.accepted_params().contains(&name.as_str()))
    {
        return Err(SessionError::UnknownParameter {
            workload: kind.to_string(),
            name: name.clone(),
        });
    }

    match kind {
        WorkloadKind::Simple => simple::run(channel, request).await,
        WorkloadKind::PassThrough => pass_through::run(channel, request).await,
        WorkloadKind::VectorAddition => vector_addition::run(channel, request).await,
        WorkloadKind::LmemLoopback => lmem_loopback::run(channel, request).await,
        WorkloadKind::MovingAverage => moving_average::run(channel, request).await,
    }
}

/// Executes `plan`, takes the output named `output` and compares it against
/// `reference` element by element.
pub(crate) async fn execute_and_verify<C: RpcChannel + ?Sized, T: Element>(
    channel: &C,
    kind: WorkloadKind,
    request: &SessionRequest,
    plan: SessionPlan<T>,
    output: &str,
    reference: Vec<T>,
) -> SessionResult<SessionReport> {
    let plan = request.apply(plan);
    let mut result = ExecutionController::new(channel).execute(&plan).await?;
    let accelerated = result.take(output).unwrap_or_default();

    let verdict = verifier::compare(&accelerated, &reference, reference.len());
    verifier::report(&kind.to_string(), &verdict);

    Ok(SessionReport {
        workload: kind,
        element_type: T::TYPE,
        output: T::into_array(accelerated),
        verdict: verdict.to_scalar(),
        timings: result.timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{SimulatedConfig, SimulatedEngine};

    #[test]
    fn definition_names_match_engine_computations() {
        let names: Vec<_> = WorkloadKind::ALL.iter().map(|k| k.definition_name()).collect();
        assert_eq!(
            names,
            vec!["Simple", "PassThrough", "VectorAddition", "LMemLoopback", "MovingAverage"]
        );
    }

    #[test]
    fn workload_names_round_trip_through_serde() {
        for kind in WorkloadKind::ALL {
            let yaml = serde_yaml::to_string(&kind).unwrap();
            assert_eq!(yaml.trim(), kind.to_string());
            assert_eq!(serde_yaml::from_str::<WorkloadKind>(&yaml).unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn every_workload_passes_in_both_modes() {
        let engine = SimulatedEngine::new(SimulatedConfig::default());
        for kind in WorkloadKind::ALL {
            for mode in [ActionMode::Inline, ActionMode::Compiled] {
                let request = SessionRequest::for_workload(kind).mode(mode).seed(7);
                let report = run_session(&engine, kind, &request).await.unwrap();
                assert!(report.passed(), "{} ({}) failed: {:?}", kind, mode, report.verdict);
                assert_eq!(report.output.len(), kind.default_size());
                assert_eq!(report.element_type, kind.element_type());
            }
        }
        assert_eq!(engine.live_resources().await, 0);
        assert_eq!(engine.memory_in_use().await, 0);
    }

    #[tokio::test]
    async fn unknown_parameter_is_rejected_before_any_call() {
        let engine = SimulatedEngine::new(SimulatedConfig::default());
        let request = SessionRequest::new(8).param("A", 3i64);
        let err = run_session(&engine, WorkloadKind::Simple, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownParameter { ref name, .. } if name == "A"));
    }
}

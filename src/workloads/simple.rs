// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `Simple`: `y = x * x + x` over doubles.

use crate::errors::SessionResult;
use crate::session::{ActionPlan, SessionPlan};
use crate::traits::RpcChannel;
use crate::workloads::{execute_and_verify, SessionReport, SessionRequest, WorkloadKind};

pub const DEFAULT_SIZE: usize = 1024;

/// `1.0, 2.0, ..., size`.
pub fn inputs(size: usize) -> Vec<f64> {
    (1..=size).map(|i| i as f64).collect()
}

pub fn reference(x: &[f64]) -> Vec<f64> {
    x.iter().map(|v| v * v + v).collect()
}

pub fn plan(x: Vec<f64>) -> SessionPlan<f64> {
    let n = x.len();
    SessionPlan::new(WorkloadKind::Simple.definition_name())
        .input("x", x)
        .output("y", n)
        .action(
            ActionPlan::new("default")
                .param("N", n as u64)
                .input("x", "x")
                .output("y", "y"),
        )
}

pub(crate) async fn run<C: RpcChannel + ?Sized>(
    channel: &C,
    request: &SessionRequest,
) -> SessionResult<SessionReport> {
    let x = inputs(request.size);
    let expected = reference(&x);
    execute_and_verify(channel, WorkloadKind::Simple, request, plan(x), "y", expected).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_matches_hand_computed_values() {
        assert_eq!(reference(&inputs(3)), vec![2.0, 6.0, 12.0]);
    }

    #[test]
    fn plan_streams_whole_buffers() {
        let plan = plan(inputs(16));
        assert_eq!(plan.outputs[0].count, 16);
        assert_eq!(plan.actions.len(), 1);
        assert!(plan.validate().is_ok());
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::SessionResult;
use crate::session::{ActionPlan, SessionPlan};
use crate::traits::RpcChannel;
use crate::workloads::{execute_and_verify, SessionReport, SessionRequest, WorkloadKind};

pub const DEFAULT_SIZE: usize = 384;

pub fn inputs(size: usize) -> Vec<f32> {
    (1..=size).map(|i| i as f32).collect()
}

pub fn reference(x: &[f32]) -> Vec<f32> {
    x.to_vec()
}

pub fn plan(x: Vec<f32>) -> SessionPlan<f32> {
    let n = x.len();
    SessionPlan::new(WorkloadKind::PassThrough.definition_name())
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
    execute_and_verify(channel, WorkloadKind::PassThrough, request, plan(x), "y", expected).await
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `LMemLoopback`: two arrays are written to LMem, summed on the engine, and the
//! sum is read back from LMem.

use crate::errors::SessionResult;
use crate::session::{ActionPlan, SessionPlan};
use crate::traits::RpcChannel;
use crate::workloads::{execute_and_verify, SessionReport, SessionRequest, WorkloadKind};

pub const DEFAULT_SIZE: usize = 384;

/// `a[i] = i` and `b[i] = size - i`.
pub fn inputs(size: usize) -> (Vec<i32>, Vec<i32>) {
    let size = size as i32;
    ((0..size).collect(), (0..size).map(|i| size - i).collect())
}

pub fn reference(a: &[i32], b: &[i32]) -> Vec<i32> {
    a.iter().zip(b).map(|(a, b)| a.wrapping_add(*b)).collect()
}

fn write_lmem(address: u64, nbytes: u64, buffer: &str) -> ActionPlan {
    ActionPlan::new("writeLMem")
        .param("address", address)
        .param("nbytes", nbytes)
        .input("cpu_to_lmem", buffer)
}

pub fn plan(a: Vec<i32>, b: Vec<i32>) -> SessionPlan<i32> {
    let n = a.len();
    let region = (n * std::mem::size_of::<i32>()) as u64;
    SessionPlan::new(WorkloadKind::LmemLoopback.definition_name())
        .input("a", a)
        .input("b", b)
        .output("sum", n)
        .action(write_lmem(0, region, "a"))
        .action(write_lmem(region, region, "b"))
        .action(ActionPlan::new("default").param("N", n as u64))
        .action(
            ActionPlan::new("readLMem")
                .param("address", 2 * region)
                .param("nbytes", region)
                .output("lmem_to_cpu", "sum"),
        )
}

pub(crate) async fn run<C: RpcChannel + ?Sized>(
    channel: &C,
    request: &SessionRequest,
) -> SessionResult<SessionReport> {
    let (a, b) = inputs(request.size);
    let expected = reference(&a, &b);
    execute_and_verify(channel, WorkloadKind::LmemLoopback, request, plan(a, b), "sum", expected)
        .await
}

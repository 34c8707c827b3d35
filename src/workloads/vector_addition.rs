// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `VectorAddition`: `s = x + y + A` over 32-bit integers.
//!
//! `x` is not streamed into the compute action. It is first written to the
//! engine's LMem by a `writeLMem` action, which therefore has to run before
//! `default`.

use rand::Rng;

use crate::errors::{SessionError, SessionResult};
use crate::protocol::ParamValue;
use crate::session::{ActionPlan, SessionPlan};
use crate::traits::RpcChannel;
use crate::workloads::{execute_and_verify, SessionReport, SessionRequest, WorkloadKind};

pub const DEFAULT_SIZE: usize = 384;
pub const SCALAR_PARAM: &str = "A";
pub const DEFAULT_SCALAR: i32 = 3;
/// Inputs are drawn from `[0, MAX_INPUT)`.
pub const MAX_INPUT: i32 = 100;

pub fn inputs(size: usize, rng: &mut impl Rng) -> (Vec<i32>, Vec<i32>) {
    let x = (0..size).map(|_| rng.gen_range(0..MAX_INPUT)).collect();
    let y = (0..size).map(|_| rng.gen_range(0..MAX_INPUT)).collect();
    (x, y)
}

pub fn reference(x: &[i32], y: &[i32], scalar: i32) -> Vec<i32> {
    x.iter()
        .zip(y)
        .map(|(x, y)| x.wrapping_add(*y).wrapping_add(scalar))
        .collect()
}

pub fn plan(x: Vec<i32>, y: Vec<i32>, scalar: i32) -> SessionPlan<i32> {
    let n = x.len();
    let nbytes = (n * std::mem::size_of::<i32>()) as u64;
    SessionPlan::new(WorkloadKind::VectorAddition.definition_name())
        .input("x", x)
        .input("y", y)
        .output("s", n)
        .action(
            ActionPlan::new("writeLMem")
                .param("address", 0u64)
                .param("nbytes", nbytes)
                .input("cpu_to_lmem", "x"),
        )
        .action(
            ActionPlan::new("default")
                .param(SCALAR_PARAM, scalar as i64)
                .param("N", n as u64)
                .input("y", "y")
                .output("s", "s"),
        )
}

/// Reads `A` from the request, falling back to [`DEFAULT_SCALAR`].
pub fn scalar(request: &SessionRequest) -> SessionResult<i32> {
    match request.params.get(SCALAR_PARAM) {
        None => Ok(DEFAULT_SCALAR),
        Some(value) => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| SessionError::InvalidParameter {
                workload: WorkloadKind::VectorAddition.to_string(),
                name: SCALAR_PARAM.to_string(),
                value: *value,
            }),
    }
}

pub(crate) async fn run<C: RpcChannel + ?Sized>(
    channel: &C,
    request: &SessionRequest,
) -> SessionResult<SessionReport> {
    let scalar = scalar(request)?;
    let (x, y) = inputs(request.size, &mut request.rng());
    let expected = reference(&x, &y, scalar);
    execute_and_verify(
        channel,
        WorkloadKind::VectorAddition,
        request,
        plan(x, y, scalar),
        "s",
        expected,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lmem_write_is_declared_before_compute() {
        let plan = plan(vec![1, 2], vec![3, 4], 3);
        let actions: Vec<_> = plan.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["writeLMem", "default"]);
        assert_eq!(plan.actions[0].params[1], ("nbytes".to_string(), ParamValue::UInt(8)));
    }

    #[test]
    fn scalar_defaults_and_rejects_fractions() {
        assert_eq!(scalar(&SessionRequest::new(4)).unwrap(), DEFAULT_SCALAR);
        assert_eq!(scalar(&SessionRequest::new(4).param("A", -7i64)).unwrap(), -7);
        assert!(matches!(
            scalar(&SessionRequest::new(4).param("A", 1.5f64)),
            Err(SessionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn reference_adds_scalar() {
        assert_eq!(reference(&[1, 2], &[10, 20], 3), vec![14, 25]);
    }
}

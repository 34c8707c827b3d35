// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `MovingAverage`: three-point average over floats, two-point at the edges.

use rand::Rng;

use crate::errors::SessionResult;
use crate::session::{ActionPlan, SessionPlan};
use crate::traits::RpcChannel;
use crate::workloads::{execute_and_verify, SessionReport, SessionRequest, WorkloadKind};

pub const DEFAULT_SIZE: usize = 384;
pub const MINIMUM_SIZE: usize = 2;
/// Inputs are whole numbers drawn from `[0, MAX_INPUT)`.
pub const MAX_INPUT: u32 = 1000;

pub fn inputs(size: usize, rng: &mut impl Rng) -> Vec<f32> {
    (0..size).map(|_| rng.gen_range(0..MAX_INPUT) as f32).collect()
}

pub fn reference(x: &[f32]) -> Vec<f32> {
    let n = x.len();
    if n < MINIMUM_SIZE {
        return Vec::new();
    }
    let mut y = Vec::with_capacity(n);
    y.push((x[0] + x[1]) / 2.0);
    for i in 1..n - 1 {
        y.push((x[i - 1] + x[i] + x[i + 1]) / 3.0);
    }
    y.push((x[n - 1] + x[n - 2]) / 2.0);
    y
}

pub fn plan(x: Vec<f32>) -> SessionPlan<f32> {
    let n = x.len();
    SessionPlan::new(WorkloadKind::MovingAverage.definition_name())
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
    let x = inputs(request.size, &mut request.rng());
    let expected = reference(&x);
    execute_and_verify(channel, WorkloadKind::MovingAverage, request, plan(x), "y", expected).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn edges_average_two_points() {
        assert_eq!(reference(&[2.0, 4.0, 6.0, 8.0]), vec![3.0, 4.0, 6.0, 7.0]);
        assert_eq!(reference(&[1.0, 3.0]), vec![2.0, 2.0]);
    }

    #[test]
    fn inputs_are_whole_numbers_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let x = inputs(500, &mut rng);
        assert!(x.iter().all(|v| *v >= 0.0 && *v < MAX_INPUT as f32 && v.fract() == 0.0));
    }
}

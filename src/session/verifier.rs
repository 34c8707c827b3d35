// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Element-wise comparison of accelerated output against the reference.

use std::fmt;

use crate::observability::messages::verify::{
    VerificationFailed, VerificationPassed, VerificationTruncated,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Element, Scalar};

/// Outcome of a comparison. A failing verdict is a result of a session that
/// itself completed correctly, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Pass {
        compared: usize,
    },
    /// First index where the two arrays differ.
    Mismatch {
        index: usize,
        accelerated: T,
        reference: T,
    },
    /// One of the arrays is shorter than the requested comparison length.
    Truncated {
        length: usize,
        accelerated: usize,
        reference: usize,
    },
}

impl<T> Verdict<T> {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }
}

impl<T: fmt::Display> fmt::Display for Verdict<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass { compared } => write!(f, "PASS ({} elements)", compared),
            Verdict::Mismatch {
                index,
                accelerated,
                reference,
            } => write!(
                f,
                "FAIL at index {}: got {}, expected {}",
                index, accelerated, reference
            ),
            Verdict::Truncated {
                length,
                accelerated,
                reference,
            } => write!(
                f,
                "FAIL: {} elements requested, accelerated has {}, reference has {}",
                length, accelerated, reference
            ),
        }
    }
}

impl<T: Element> Verdict<T> {
    pub fn to_scalar(&self) -> Verdict<Scalar> {
        match *self {
            Verdict::Pass { compared } => Verdict::Pass { compared },
            Verdict::Mismatch {
                index,
                accelerated,
                reference,
            } => Verdict::Mismatch {
                index,
                accelerated: accelerated.to_scalar(),
                reference: reference.to_scalar(),
            },
            Verdict::Truncated {
                length,
                accelerated,
                reference,
            } => Verdict::Truncated {
                length,
                accelerated,
                reference,
            },
        }
    }
}

/// Exact comparison of the first `length` elements, stopping at the first
/// difference.
pub fn compare<T: Element>(accelerated: &[T], reference: &[T], length: usize) -> Verdict<T> {
    if accelerated.len() < length || reference.len() < length {
        return Verdict::Truncated {
            length,
            accelerated: accelerated.len(),
            reference: reference.len(),
        };
    }

    accelerated[..length]
        .iter()
        .zip(&reference[..length])
        .position(|(a, r)| a != r)
        .map(|index| Verdict::Mismatch {
            index,
            accelerated: accelerated[index],
            reference: reference[index],
        })
        .unwrap_or(Verdict::Pass { compared: length })
}

/// Logs the verdict for `workload`.
pub fn report<T: Element>(workload: &str, verdict: &Verdict<T>) {
    match *verdict {
        Verdict::Pass { compared } => VerificationPassed {
            workload,
            elements: compared,
        }
        .log(),
        Verdict::Mismatch {
            index,
            accelerated,
            reference,
        } => VerificationFailed {
            workload,
            index,
            accelerated: accelerated.to_scalar(),
            reference: reference.to_scalar(),
        }
        .log(),
        Verdict::Truncated {
            length,
            accelerated,
            reference,
        } => VerificationTruncated {
            workload,
            length,
            accelerated,
            reference,
        }
        .log(),
    }
}

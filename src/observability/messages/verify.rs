// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for comparing accelerated output with the reference.

use crate::observability::messages::StructuredLog;
use crate::protocol::Scalar;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Accelerated output matched the reference element-wise.
///
/// # Log Level
/// `info!` - Important operational event
pub struct VerificationPassed<'a> {
    pub workload: &'a str,
    pub elements: usize,
}

impl Display for VerificationPassed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Verification of '{}' passed: {} elements match",
            self.workload, self.elements
        )
    }
}

impl StructuredLog for VerificationPassed<'_> {
    fn log(&self) {
        tracing::info!(workload = self.workload, elements = self.elements, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "verification",
            span_name = name,
            workload = self.workload,
            elements = self.elements,
        )
    }
}

/// First element where accelerated output and reference diverge.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_dfe_client::observability::messages::verify::VerificationFailed;
/// use the_dfe_client::protocol::Scalar;
///
/// let msg = VerificationFailed {
///     workload: "vector_addition",
///     index: 17,
///     accelerated: Scalar::Int32(40),
///     reference: Scalar::Int32(43),
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Verification of 'vector_addition' failed: output @ 17 = 40 (expected 43)"
/// );
/// ```
pub struct VerificationFailed<'a> {
    pub workload: &'a str,
    pub index: usize,
    pub accelerated: Scalar,
    pub reference: Scalar,
}

impl Display for VerificationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Verification of '{}' failed: output @ {} = {} (expected {})",
            self.workload, self.index, self.accelerated, self.reference
        )
    }
}

impl StructuredLog for VerificationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            workload = self.workload,
            index = self.index,
            accelerated = %self.accelerated,
            reference = %self.reference,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "verification_failed",
            span_name = name,
            workload = self.workload,
            index = self.index,
        )
    }
}

/// Output or reference shorter than the number of elements to compare.
///
/// # Log Level
/// `error!` - Verification failure
pub struct VerificationTruncated<'a> {
    pub workload: &'a str,
    pub length: usize,
    pub accelerated: usize,
    pub reference: usize,
}

impl Display for VerificationTruncated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Verification of '{}' failed: {} elements to compare, output has {}, reference has {}",
            self.workload, self.length, self.accelerated, self.reference
        )
    }
}

impl StructuredLog for VerificationTruncated<'_> {
    fn log(&self) {
        tracing::error!(
            workload = self.workload,
            length = self.length,
            accelerated = self.accelerated,
            reference = self.reference,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "verification_truncated",
            span_name = name,
            workload = self.workload,
            length = self.length,
        )
    }
}

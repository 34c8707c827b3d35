// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The remote resource-and-execution protocol.
//!
//! [`Session`] exposes each lifecycle operation individually and tracks every
//! handle it acquires. [`ExecutionController`] drives a whole [`SessionPlan`]
//! through the lifecycle and unwinds on failure.

pub mod action;
pub mod allocator;
pub mod controller;
pub mod lifecycle;
pub mod registry;
pub mod state;
pub mod transfer;
pub mod verifier;

#[cfg(test)]
mod integration_tests;

pub use action::{ActionMode, RunDescriptor, Submittable};
pub use controller::{
    ActionPlan, ExecutionController, PortBinding, SessionOutput, SessionPlan, SessionStep,
    StepTiming,
};
pub use lifecycle::Session;
pub use registry::HandleRegistry;
pub use state::SessionState;
pub use verifier::{compare, Verdict};

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Channel backends a session can drive.
//!
//! Every backend implements [`RpcChannel`](crate::traits::RpcChannel), so the
//! session layer never knows whether requests are answered in-process or by a
//! server on the other end of a socket.
//!
//! # Available Backends
//!
//! ## Simulated Backend
//! In-process model of the remote engine:
//! - **Computations**: Simple, PassThrough, VectorAddition, LMemLoopback, MovingAverage
//! - **Resources**: engine slots, buffer memory limit, per-engine LMem
//! - **Use Case**: demos, tests, and the backend behind `--serve`
//!
//! ## TCP Backend
//! Newline-delimited JSON over a TCP connection:
//! - **TcpChannel**: client side, optional per-request timeout
//! - **EngineServer**: exposes any backend to TCP clients
//!
//! ## Stub Backend (Test-Only)
//! - **RecordingChannel**: records every exchange and injects faults

pub mod simulated;
pub mod tcp;

#[cfg(test)]
pub mod stub;

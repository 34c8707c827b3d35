// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Newline-delimited JSON over TCP.
//!
//! Each frame is one [`Request`](crate::protocol::Request) or
//! [`Response`](crate::protocol::Response) serialized as a single JSON line.
//! [`TcpChannel`] is the client side; [`EngineServer`] exposes any
//! [`RpcChannel`](crate::traits::RpcChannel) backend, usually the simulated
//! engine, on a listening socket.

pub mod client;
pub mod server;

pub use client::TcpChannel;
pub use server::EngineServer;

#[cfg(test)]
mod integration_tests;

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends; // channel backends
pub mod config; // config loading + channel construction
pub mod errors; // error handling
pub mod observability;
pub mod protocol; // wire messages and handles
pub mod session; // resource lifecycle
pub mod traits; // unified abstractions
pub mod workloads; // built-in computations + references

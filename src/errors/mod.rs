// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod channel;
mod config;
mod session;

pub use channel::ChannelError;
pub use config::{ConfigError, ValidationError};
pub use session::{SessionError, SessionResult};

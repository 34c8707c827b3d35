// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::errors::ChannelError;
use crate::observability::messages::channel::{ChannelConnected, RequestFailed};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Request, Response};
use crate::traits::RpcChannel;

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn exchange(&mut self, request: &Request) -> Result<Response, ChannelError> {
        let mut frame = serde_json::to_vec(request)?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ChannelError::Closed);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

/// Client end of a TCP connection to an engine server.
///
/// Calls are serialized through a mutex so a response is always matched with
/// the request that produced it. Any transport failure drops the connection;
/// every later call fails with [`ChannelError::Closed`].
pub struct TcpChannel {
    address: String,
    request_timeout: Option<Duration>,
    connection: Mutex<Option<Connection>>,
}

impl TcpChannel {
    pub async fn connect(
        address: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, ChannelError> {
        let address = address.into();
        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| ChannelError::Connect {
                address: address.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();

        ChannelConnected { address: &address }.log();

        Ok(Self {
            address,
            request_timeout,
            connection: Mutex::new(Some(Connection {
                reader: BufReader::new(read_half),
                writer,
            })),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

#[async_trait]
impl RpcChannel for TcpChannel {
    async fn call(&self, request: Request) -> Result<Response, ChannelError> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(ChannelError::Closed)?;

        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, connection.exchange(&request))
                .await
                .unwrap_or(Err(ChannelError::Timeout(limit))),
            None => connection.exchange(&request).await,
        };

        if let Err(error) = &result {
            RequestFailed {
                operation: request.operation(),
                error,
            }
            .log();
            *guard = None;
        }
        result
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

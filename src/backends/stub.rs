// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only channel wrapper that records every exchange and injects faults.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::ChannelError;
use crate::protocol::{RemoteError, RemoteErrorKind, RemoteHandle, Request, Response};
use crate::traits::RpcChannel;

#[derive(Debug, Clone)]
pub enum FaultKind {
    /// Answer with a remote error instead of forwarding the request.
    Remote(RemoteErrorKind),
    /// Fail this and every later call with `ChannelError::Closed`.
    Disconnect,
    /// Forward the request, then cut a data response down to this many
    /// elements.
    ShortRead(usize),
}

/// Fault applied to the `occurrence`-th call (1-based) of `operation`.
#[derive(Debug, Clone)]
pub struct Fault {
    pub operation: &'static str,
    pub occurrence: usize,
    pub kind: FaultKind,
}

impl Fault {
    pub fn new(operation: &'static str, occurrence: usize, kind: FaultKind) -> Self {
        Self {
            operation,
            occurrence,
            kind,
        }
    }
}

/// A request and what came back. `response` is `None` for transport failures.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: Request,
    pub response: Option<Response>,
}

pub struct RecordingChannel<C> {
    inner: C,
    faults: Vec<Fault>,
    log: Mutex<Vec<Exchange>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    disconnected: AtomicBool,
}

impl<C: RpcChannel> RecordingChannel<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            faults: Vec::new(),
            log: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.log.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.exchanges()
            .iter()
            .map(|exchange| exchange.request.operation())
            .collect()
    }

    /// Handles handed out by the remote side, in acquisition order.
    pub fn acquired(&self) -> Vec<RemoteHandle> {
        self.exchanges()
            .iter()
            .filter_map(|exchange| match &exchange.response {
                Some(Response::Handle { handle }) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Handles named by every free, unload or free-definition request, in
    /// call order, whether or not the call succeeded.
    pub fn released(&self) -> Vec<RemoteHandle> {
        self.exchanges()
            .iter()
            .filter_map(|exchange| match &exchange.request {
                Request::Free { handle } => Some(*handle),
                Request::UnloadEngine { engine } => Some(*engine),
                Request::FreeDefinition { definition } => Some(*definition),
                _ => None,
            })
            .collect()
    }

    fn fault_for(&self, operation: &'static str) -> Option<FaultKind> {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(operation).or_insert(0);
        *count += 1;
        let occurrence = *count;
        self.faults
            .iter()
            .find(|f| f.operation == operation && f.occurrence == occurrence)
            .map(|f| f.kind.clone())
    }

    fn record(&self, request: Request, response: Option<Response>) {
        self.log.lock().unwrap().push(Exchange { request, response });
    }
}

#[async_trait]
impl<C: RpcChannel> RpcChannel for RecordingChannel<C> {
    async fn call(&self, request: Request) -> Result<Response, ChannelError> {
        let operation = request.operation();
        let fault = self.fault_for(operation);

        if matches!(fault, Some(FaultKind::Disconnect)) {
            self.disconnected.store(true, Ordering::SeqCst);
        }
        if self.disconnected.load(Ordering::SeqCst) {
            self.record(request, None);
            return Err(ChannelError::Closed);
        }

        let response = match fault {
            Some(FaultKind::Remote(kind)) => Response::Error {
                error: RemoteError::new(kind, format!("injected {} failure", operation)),
            },
            Some(FaultKind::ShortRead(count)) => match self.inner.call(request.clone()).await? {
                Response::Data { data } => Response::Data {
                    data: data.prefix(count),
                },
                other => other,
            },
            _ => self.inner.call(request.clone()).await?,
        };

        self.record(request, Some(response.clone()));
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{EngineServer, TcpChannel};
use crate::backends::simulated::{SimulatedConfig, SimulatedEngine};
use crate::config::consts::MAX_FRAME_BYTES;
use crate::errors::ChannelError;
use crate::protocol::{ElementType, RemoteErrorKind, Request, Response};
use crate::session::{ActionMode, Session};
use crate::traits::RpcChannel;
use crate::workloads::{run_session, SessionRequest, WorkloadKind};

struct RunningServer {
    engine: Arc<SimulatedEngine>,
    address: String,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), ChannelError>>,
}

impl RunningServer {
    async fn start() -> Self {
        Self::start_with_frame_limit(MAX_FRAME_BYTES).await
    }

    async fn start_with_frame_limit(max_frame_bytes: usize) -> Self {
        let engine = Arc::new(SimulatedEngine::new(SimulatedConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = EngineServer::new(engine.clone()).with_max_frame_bytes(max_frame_bytes);
        let shutdown = server.shutdown_token();
        let task = tokio::spawn(async move { server.serve(listener).await });
        Self {
            engine,
            address,
            shutdown,
            task,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn sessions_run_end_to_end_over_tcp() {
    let server = RunningServer::start().await;
    let channel = TcpChannel::connect(&server.address, Some(Duration::from_secs(5)))
        .await
        .unwrap();

    for kind in [WorkloadKind::Simple, WorkloadKind::VectorAddition] {
        let request = SessionRequest::for_workload(kind)
            .mode(ActionMode::Compiled)
            .seed(3);
        let report = run_session(&channel, kind, &request).await.unwrap();
        assert!(report.passed(), "{} failed over tcp", kind);
    }

    assert!(channel.is_connected().await);
    assert_eq!(server.engine.live_resources().await, 0);
    server.stop().await;
}

#[tokio::test]
async fn remote_errors_travel_as_responses() {
    let server = RunningServer::start().await;
    let channel = TcpChannel::connect(&server.address, None).await.unwrap();

    let response = channel
        .call(Request::InitDefinition {
            name: "NoSuchComputation".to_string(),
        })
        .await
        .unwrap();
    match response {
        Response::Error { error } => assert_eq!(error.kind, RemoteErrorKind::UnknownDefinition),
        other => panic!("expected an error response, got {:?}", other),
    }
    assert!(channel.is_connected().await);
    server.stop().await;
}

#[tokio::test]
async fn malformed_line_is_answered_and_connection_survives() {
    let server = RunningServer::start().await;
    let stream = TcpStream::connect(&server.address).await.unwrap();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    writer.write_all(b"{\"op\":\"teleport\"}\n").await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let response: Response = serde_json::from_str(line.trim_end()).unwrap();
    assert!(matches!(
        response,
        Response::Error { ref error } if error.kind == RemoteErrorKind::InvalidArgument
    ));

    writer
        .write_all(b"{\"op\":\"init_definition\",\"name\":\"Simple\"}\n")
        .await
        .unwrap();
    line.clear();
    reader.read_line(&mut line).await.unwrap();
    let response: Response = serde_json::from_str(line.trim_end()).unwrap();
    assert!(matches!(response, Response::Handle { .. }));

    server.stop().await;
}

#[tokio::test]
async fn silent_peer_times_out_and_drops_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let channel = TcpChannel::connect(&address, Some(Duration::from_millis(50)))
        .await
        .unwrap();
    let request = Request::InitDefinition {
        name: "Simple".to_string(),
    };

    let err = channel.call(request.clone()).await.unwrap_err();
    assert!(matches!(err, ChannelError::Timeout(_)));
    assert!(!channel.is_connected().await);

    let err = channel.call(request).await.unwrap_err();
    assert!(matches!(err, ChannelError::Closed));
    peer.abort();
}

#[tokio::test]
async fn peer_hanging_up_mid_request_is_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
    });

    let channel = TcpChannel::connect(&address, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    let err = channel
        .call(Request::InitDefinition {
            name: "Simple".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Closed));
    peer.await.unwrap();
}

#[tokio::test]
async fn connecting_to_nothing_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = TcpChannel::connect(&address, None).await.err().unwrap();
    assert!(matches!(err, ChannelError::Connect { .. }));
}

async fn wait_for_live_resources(engine: &SimulatedEngine, expected: usize) -> usize {
    for _ in 0..200 {
        let live = engine.live_resources().await;
        if live == expected {
            return live;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    engine.live_resources().await
}

#[tokio::test]
async fn abandoned_handles_are_reclaimed_for_the_next_client() {
    let server = RunningServer::start().await;

    {
        let channel = TcpChannel::connect(&server.address, None).await.unwrap();
        let mut session = Session::new(&channel);
        let definition = session.init_definition("Simple").await.unwrap();
        let _engine = session.load_engine(&definition, "*").await.unwrap();
        session.allocate(ElementType::Float64, 16).await.unwrap();
        assert_eq!(server.engine.live_resources().await, 3);
    }

    assert_eq!(wait_for_live_resources(&server.engine, 0).await, 0);

    let channel = TcpChannel::connect(&server.address, None).await.unwrap();
    let request = SessionRequest::for_workload(WorkloadKind::Simple);
    let report = run_session(&channel, WorkloadKind::Simple, &request)
        .await
        .unwrap();
    assert!(report.passed());
    server.stop().await;
}

#[tokio::test]
async fn oversized_line_is_refused_and_connection_survives() {
    let server = RunningServer::start_with_frame_limit(64).await;
    let stream = TcpStream::connect(&server.address).await.unwrap();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut oversized = vec![b'x'; 1000];
    oversized.push(b'\n');
    writer.write_all(&oversized).await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let response: Response = serde_json::from_str(line.trim_end()).unwrap();
    assert!(matches!(
        response,
        Response::Error { ref error } if error.kind == RemoteErrorKind::InvalidArgument
    ));

    writer
        .write_all(b"{\"op\":\"init_definition\",\"name\":\"Simple\"}\n")
        .await
        .unwrap();
    line.clear();
    reader.read_line(&mut line).await.unwrap();
    let response: Response = serde_json::from_str(line.trim_end()).unwrap();
    assert!(matches!(response, Response::Handle { .. }));

    server.stop().await;
}

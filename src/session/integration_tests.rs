// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end tests of the session core against the simulated engine.
//!
//! The recording channel sits between the session and the engine so every test
//! can assert on the exact sequence of remote calls.

use async_trait::async_trait;

use crate::backends::simulated::{SimulatedConfig, SimulatedEngine};
use crate::backends::stub::{Fault, FaultKind, RecordingChannel};
use crate::errors::{ChannelError, SessionError};
use crate::protocol::{
    ActionRef, ElementType, RemoteErrorKind, RemoteHandle, Request, ResourceKind, Response,
};
use crate::traits::RpcChannel;
use crate::session::{
    compare, ActionMode, ExecutionController, RunDescriptor, Session, SessionState,
};
use crate::workloads::{run_session, simple, vector_addition, SessionRequest, WorkloadKind};

fn recording() -> RecordingChannel<SimulatedEngine> {
    RecordingChannel::new(SimulatedEngine::new(SimulatedConfig::default()))
}

fn is_releasable(handle: &RemoteHandle) -> bool {
    matches!(handle.kind, ResourceKind::Buffer | ResourceKind::Action)
}

/// Every acquired handle got exactly one release call, buffers and compiled
/// actions went back newest first, and a definition was the last thing freed.
fn assert_leak_free(channel: &RecordingChannel<SimulatedEngine>) {
    let acquired = channel.acquired();
    let released = channel.released();

    for handle in &acquired {
        let releases = released.iter().filter(|r| *r == handle).count();
        assert_eq!(releases, 1, "{} released {} times", handle, releases);
    }
    assert_eq!(released.len(), acquired.len());

    let mut expected: Vec<_> = acquired.iter().copied().filter(is_releasable).collect();
    expected.reverse();
    let actual: Vec<_> = released.iter().copied().filter(is_releasable).collect();
    assert_eq!(actual, expected);

    assert_eq!(
        released.last().map(|h| h.kind),
        Some(ResourceKind::Definition)
    );
}

#[tokio::test]
async fn simple_session_passes_and_releases_everything() {
    let channel = recording();
    let request = SessionRequest::new(1024);

    let report = run_session(&channel, WorkloadKind::Simple, &request)
        .await
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.element_type, ElementType::Float64);
    assert_eq!(report.output.len(), 1024);
    assert_eq!(
        channel.operations(),
        vec![
            "init_definition",
            "load_engine",
            "allocate",
            "send",
            "allocate",
            "run",
            "unload_engine",
            "receive",
            "free",
            "free",
            "free_definition",
        ]
    );
    assert_leak_free(&channel);
    assert_eq!(channel.inner().live_resources().await, 0);
}

#[tokio::test]
async fn simple_output_matches_square_plus_value() {
    let channel = recording();
    let report = run_session(&channel, WorkloadKind::Simple, &SessionRequest::new(1024))
        .await
        .unwrap();

    let expected = simple::reference(&simple::inputs(1024));
    assert_eq!(report.output, crate::protocol::ArrayData::Float64(expected));
}

#[tokio::test]
async fn vector_addition_compiled_session_passes() {
    let channel = recording();
    let request = SessionRequest::new(384)
        .param("A", 3i64)
        .mode(ActionMode::Compiled)
        .seed(42);

    let report = run_session(&channel, WorkloadKind::VectorAddition, &request)
        .await
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.element_type, ElementType::Int32);

    let operations = channel.operations();
    assert_eq!(operations.iter().filter(|op| **op == "compile_action").count(), 2);
    assert_eq!(operations.iter().filter(|op| **op == "free").count(), 5);
    for exchange in channel.exchanges() {
        if let Request::Run { action, .. } = exchange.request {
            assert!(matches!(action, ActionRef::Compiled(_)));
        }
    }
    assert_leak_free(&channel);
    assert_eq!(channel.inner().live_resources().await, 0);
}

#[tokio::test]
async fn refused_second_allocation_unwinds_before_returning() {
    let channel = recording().with_fault(Fault::new(
        "allocate",
        2,
        FaultKind::Remote(RemoteErrorKind::OutOfMemory),
    ));

    let err = run_session(&channel, WorkloadKind::Simple, &SessionRequest::new(1024))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::RemoteAllocation {
            element_type: ElementType::Float64,
            count: 1024,
            ..
        }
    ));
    assert_eq!(
        channel.operations(),
        vec![
            "init_definition",
            "load_engine",
            "allocate",
            "send",
            "allocate",
            "unload_engine",
            "free",
            "free_definition",
        ]
    );
    assert_leak_free(&channel);
    assert_eq!(channel.inner().live_resources().await, 0);
}

#[tokio::test]
async fn failed_engine_load_frees_definition() {
    let channel = recording().with_fault(Fault::new(
        "load_engine",
        1,
        FaultKind::Remote(RemoteErrorKind::NoEngineAvailable),
    ));

    let err = run_session(&channel, WorkloadKind::PassThrough, &SessionRequest::new(16))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Remote {
            operation: "load_engine",
            ..
        }
    ));
    assert_eq!(
        channel.operations(),
        vec!["init_definition", "load_engine", "free_definition"]
    );
    assert_eq!(channel.inner().live_resources().await, 0);
}

#[tokio::test]
async fn failed_init_has_nothing_to_unwind() {
    let channel = recording();
    let mut plan = simple::plan(simple::inputs(4));
    plan.definition = "Unknown".to_string();

    let err = ExecutionController::new(&channel)
        .execute(&plan)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Remote {
            operation: "init_definition",
            ..
        }
    ));
    assert_eq!(channel.operations(), vec!["init_definition"]);
}

#[tokio::test]
async fn short_download_is_a_size_mismatch() {
    let channel = recording().with_fault(Fault::new("receive", 1, FaultKind::ShortRead(10)));

    let err = run_session(&channel, WorkloadKind::Simple, &SessionRequest::new(64))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::TransferSizeMismatch {
            expected: 64,
            actual: 10,
            ..
        }
    ));
    assert_leak_free(&channel);
    assert_eq!(channel.inner().live_resources().await, 0);
}

#[tokio::test]
async fn disconnect_mid_session_attempts_cleanup_once() {
    let channel = recording().with_fault(Fault::new("run", 1, FaultKind::Disconnect));

    let err = run_session(&channel, WorkloadKind::Simple, &SessionRequest::new(32))
        .await
        .unwrap_err();

    assert!(err.is_channel());
    assert!(matches!(err, SessionError::Channel { operation: "run", .. }));
    assert_leak_free(&channel);
    let failed = channel
        .exchanges()
        .iter()
        .filter(|exchange| exchange.response.is_none())
        .count();
    assert_eq!(failed, 5, "run plus four release attempts");
}

#[tokio::test]
async fn lmem_write_must_precede_compute() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let x: Vec<i32> = (1..=64).collect();
    let y: Vec<i32> = (0..64).collect();
    let expected = vector_addition::reference(&x, &y, 3);

    let in_order = vector_addition::plan(x.clone(), y.clone(), 3);
    let mut reordered = in_order.clone();
    reordered.actions.reverse();

    let controller = ExecutionController::new(&engine);
    let mut good = controller.execute(&in_order).await.unwrap();
    let mut bad = controller.execute(&reordered).await.unwrap();

    assert!(compare(&good.take("s").unwrap(), &expected, 64).passed());
    assert!(!compare(&bad.take("s").unwrap(), &expected, 64).passed());
    assert_eq!(engine.live_resources().await, 0);
}

#[tokio::test]
async fn step_timings_cover_the_lifecycle() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let plan = vector_addition::plan(vec![1; 8], vec![2; 8], 0);

    let output = ExecutionController::new(&engine).execute(&plan).await.unwrap();

    let runs: Vec<_> = output
        .timings
        .iter()
        .filter_map(|t| t.detail.as_deref())
        .collect();
    assert_eq!(runs, vec!["writeLMem", "default"]);
    assert_eq!(output.timings.len(), 9);
}

#[tokio::test]
async fn releasing_twice_is_a_double_free() {
    let channel = recording();
    let mut session = Session::new(&channel);
    let definition = session.init_definition("Simple").await.unwrap();
    let buffer = session.allocate(ElementType::Float64, 4).await.unwrap();

    session.release(&buffer).await.unwrap();
    let err = session.release(&buffer).await.unwrap_err();

    assert!(matches!(err, SessionError::DoubleFree { handle } if handle == buffer.handle()));
    assert_eq!(
        channel.operations().iter().filter(|op| **op == "free").count(),
        1
    );
    session.free_definition(definition).await.unwrap();
    assert_eq!(session.state(), SessionState::DefinitionFreed);
}

#[tokio::test]
async fn engines_and_definitions_are_not_released_with_free() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let mut session = Session::new(&engine);
    let definition = session.init_definition("Simple").await.unwrap();
    let loaded = session.load_engine(&definition, "*").await.unwrap();

    for handle in [loaded.handle(), definition.handle()] {
        let err = session.release(handle).await.unwrap_err();
        assert!(
            matches!(err, SessionError::NotReleasable { handle: h, kind } if h == handle && kind == handle.kind)
        );
    }
    assert_eq!(session.live_handles(), 2);

    session.unload_engine(loaded).await.unwrap();
    session.free_definition(definition).await.unwrap();
    assert_eq!(engine.live_resources().await, 0);
}

/// Answers allocations with a definition handle.
struct MislabellingChannel {
    inner: SimulatedEngine,
}

#[async_trait]
impl RpcChannel for MislabellingChannel {
    async fn call(&self, request: Request) -> Result<Response, ChannelError> {
        match request {
            Request::Allocate { .. } => {
                self.inner
                    .call(Request::InitDefinition {
                        name: "Simple".to_string(),
                    })
                    .await
            }
            other => self.inner.call(other).await,
        }
    }

    fn name(&self) -> &'static str {
        "mislabelling"
    }
}

#[tokio::test]
async fn wrong_kind_of_handle_is_still_torn_down() {
    let channel = MislabellingChannel {
        inner: SimulatedEngine::new(SimulatedConfig::default()),
    };
    let mut session = Session::new(&channel);
    session.init_definition("PassThrough").await.unwrap();

    let err = session.allocate(ElementType::Int32, 4).await.unwrap_err();
    assert!(matches!(err, SessionError::UnexpectedResponse { .. }));
    assert_eq!(session.live_handles(), 2);

    assert!(session.teardown().await.is_empty());
    assert_eq!(channel.inner.live_resources().await, 0);
}

#[tokio::test]
async fn transfers_check_sizes_before_sending() {
    let channel = recording();
    let mut session = Session::new(&channel);
    let definition = session.init_definition("Simple").await.unwrap();
    let buffer = session.allocate(ElementType::Float64, 4).await.unwrap();

    let err = session.upload(&buffer, &[1.0f64; 5]).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::BufferOverflow {
            capacity: 4,
            requested: 5,
            ..
        }
    ));

    let err = session.upload(&buffer, &[1i32; 4]).await.unwrap_err();
    assert!(matches!(err, SessionError::ElementTypeMismatch { .. }));

    let mut out = [0.0f64; 5];
    let err = session.download(&buffer, &mut out).await.unwrap_err();
    assert!(matches!(err, SessionError::BufferOverflow { .. }));

    assert!(!channel.operations().contains(&"send"));
    assert!(!channel.operations().contains(&"receive"));

    session.upload(&buffer, &[1.0f64, 2.0]).await.unwrap();
    let mut out = [0.0f64; 4];
    session.download(&buffer, &mut out).await.unwrap();
    assert_eq!(out, [1.0, 2.0, 0.0, 0.0]);

    session.release_all().await.unwrap();
    session.free_definition(definition).await.unwrap();
}

#[tokio::test]
async fn released_buffer_cannot_be_used() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let mut session = Session::new(&engine);
    let definition = session.init_definition("PassThrough").await.unwrap();
    let buffer = session.allocate(ElementType::Float32, 2).await.unwrap();
    session.release(&buffer).await.unwrap();

    let err = session.upload(&buffer, &[1.0f32]).await.unwrap_err();
    assert!(matches!(err, SessionError::UseAfterFree { .. }));

    let mut descriptor = RunDescriptor::new(&definition, "default");
    descriptor.queue_input("x", &buffer, 8).unwrap();
    let err = session
        .submit(descriptor, ActionMode::Inline)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UseAfterFree { .. }));

    session.free_definition(definition).await.unwrap();
}

#[tokio::test]
async fn compiled_action_runs_repeatedly() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let mut session = Session::new(&engine);
    let definition = session.init_definition("PassThrough").await.unwrap();
    let engine_handle = session.load_engine(&definition, "*").await.unwrap();
    let x = session.allocate(ElementType::Float32, 3).await.unwrap();
    let y = session.allocate(ElementType::Float32, 3).await.unwrap();
    session.upload(&x, &[1.0f32, 2.0, 3.0]).await.unwrap();

    let mut descriptor = RunDescriptor::new(&definition, "default");
    descriptor.set_param("N", 3u64);
    descriptor.queue_input("x", &x, x.byte_len()).unwrap();
    descriptor.queue_output("y", &y, y.byte_len()).unwrap();
    let action = session
        .submit(descriptor, ActionMode::Compiled)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Staged);

    session.run(&engine_handle, &action).await.unwrap();
    session.upload(&x, &[4.0f32, 5.0, 6.0]).await.unwrap();
    session.run(&engine_handle, &action).await.unwrap();
    assert_eq!(session.state(), SessionState::Completed);

    session.unload_engine(engine_handle).await.unwrap();
    assert_eq!(session.state(), SessionState::EngineUnloaded);

    let mut out = [0.0f32; 3];
    session.download(&y, &mut out).await.unwrap();
    assert_eq!(out, [4.0, 5.0, 6.0]);

    session.release_all().await.unwrap();
    session.free_definition(definition).await.unwrap();
    assert_eq!(session.state(), SessionState::DefinitionFreed);
    assert_eq!(engine.live_resources().await, 0);
}

#[tokio::test]
async fn huge_stream_length_is_refused_by_the_engine() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let mut session = Session::new(&engine);
    let definition = session.init_definition("VectorAddition").await.unwrap();
    let engine_handle = session.load_engine(&definition, "*").await.unwrap();
    let y = session.allocate(ElementType::Int32, 4).await.unwrap();
    let s = session.allocate(ElementType::Int32, 4).await.unwrap();

    let mut descriptor = RunDescriptor::new(&definition, "default");
    descriptor.set_param("A", 3i64).set_param("N", u64::MAX / 2);
    descriptor.queue_input("y", &y, y.byte_len()).unwrap();
    descriptor.queue_output("s", &s, s.byte_len()).unwrap();
    let action = session
        .submit(descriptor, ActionMode::Compiled)
        .await
        .unwrap();

    let err = session.run(&engine_handle, &action).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Remote { ref error, .. } if error.kind == RemoteErrorKind::InvalidArgument
    ));

    assert!(session.teardown().await.is_empty());
    assert_eq!(engine.live_resources().await, 0);
}

#[tokio::test]
async fn definitions_share_a_session_but_free_in_order() {
    let engine = SimulatedEngine::new(SimulatedConfig {
        engines: 2,
        ..SimulatedConfig::default()
    });
    let mut session = Session::new(&engine);
    let simple = session.init_definition("Simple").await.unwrap();
    let pass = session.init_definition("PassThrough").await.unwrap();
    let engine_handle = session.load_engine(&simple, "*").await.unwrap();

    let err = session.free_definition(simple.clone()).await.unwrap_err();
    assert!(matches!(err, SessionError::DefinitionInUse { live: 1, .. }));

    session.unload_engine(engine_handle).await.unwrap();
    session.free_definition(simple).await.unwrap();

    let buffer = session.allocate(ElementType::Float32, 4).await.unwrap();
    let err = session.free_definition(pass.clone()).await.unwrap_err();
    assert!(matches!(err, SessionError::DefinitionInUse { live: 1, .. }));

    session.release(&buffer).await.unwrap();
    session.free_definition(pass).await.unwrap();
    assert_eq!(session.state(), SessionState::DefinitionFreed);
    assert_eq!(engine.live_resources().await, 0);
}

#[tokio::test]
async fn closed_session_rejects_further_calls() {
    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let mut session = Session::new(&engine);
    let definition = session.init_definition("Simple").await.unwrap();
    session.free_definition(definition).await.unwrap();

    let err = session.init_definition("Simple").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState {
            state: SessionState::DefinitionFreed,
            ..
        }
    ));
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Generic execution controller.
//!
//! A [`SessionPlan`] names a computation definition, the input arrays to stage,
//! the output buffers to read back and the ordered list of actions to run. The
//! controller drives one [`Session`] through the full lifecycle:
//!
//! ```text
//! init definition -> load engine -> stage (allocate, upload, bind) -> run*
//!     -> unload engine -> download outputs -> release in reverse -> free definition
//! ```
//!
//! If any step fails, every handle acquired so far is released (engines first,
//! then buffers and compiled actions newest first, then definitions) before the
//! primary error is returned. Cleanup failures are logged, never returned.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use crate::errors::{SessionError, SessionResult};
use crate::observability::messages::session::{SessionAborted, SessionCompleted};
use crate::observability::messages::StructuredLog;
use crate::protocol::{BufferHandle, DefinitionHandle, Element, ParamValue, StreamDirection};
use crate::session::action::{ActionMode, RunDescriptor};
use crate::session::lifecycle::Session;
use crate::traits::RpcChannel;

/// Input array to allocate and upload before any action runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedInput<T> {
    pub name: String,
    pub data: Vec<T>,
}

/// Output buffer to allocate and read back after the engine is unloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedOutput {
    pub name: String,
    pub count: usize,
}

/// Binds a named port of an action to one of the plan's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub port: String,
    pub buffer: String,
    pub direction: StreamDirection,
}

/// One action of a plan, run in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan {
    pub action: String,
    pub mode: ActionMode,
    pub params: Vec<(String, ParamValue)>,
    pub bindings: Vec<PortBinding>,
}

impl ActionPlan {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            mode: ActionMode::default(),
            params: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: ActionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn input(mut self, port: impl Into<String>, buffer: impl Into<String>) -> Self {
        self.bindings.push(PortBinding {
            port: port.into(),
            buffer: buffer.into(),
            direction: StreamDirection::Input,
        });
        self
    }

    pub fn output(mut self, port: impl Into<String>, buffer: impl Into<String>) -> Self {
        self.bindings.push(PortBinding {
            port: port.into(),
            buffer: buffer.into(),
            direction: StreamDirection::Output,
        });
        self
    }
}

/// Everything the controller needs to run one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan<T> {
    pub definition: String,
    pub selector: String,
    pub inputs: Vec<StagedInput<T>>,
    pub outputs: Vec<StagedOutput>,
    pub actions: Vec<ActionPlan>,
}

impl<T: Element> SessionPlan<T> {
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            selector: crate::config::consts::ANY_ENGINE.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn input(mut self, name: impl Into<String>, data: Vec<T>) -> Self {
        self.inputs.push(StagedInput {
            name: name.into(),
            data,
        });
        self
    }

    pub fn output(mut self, name: impl Into<String>, count: usize) -> Self {
        self.outputs.push(StagedOutput {
            name: name.into(),
            count,
        });
        self
    }

    pub fn action(mut self, action: ActionPlan) -> Self {
        self.actions.push(action);
        self
    }

    /// Applies `mode` to every action of the plan.
    pub fn with_mode(mut self, mode: ActionMode) -> Self {
        for action in &mut self.actions {
            action.mode = mode;
        }
        self
    }

    /// Checks buffer names locally so a malformed plan never touches the
    /// remote side.
    pub fn validate(&self) -> SessionResult<()> {
        let mut declared = HashSet::new();
        let names = self
            .inputs
            .iter()
            .map(|i| &i.name)
            .chain(self.outputs.iter().map(|o| &o.name));
        for name in names {
            if !declared.insert(name.as_str()) {
                return Err(SessionError::DuplicateBuffer { name: name.clone() });
            }
        }

        for binding in self.actions.iter().flat_map(|a| &a.bindings) {
            if !declared.contains(binding.buffer.as_str()) {
                return Err(SessionError::UnknownBuffer {
                    port: binding.port.clone(),
                    buffer: binding.buffer.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Lifecycle steps the controller times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStep {
    InitDefinition,
    LoadEngine,
    Stage,
    Run,
    UnloadEngine,
    Download,
    Release,
    FreeDefinition,
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStep::InitDefinition => "Initializing definition",
            SessionStep::LoadEngine => "Loading engine",
            SessionStep::Stage => "Staging buffers and actions",
            SessionStep::Run => "Running action",
            SessionStep::UnloadEngine => "Unloading engine",
            SessionStep::Download => "Reading outputs",
            SessionStep::Release => "Releasing buffers",
            SessionStep::FreeDefinition => "Freeing definition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub step: SessionStep,
    /// Action name for `Run` steps.
    pub detail: Option<String>,
    pub duration: Duration,
}

impl fmt::Display for StepTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} '{}': {:?}", self.step, detail, self.duration),
            None => write!(f, "{}: {:?}", self.step, self.duration),
        }
    }
}

/// Downloaded outputs of a completed session, in plan order.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutput<T> {
    pub outputs: Vec<(String, Vec<T>)>,
    pub timings: Vec<StepTiming>,
}

impl<T> SessionOutput<T> {
    /// Removes and returns the output named `name`.
    pub fn take(&mut self, name: &str) -> Option<Vec<T>> {
        let position = self.outputs.iter().position(|(n, _)| n == name)?;
        Some(self.outputs.remove(position).1)
    }
}

#[derive(Default)]
struct Timer {
    timings: Vec<StepTiming>,
}

impl Timer {
    fn record(&mut self, step: SessionStep, detail: Option<&str>, started: Instant) {
        self.timings.push(StepTiming {
            step,
            detail: detail.map(str::to_string),
            duration: started.elapsed(),
        });
    }
}

pub struct ExecutionController<'c, C: RpcChannel + ?Sized> {
    channel: &'c C,
}

impl<'c, C: RpcChannel + ?Sized> ExecutionController<'c, C> {
    pub fn new(channel: &'c C) -> Self {
        Self { channel }
    }

    /// Runs `plan` to completion and returns its outputs.
    ///
    /// Returns the first error encountered after every acquired handle has
    /// been given one release attempt.
    pub async fn execute<T: Element>(&self, plan: &SessionPlan<T>) -> SessionResult<SessionOutput<T>> {
        plan.validate()?;

        let started = Instant::now();
        let mut session = Session::new(self.channel);
        let mut timer = Timer::default();

        match Self::drive(&mut session, plan, &mut timer).await {
            Ok(outputs) => {
                SessionCompleted {
                    definition: &plan.definition,
                    actions: plan.actions.len(),
                    duration: started.elapsed(),
                }
                .log();
                Ok(SessionOutput {
                    outputs,
                    timings: timer.timings,
                })
            }
            Err(error) => {
                SessionAborted {
                    error: &error,
                    live_handles: session.live_handles(),
                }
                .log();
                // Failures are logged by teardown; the primary error wins.
                let _ = session.teardown().await;
                Err(error)
            }
        }
    }

    async fn drive<T: Element>(
        session: &mut Session<'c, C>,
        plan: &SessionPlan<T>,
        timer: &mut Timer,
    ) -> SessionResult<Vec<(String, Vec<T>)>> {
        let step = Instant::now();
        let definition = session.init_definition(&plan.definition).await?;
        timer.record(SessionStep::InitDefinition, None, step);

        let step = Instant::now();
        let engine = session.load_engine(&definition, &plan.selector).await?;
        timer.record(SessionStep::LoadEngine, None, step);

        let step = Instant::now();
        let mut buffers: HashMap<&str, BufferHandle> = HashMap::new();
        for input in &plan.inputs {
            let buffer = session.allocate(T::TYPE, input.data.len()).await?;
            session.upload(&buffer, &input.data).await?;
            buffers.insert(input.name.as_str(), buffer);
        }
        let mut outputs = Vec::with_capacity(plan.outputs.len());
        for output in &plan.outputs {
            let buffer = session.allocate(T::TYPE, output.count).await?;
            buffers.insert(output.name.as_str(), buffer);
            outputs.push((output.name.as_str(), buffer));
        }

        let mut submittables = Vec::with_capacity(plan.actions.len());
        for action in &plan.actions {
            let descriptor = Self::describe(&definition, action, &buffers)?;
            submittables.push(session.submit(descriptor, action.mode).await?);
        }
        timer.record(SessionStep::Stage, None, step);

        for submittable in &submittables {
            let step = Instant::now();
            session.run(&engine, submittable).await?;
            timer.record(SessionStep::Run, Some(submittable.action()), step);
        }

        let step = Instant::now();
        session.unload_engine(engine).await?;
        timer.record(SessionStep::UnloadEngine, None, step);

        let step = Instant::now();
        let mut results = Vec::with_capacity(outputs.len());
        for (name, buffer) in outputs {
            let mut values = vec![T::default(); buffer.count()];
            session.download(&buffer, &mut values).await?;
            results.push((name.to_string(), values));
        }
        timer.record(SessionStep::Download, None, step);

        let step = Instant::now();
        session.release_all().await?;
        timer.record(SessionStep::Release, None, step);

        let step = Instant::now();
        session.free_definition(definition).await?;
        timer.record(SessionStep::FreeDefinition, None, step);

        Ok(results)
    }

    fn describe(
        definition: &DefinitionHandle,
        action: &ActionPlan,
        buffers: &HashMap<&str, BufferHandle>,
    ) -> SessionResult<RunDescriptor> {
        let mut descriptor = RunDescriptor::new(definition, action.action.clone());
        for (name, value) in &action.params {
            descriptor.set_param(name.clone(), *value);
        }
        for binding in &action.bindings {
            let buffer = buffers
                .get(binding.buffer.as_str())
                .ok_or_else(|| SessionError::UnknownBuffer {
                    port: binding.port.clone(),
                    buffer: binding.buffer.clone(),
                })?;
            match binding.direction {
                StreamDirection::Input => {
                    descriptor.queue_input(binding.port.clone(), buffer, buffer.byte_len())?
                }
                StreamDirection::Output => {
                    descriptor.queue_output(binding.port.clone(), buffer, buffer.byte_len())?
                }
            };
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SessionPlan<f64> {
        SessionPlan::new("Simple")
            .input("x", vec![1.0, 2.0])
            .output("y", 2)
            .action(
                ActionPlan::new("default")
                    .param("N", 2u64)
                    .input("x", "x")
                    .output("y", "y"),
            )
    }

    #[test]
    fn well_formed_plan_validates() {
        assert!(plan().validate().is_ok());
    }

    #[test]
    fn binding_to_undeclared_buffer_is_rejected() {
        let plan = plan().action(ActionPlan::new("default").input("x", "missing"));
        assert!(matches!(
            plan.validate(),
            Err(SessionError::UnknownBuffer { ref buffer, .. }) if buffer == "missing"
        ));
    }

    #[test]
    fn duplicate_buffer_names_are_rejected() {
        let plan = plan().output("x", 2);
        assert!(matches!(
            plan.validate(),
            Err(SessionError::DuplicateBuffer { ref name }) if name == "x"
        ));
    }

    #[test]
    fn with_mode_applies_to_every_action() {
        let plan = plan()
            .action(ActionPlan::new("other"))
            .with_mode(ActionMode::Compiled);
        assert!(plan.actions.iter().all(|a| a.mode == ActionMode::Compiled));
    }

    #[test]
    fn take_removes_named_output() {
        let mut output = SessionOutput {
            outputs: vec![("a".to_string(), vec![1]), ("b".to_string(), vec![2])],
            timings: Vec::new(),
        };
        assert_eq!(output.take("b"), Some(vec![2]));
        assert_eq!(output.take("b"), None);
        assert_eq!(output.outputs.len(), 1);
    }
}

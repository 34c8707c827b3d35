// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::backends::simulated::kernels::{Kernel, KernelContext, KernelRegistry};
use crate::backends::simulated::SimulatedConfig;
use crate::config::consts::ANY_ENGINE;
use crate::protocol::{
    ActionRef, ActionSpec, ArrayData, ElementType, RemoteError, RemoteErrorKind, RemoteHandle,
    Request, ResourceKind, Response, StreamDirection,
};

struct LoadedEngine {
    definition: u64,
    slot: usize,
    lmem: Vec<u8>,
}

/// Remote-side bookkeeping of the simulated engine.
pub struct EngineState {
    next_id: u64,
    definitions: HashMap<u64, &'static str>,
    engines: HashMap<u64, LoadedEngine>,
    /// Engine id occupying each physical slot.
    slots: Vec<Option<u64>>,
    buffers: HashMap<u64, ArrayData>,
    actions: HashMap<u64, ActionSpec>,
    memory_in_use: usize,
}

fn invalid_handle(handle: RemoteHandle) -> RemoteError {
    RemoteError::new(
        RemoteErrorKind::InvalidHandle,
        format!("{} does not exist", handle),
    )
}

fn invalid_argument(message: impl Into<String>) -> RemoteError {
    RemoteError::new(RemoteErrorKind::InvalidArgument, message)
}

impl EngineState {
    pub fn new(engines: usize) -> Self {
        Self {
            next_id: 1,
            definitions: HashMap::new(),
            engines: HashMap::new(),
            slots: vec![None; engines],
            buffers: HashMap::new(),
            actions: HashMap::new(),
            memory_in_use: 0,
        }
    }

    /// Resources of every kind that have not been released.
    pub fn live_resources(&self) -> usize {
        self.definitions.len() + self.engines.len() + self.buffers.len() + self.actions.len()
    }

    pub fn memory_in_use(&self) -> usize {
        self.memory_in_use
    }

    fn issue(&mut self, kind: ResourceKind) -> RemoteHandle {
        let handle = RemoteHandle::new(self.next_id, kind);
        self.next_id += 1;
        handle
    }

    pub fn handle(
        &mut self,
        request: Request,
        kernels: &KernelRegistry,
        config: &SimulatedConfig,
    ) -> Response {
        let outcome = match request {
            Request::InitDefinition { name } => self.init_definition(&name, kernels),
            Request::FreeDefinition { definition } => self.free_definition(definition),
            Request::LoadEngine {
                definition,
                selector,
            } => self.load_engine(definition, &selector),
            Request::UnloadEngine { engine } => self.unload_engine(engine),
            Request::Allocate {
                element_type,
                count,
            } => self.allocate(element_type, count, config),
            Request::Free { handle } => self.free(handle),
            Request::Send { buffer, data } => self.send(buffer, &data),
            Request::Receive {
                buffer,
                element_type,
                count,
            } => self.receive(buffer, element_type, count),
            Request::CompileAction { action } => self.compile(action, kernels),
            Request::Run { engine, action } => self.run(engine, action, kernels, config),
        };
        outcome.unwrap_or_else(|error| Response::Error { error })
    }

    fn init_definition(
        &mut self,
        name: &str,
        kernels: &KernelRegistry,
    ) -> Result<Response, RemoteError> {
        let kernel = kernels.get(name).ok_or_else(|| {
            RemoteError::new(
                RemoteErrorKind::UnknownDefinition,
                format!("no computation named '{}'", name),
            )
        })?;
        let handle = self.issue(ResourceKind::Definition);
        self.definitions.insert(handle.id, kernel.definition());
        Ok(Response::Handle { handle })
    }

    fn free_definition(&mut self, definition: RemoteHandle) -> Result<Response, RemoteError> {
        self.definition_name(definition)?;
        let engines = self
            .engines
            .values()
            .filter(|e| e.definition == definition.id)
            .count();
        let actions = self
            .actions
            .values()
            .filter(|a| a.definition == definition)
            .count();
        if engines + actions > 0 {
            return Err(invalid_argument(format!(
                "{} still has {} engines and {} compiled actions",
                definition, engines, actions
            )));
        }
        self.definitions.remove(&definition.id);
        Ok(Response::Done)
    }

    fn definition_name(&self, definition: RemoteHandle) -> Result<&'static str, RemoteError> {
        if definition.kind != ResourceKind::Definition {
            return Err(invalid_handle(definition));
        }
        self.definitions
            .get(&definition.id)
            .copied()
            .ok_or_else(|| invalid_handle(definition))
    }

    /// `*` and `local:*` take the first free slot, `local:N` asks for slot N.
    fn pick_slot(&self, selector: &str) -> Result<usize, RemoteError> {
        let none_free = || {
            RemoteError::new(
                RemoteErrorKind::NoEngineAvailable,
                format!("no free engine matches '{}'", selector),
            )
        };

        let wanted = match selector {
            ANY_ENGINE | "local:*" => None,
            other => {
                let index = other
                    .strip_prefix("local:")
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| invalid_argument(format!("malformed selector '{}'", selector)))?;
                Some(index)
            }
        };

        match wanted {
            None => self.slots.iter().position(Option::is_none).ok_or_else(none_free),
            Some(index) => match self.slots.get(index) {
                Some(None) => Ok(index),
                _ => Err(none_free()),
            },
        }
    }

    fn load_engine(
        &mut self,
        definition: RemoteHandle,
        selector: &str,
    ) -> Result<Response, RemoteError> {
        self.definition_name(definition)?;
        let slot = self.pick_slot(selector)?;
        let handle = self.issue(ResourceKind::Engine);
        self.slots[slot] = Some(handle.id);
        self.engines.insert(
            handle.id,
            LoadedEngine {
                definition: definition.id,
                slot,
                lmem: Vec::new(),
            },
        );
        Ok(Response::Handle { handle })
    }

    fn unload_engine(&mut self, engine: RemoteHandle) -> Result<Response, RemoteError> {
        if engine.kind != ResourceKind::Engine {
            return Err(invalid_handle(engine));
        }
        let loaded = self
            .engines
            .remove(&engine.id)
            .ok_or_else(|| invalid_handle(engine))?;
        self.slots[loaded.slot] = None;
        Ok(Response::Done)
    }

    fn allocate(
        &mut self,
        element_type: ElementType,
        count: u64,
        config: &SimulatedConfig,
    ) -> Result<Response, RemoteError> {
        let count = usize::try_from(count)
            .ok()
            .filter(|&count| count > 0)
            .ok_or_else(|| invalid_argument(format!("cannot allocate {} elements", count)))?;
        let bytes = count
            .checked_mul(element_type.size_bytes())
            .filter(|&bytes| self.memory_in_use + bytes <= config.memory_limit_bytes)
            .ok_or_else(|| {
                RemoteError::new(
                    RemoteErrorKind::OutOfMemory,
                    format!(
                        "{} x {} does not fit: {} of {} bytes in use",
                        count, element_type, self.memory_in_use, config.memory_limit_bytes
                    ),
                )
            })?;

        let handle = self.issue(ResourceKind::Buffer);
        self.buffers
            .insert(handle.id, ArrayData::zeroed(element_type, count));
        self.memory_in_use += bytes;
        Ok(Response::Handle { handle })
    }

    fn free(&mut self, handle: RemoteHandle) -> Result<Response, RemoteError> {
        match handle.kind {
            ResourceKind::Buffer => {
                let data = self
                    .buffers
                    .remove(&handle.id)
                    .ok_or_else(|| invalid_handle(handle))?;
                self.memory_in_use -= data.byte_len();
            }
            ResourceKind::Action => {
                self.actions
                    .remove(&handle.id)
                    .ok_or_else(|| invalid_handle(handle))?;
            }
            _ => return Err(invalid_handle(handle)),
        }
        Ok(Response::Done)
    }

    fn buffer(&self, buffer: RemoteHandle) -> Result<&ArrayData, RemoteError> {
        if buffer.kind != ResourceKind::Buffer {
            return Err(invalid_handle(buffer));
        }
        self.buffers
            .get(&buffer.id)
            .ok_or_else(|| invalid_handle(buffer))
    }

    fn send(&mut self, buffer: RemoteHandle, data: &ArrayData) -> Result<Response, RemoteError> {
        let current = self.buffer(buffer)?;
        let (capacity, element_type) = (current.len(), current.element_type());
        let target = self
            .buffers
            .get_mut(&buffer.id)
            .ok_or_else(|| invalid_handle(buffer))?;
        if !target.write_prefix(data) {
            return Err(invalid_argument(format!(
                "cannot write {} x {} into {} holding {} x {}",
                data.len(),
                data.element_type(),
                buffer,
                capacity,
                element_type
            )));
        }
        Ok(Response::Done)
    }

    fn receive(
        &self,
        buffer: RemoteHandle,
        element_type: ElementType,
        count: u64,
    ) -> Result<Response, RemoteError> {
        let data = self.buffer(buffer)?;
        if data.element_type() != element_type {
            return Err(invalid_argument(format!(
                "{} holds {}, not {}",
                buffer,
                data.element_type(),
                element_type
            )));
        }
        let count = usize::try_from(count)
            .ok()
            .filter(|&count| count <= data.len())
            .ok_or_else(|| {
                invalid_argument(format!(
                    "cannot read {} elements from {} holding {}",
                    count,
                    buffer,
                    data.len()
                ))
            })?;
        Ok(Response::Data {
            data: data.prefix(count),
        })
    }

    /// Checks `spec` against the signature of its action and returns the
    /// kernel that will run it.
    fn validate<'k>(
        &self,
        spec: &ActionSpec,
        kernels: &'k KernelRegistry,
    ) -> Result<&'k dyn Kernel, RemoteError> {
        let name = self.definition_name(spec.definition)?;
        let kernel = kernels.get(name).ok_or_else(|| {
            RemoteError::new(RemoteErrorKind::UnknownDefinition, name.to_string())
        })?;
        let signature = kernel.signature(&spec.action).ok_or_else(|| {
            RemoteError::new(
                RemoteErrorKind::InvalidAction,
                format!("{} has no action '{}'", name, spec.action),
            )
        })?;

        if let Some(unknown) = spec
            .params
            .keys()
            .find(|param| !signature.params.contains(&param.as_str()))
        {
            return Err(invalid_argument(format!(
                "{}.{} has no parameter '{}'",
                name, spec.action, unknown
            )));
        }
        if let Some(missing) = signature
            .params
            .iter()
            .find(|param| !spec.params.contains_key(**param))
        {
            return Err(invalid_argument(format!(
                "{}.{} requires parameter '{}'",
                name, spec.action, missing
            )));
        }

        for (port, binding) in &spec.streams {
            let expected = match binding.direction {
                StreamDirection::Input => signature.inputs,
                StreamDirection::Output => signature.outputs,
            };
            if !expected.contains(&port.as_str()) {
                return Err(invalid_argument(format!(
                    "{}.{} has no {:?} port '{}'",
                    name, spec.action, binding.direction, port
                )));
            }
            let data = self.buffer(binding.buffer)?;
            if data.element_type() != kernel.element_type() {
                return Err(invalid_argument(format!(
                    "port '{}' streams {}, {} holds {}",
                    port,
                    kernel.element_type(),
                    binding.buffer,
                    data.element_type()
                )));
            }
            if binding.byte_length != data.byte_len() as u64 {
                return Err(invalid_argument(format!(
                    "port '{}' declares {} bytes, {} holds {}",
                    port,
                    binding.byte_length,
                    binding.buffer,
                    data.byte_len()
                )));
            }
        }
        if let Some(unbound) = signature
            .inputs
            .iter()
            .chain(signature.outputs)
            .find(|port| !spec.streams.contains_key(**port))
        {
            return Err(invalid_argument(format!(
                "{}.{} port '{}' is not bound",
                name, spec.action, unbound
            )));
        }

        Ok(kernel)
    }

    fn compile(
        &mut self,
        spec: ActionSpec,
        kernels: &KernelRegistry,
    ) -> Result<Response, RemoteError> {
        self.validate(&spec, kernels)?;
        let handle = self.issue(ResourceKind::Action);
        self.actions.insert(handle.id, spec);
        Ok(Response::Handle { handle })
    }

    fn run(
        &mut self,
        engine: RemoteHandle,
        action: ActionRef,
        kernels: &KernelRegistry,
        config: &SimulatedConfig,
    ) -> Result<Response, RemoteError> {
        if engine.kind != ResourceKind::Engine {
            return Err(invalid_handle(engine));
        }
        let spec = match action {
            ActionRef::Inline(spec) => spec,
            ActionRef::Compiled(handle) => self
                .actions
                .get(&handle.id)
                .filter(|_| handle.kind == ResourceKind::Action)
                .cloned()
                .ok_or_else(|| invalid_handle(handle))?,
        };
        let loaded_from = self
            .engines
            .get(&engine.id)
            .map(|loaded| loaded.definition)
            .ok_or_else(|| invalid_handle(engine))?;
        if loaded_from != spec.definition.id {
            return Err(RemoteError::new(
                RemoteErrorKind::InvalidAction,
                format!("{} was not loaded from {}", engine, spec.definition),
            ));
        }
        let kernel = self.validate(&spec, kernels)?;

        let mut inputs = HashMap::new();
        let mut output_counts = HashMap::new();
        for (port, binding) in &spec.streams {
            let data = self.buffer(binding.buffer)?;
            match binding.direction {
                StreamDirection::Input => {
                    inputs.insert(port.clone(), data.clone());
                }
                StreamDirection::Output => {
                    output_counts.insert(port.clone(), data.len());
                }
            }
        }

        let loaded = self
            .engines
            .get_mut(&engine.id)
            .ok_or_else(|| invalid_handle(engine))?;
        let mut ctx = KernelContext::new(
            &spec.params,
            inputs,
            output_counts,
            &mut loaded.lmem,
            config.lmem_bytes,
        );
        kernel.execute(&spec.action, &mut ctx)?;
        let outputs = ctx.into_outputs();

        for (port, values) in outputs {
            let target = spec
                .streams
                .get(&port)
                .and_then(|binding| self.buffers.get_mut(&binding.buffer.id))
                .ok_or_else(|| invalid_argument(format!("output '{}' is not bound", port)))?;
            if !target.write_prefix(&values) {
                return Err(RemoteError::new(
                    RemoteErrorKind::ExecutionFailed,
                    format!("output '{}' does not fit its buffer", port),
                ));
            }
        }
        Ok(Response::Done)
    }
}

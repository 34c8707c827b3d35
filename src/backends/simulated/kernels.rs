// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Computations the simulated engine can load.
//!
//! Each [`Kernel`] corresponds to one computation definition. It publishes the
//! signature of every action it supports, which the engine checks when a run
//! descriptor is compiled and again when it is run, and executes actions
//! against a [`KernelContext`] holding the bound stream data and the engine's
//! large memory (LMem).

use std::collections::{BTreeMap, HashMap};

use crate::protocol::{ArrayData, Element, ElementType, ParamValue, RemoteError, RemoteErrorKind};

/// Ports and parameters an action expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSignature {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

/// Everything an action can read or write while it executes.
pub struct KernelContext<'a> {
    params: &'a BTreeMap<String, ParamValue>,
    inputs: HashMap<String, ArrayData>,
    /// Output port -> element count of the bound buffer.
    output_counts: HashMap<String, usize>,
    outputs: HashMap<String, ArrayData>,
    lmem: &'a mut Vec<u8>,
    lmem_limit: usize,
}

fn invalid(message: impl Into<String>) -> RemoteError {
    RemoteError::new(RemoteErrorKind::InvalidArgument, message)
}

/// Size in bytes of `count` elements of `element_type`.
fn region_bytes(element_type: ElementType, count: usize) -> Result<u64, RemoteError> {
    count
        .checked_mul(element_type.size_bytes())
        .and_then(|bytes| u64::try_from(bytes).ok())
        .ok_or_else(|| invalid(format!("{} elements of {} overflow LMem", count, element_type)))
}

impl<'a> KernelContext<'a> {
    pub fn new(
        params: &'a BTreeMap<String, ParamValue>,
        inputs: HashMap<String, ArrayData>,
        output_counts: HashMap<String, usize>,
        lmem: &'a mut Vec<u8>,
        lmem_limit: usize,
    ) -> Self {
        Self {
            params,
            inputs,
            output_counts,
            outputs: HashMap::new(),
            lmem,
            lmem_limit,
        }
    }

    pub fn param_u64(&self, name: &str) -> Result<u64, RemoteError> {
        self.params
            .get(name)
            .and_then(ParamValue::as_u64)
            .ok_or_else(|| invalid(format!("parameter '{}' must be a non-negative integer", name)))
    }

    pub fn param_i64(&self, name: &str) -> Result<i64, RemoteError> {
        self.params
            .get(name)
            .and_then(ParamValue::as_i64)
            .ok_or_else(|| invalid(format!("parameter '{}' must be an integer", name)))
    }

    /// `N` as an element count, checked against the engine's addressable size.
    pub fn stream_length(&self) -> Result<usize, RemoteError> {
        usize::try_from(self.param_u64("N")?).map_err(|_| invalid("parameter 'N' is out of range"))
    }

    /// The first `count` elements streamed into `port`.
    pub fn input<T: Element>(&self, port: &str, count: usize) -> Result<Vec<T>, RemoteError> {
        let data = self
            .inputs
            .get(port)
            .ok_or_else(|| invalid(format!("input '{}' is not bound", port)))?;
        if data.len() < count {
            return Err(invalid(format!(
                "input '{}' holds {} elements, {} requested",
                port,
                data.len(),
                count
            )));
        }
        T::from_array(data.prefix(count))
            .map_err(|other| invalid(format!("input '{}' holds {}", port, other.element_type())))
    }

    /// Raw bytes of the buffer bound to `port`.
    pub fn input_bytes(&self, port: &str) -> Result<Vec<u8>, RemoteError> {
        self.inputs
            .get(port)
            .map(ArrayData::to_le_bytes)
            .ok_or_else(|| invalid(format!("input '{}' is not bound", port)))
    }

    /// Writes `values` to the buffer bound to output `port`.
    pub fn emit(&mut self, port: &str, values: ArrayData) -> Result<(), RemoteError> {
        let capacity = *self
            .output_counts
            .get(port)
            .ok_or_else(|| invalid(format!("output '{}' is not bound", port)))?;
        if values.len() > capacity {
            return Err(invalid(format!(
                "output '{}' produces {} elements into a buffer of {}",
                port,
                values.len(),
                capacity
            )));
        }
        self.outputs.insert(port.to_string(), values);
        Ok(())
    }

    pub fn into_outputs(self) -> HashMap<String, ArrayData> {
        self.outputs
    }

    fn lmem_range(&self, address: u64, nbytes: u64) -> Result<std::ops::Range<usize>, RemoteError> {
        let start = usize::try_from(address).map_err(|_| invalid("LMem address out of range"))?;
        let len = usize::try_from(nbytes).map_err(|_| invalid("LMem length out of range"))?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.lmem_limit)
            .ok_or_else(|| {
                invalid(format!(
                    "LMem access [{}, {}+{}) exceeds {} bytes",
                    address, address, nbytes, self.lmem_limit
                ))
            })?;
        Ok(start..end)
    }

    pub fn lmem_write(&mut self, address: u64, bytes: &[u8]) -> Result<(), RemoteError> {
        let range = self.lmem_range(address, bytes.len() as u64)?;
        if self.lmem.len() < range.end {
            self.lmem.resize(range.end, 0);
        }
        self.lmem[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Reads `nbytes` from LMem. Memory that was never written reads as zero.
    pub fn lmem_read(&self, address: u64, nbytes: u64) -> Result<Vec<u8>, RemoteError> {
        let range = self.lmem_range(address, nbytes)?;
        let mut bytes = vec![0u8; range.len()];
        let available = self.lmem.len().saturating_sub(range.start).min(range.len());
        if available > 0 {
            bytes[..available].copy_from_slice(&self.lmem[range.start..range.start + available]);
        }
        Ok(bytes)
    }

    pub fn lmem_read_as<T: Element>(&self, address: u64, count: usize) -> Result<Vec<T>, RemoteError> {
        let nbytes = region_bytes(T::TYPE, count)?;
        let bytes = self.lmem_read(address, nbytes)?;
        T::from_array(ArrayData::from_le_bytes(T::TYPE, &bytes))
            .map_err(|_| invalid("LMem decode produced the wrong element type"))
    }

    pub fn lmem_write_as<T: Element>(&mut self, address: u64, values: Vec<T>) -> Result<(), RemoteError> {
        let bytes = T::into_array(values).to_le_bytes();
        self.lmem_write(address, &bytes)
    }
}

pub trait Kernel: Send + Sync {
    /// Name clients pass to `init_definition`.
    fn definition(&self) -> &'static str;

    /// Element type of every stream the kernel touches.
    fn element_type(&self) -> ElementType;

    fn actions(&self) -> &'static [ActionSignature];

    fn execute(&self, action: &str, ctx: &mut KernelContext<'_>) -> Result<(), RemoteError>;

    fn signature(&self, action: &str) -> Option<&'static ActionSignature> {
        self.actions().iter().find(|signature| signature.name == action)
    }
}

fn unknown_action(kernel: &dyn Kernel, action: &str) -> RemoteError {
    RemoteError::new(
        RemoteErrorKind::InvalidAction,
        format!("{} has no action '{}'", kernel.definition(), action),
    )
}

const WRITE_LMEM: ActionSignature = ActionSignature {
    name: "writeLMem",
    params: &["address", "nbytes"],
    inputs: &["cpu_to_lmem"],
    outputs: &[],
};

const READ_LMEM: ActionSignature = ActionSignature {
    name: "readLMem",
    params: &["address", "nbytes"],
    inputs: &[],
    outputs: &["lmem_to_cpu"],
};

fn write_lmem(ctx: &mut KernelContext<'_>) -> Result<(), RemoteError> {
    let address = ctx.param_u64("address")?;
    let nbytes = ctx.param_u64("nbytes")?;
    let bytes = ctx.input_bytes("cpu_to_lmem")?;
    let len = usize::try_from(nbytes)
        .ok()
        .filter(|&len| len <= bytes.len())
        .ok_or_else(|| {
            invalid(format!(
                "writeLMem of {} bytes from a {} byte buffer",
                nbytes,
                bytes.len()
            ))
        })?;
    ctx.lmem_write(address, &bytes[..len])
}

fn read_lmem(ctx: &mut KernelContext<'_>, element_type: ElementType) -> Result<(), RemoteError> {
    let address = ctx.param_u64("address")?;
    let nbytes = ctx.param_u64("nbytes")?;
    let bytes = ctx.lmem_read(address, nbytes)?;
    ctx.emit("lmem_to_cpu", ArrayData::from_le_bytes(element_type, &bytes))
}

/// `y = x * x + x` over doubles.
pub struct SimpleKernel;

impl Kernel for SimpleKernel {
    fn definition(&self) -> &'static str {
        "Simple"
    }

    fn element_type(&self) -> ElementType {
        ElementType::Float64
    }

    fn actions(&self) -> &'static [ActionSignature] {
        &[ActionSignature {
            name: "default",
            params: &["N"],
            inputs: &["x"],
            outputs: &["y"],
        }]
    }

    fn execute(&self, action: &str, ctx: &mut KernelContext<'_>) -> Result<(), RemoteError> {
        if action != "default" {
            return Err(unknown_action(self, action));
        }
        let n = ctx.stream_length()?;
        let y: Vec<f64> = ctx.input::<f64>("x", n)?.into_iter().map(|x| x * x + x).collect();
        ctx.emit("y", f64::into_array(y))
    }
}

/// Streams floats through unchanged.
pub struct PassThroughKernel;

impl Kernel for PassThroughKernel {
    fn definition(&self) -> &'static str {
        "PassThrough"
    }

    fn element_type(&self) -> ElementType {
        ElementType::Float32
    }

    fn actions(&self) -> &'static [ActionSignature] {
        &[ActionSignature {
            name: "default",
            params: &["N"],
            inputs: &["x"],
            outputs: &["y"],
        }]
    }

    fn execute(&self, action: &str, ctx: &mut KernelContext<'_>) -> Result<(), RemoteError> {
        if action != "default" {
            return Err(unknown_action(self, action));
        }
        let n = ctx.stream_length()?;
        let x = ctx.input::<f32>("x", n)?;
        ctx.emit("y", f32::into_array(x))
    }
}

/// Three-point moving average with two-point averages at both edges.
pub struct MovingAverageKernel;

impl Kernel for MovingAverageKernel {
    fn definition(&self) -> &'static str {
        "MovingAverage"
    }

    fn element_type(&self) -> ElementType {
        ElementType::Float32
    }

    fn actions(&self) -> &'static [ActionSignature] {
        &[ActionSignature {
            name: "default",
            params: &["N"],
            inputs: &["x"],
            outputs: &["y"],
        }]
    }

    fn execute(&self, action: &str, ctx: &mut KernelContext<'_>) -> Result<(), RemoteError> {
        if action != "default" {
            return Err(unknown_action(self, action));
        }
        let n = ctx.stream_length()?;
        if n < 2 {
            return Err(invalid("MovingAverage needs at least 2 elements"));
        }
        let x = ctx.input::<f32>("x", n)?;
        let y: Vec<f32> = (0..n)
            .map(|i| match i {
                0 => (x[0] + x[1]) / 2.0,
                i if i == n - 1 => (x[n - 1] + x[n - 2]) / 2.0,
                i => (x[i - 1] + x[i] + x[i + 1]) / 3.0,
            })
            .collect();
        ctx.emit("y", f32::into_array(y))
    }
}

/// `s = x + y + A`, with `x` read from LMem at address 0.
pub struct VectorAdditionKernel;

impl Kernel for VectorAdditionKernel {
    fn definition(&self) -> &'static str {
        "VectorAddition"
    }

    fn element_type(&self) -> ElementType {
        ElementType::Int32
    }

    fn actions(&self) -> &'static [ActionSignature] {
        &[
            WRITE_LMEM,
            ActionSignature {
                name: "default",
                params: &["A", "N"],
                inputs: &["y"],
                outputs: &["s"],
            },
        ]
    }

    fn execute(&self, action: &str, ctx: &mut KernelContext<'_>) -> Result<(), RemoteError> {
        match action {
            "writeLMem" => write_lmem(ctx),
            "default" => {
                let n = ctx.stream_length()?;
                let a = i32::try_from(ctx.param_i64("A")?)
                    .map_err(|_| invalid("parameter 'A' does not fit in 32 bits"))?;
                let y = ctx.input::<i32>("y", n)?;
                let x = ctx.lmem_read_as::<i32>(0, n)?;
                let s: Vec<i32> = x
                    .iter()
                    .zip(&y)
                    .map(|(x, y)| x.wrapping_add(*y).wrapping_add(a))
                    .collect();
                ctx.emit("s", i32::into_array(s))
            }
            other => Err(unknown_action(self, other)),
        }
    }
}

/// Adds two LMem regions written by the client and stores the sum after them.
pub struct LmemLoopbackKernel;

impl Kernel for LmemLoopbackKernel {
    fn definition(&self) -> &'static str {
        "LMemLoopback"
    }

    fn element_type(&self) -> ElementType {
        ElementType::Int32
    }

    fn actions(&self) -> &'static [ActionSignature] {
        &[
            WRITE_LMEM,
            ActionSignature {
                name: "default",
                params: &["N"],
                inputs: &[],
                outputs: &[],
            },
            READ_LMEM,
        ]
    }

    fn execute(&self, action: &str, ctx: &mut KernelContext<'_>) -> Result<(), RemoteError> {
        match action {
            "writeLMem" => write_lmem(ctx),
            "readLMem" => read_lmem(ctx, ElementType::Int32),
            "default" => {
                let n = ctx.stream_length()?;
                let region = region_bytes(ElementType::Int32, n)?;
                let sum_address = region
                    .checked_mul(2)
                    .ok_or_else(|| invalid(format!("N = {} overflows LMem", n)))?;
                let a = ctx.lmem_read_as::<i32>(0, n)?;
                let b = ctx.lmem_read_as::<i32>(region, n)?;
                let sum: Vec<i32> = a.iter().zip(&b).map(|(a, b)| a.wrapping_add(*b)).collect();
                ctx.lmem_write_as(sum_address, sum)
            }
            other => Err(unknown_action(self, other)),
        }
    }
}

/// Kernels available to the simulated engine, keyed by definition name.
pub struct KernelRegistry {
    kernels: HashMap<&'static str, Box<dyn Kernel>>,
}

impl KernelRegistry {
    pub fn empty() -> Self {
        Self {
            kernels: HashMap::new(),
        }
    }

    pub fn register(&mut self, kernel: Box<dyn Kernel>) {
        self.kernels.insert(kernel.definition(), kernel);
    }

    pub fn get(&self, definition: &str) -> Option<&dyn Kernel> {
        self.kernels.get(definition).map(|kernel| kernel.as_ref())
    }

    pub fn definitions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.kernels.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(SimpleKernel));
        registry.register(Box::new(PassThroughKernel));
        registry.register(Box::new(MovingAverageKernel));
        registry.register(Box::new(VectorAdditionKernel));
        registry.register(Box::new(LmemLoopbackKernel));
        registry
    }
}

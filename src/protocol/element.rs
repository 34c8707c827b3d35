// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Element types understood by the remote engine and the typed arrays that
//! travel over the channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a remote buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::Int32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::Float64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// A single value of any supported element type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
        }
    }
}

/// A typed array as carried by `send`/`receive` calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ArrayData {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

fn decode<const N: usize, T>(bytes: &[u8], from_le: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            from_le(raw)
        })
        .collect()
}

impl ArrayData {
    /// An array of `count` zero elements.
    pub fn zeroed(element_type: ElementType, count: usize) -> Self {
        match element_type {
            ElementType::Int32 => ArrayData::Int32(vec![0; count]),
            ElementType::Int64 => ArrayData::Int64(vec![0; count]),
            ElementType::Float32 => ArrayData::Float32(vec![0.0; count]),
            ElementType::Float64 => ArrayData::Float64(vec![0.0; count]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayData::Int32(_) => ElementType::Int32,
            ArrayData::Int64(_) => ElementType::Int64,
            ArrayData::Float32(_) => ElementType::Float32,
            ArrayData::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int32(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float32(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().size_bytes()
    }

    /// Little-endian byte image, the layout the engine's large memory uses.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            ArrayData::Int32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::Int64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::Float32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::Float64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Decode a little-endian byte image. Trailing bytes that do not form a whole
    /// element are ignored.
    pub fn from_le_bytes(element_type: ElementType, bytes: &[u8]) -> Self {
        match element_type {
            ElementType::Int32 => ArrayData::Int32(decode(bytes, i32::from_le_bytes)),
            ElementType::Int64 => ArrayData::Int64(decode(bytes, i64::from_le_bytes)),
            ElementType::Float32 => ArrayData::Float32(decode(bytes, f32::from_le_bytes)),
            ElementType::Float64 => ArrayData::Float64(decode(bytes, f64::from_le_bytes)),
        }
    }

    /// Copy of the first `count` elements (or all of them if shorter).
    pub fn prefix(&self, count: usize) -> Self {
        match self {
            ArrayData::Int32(v) => ArrayData::Int32(v[..count.min(v.len())].to_vec()),
            ArrayData::Int64(v) => ArrayData::Int64(v[..count.min(v.len())].to_vec()),
            ArrayData::Float32(v) => ArrayData::Float32(v[..count.min(v.len())].to_vec()),
            ArrayData::Float64(v) => ArrayData::Float64(v[..count.min(v.len())].to_vec()),
        }
    }

    /// Overwrites the leading elements with `data`. Returns false, leaving
    /// `self` untouched, if the types differ or `data` is longer.
    pub fn write_prefix(&mut self, data: &ArrayData) -> bool {
        fn copy<T: Copy>(dst: &mut [T], src: &[T]) -> bool {
            if src.len() > dst.len() {
                return false;
            }
            dst[..src.len()].copy_from_slice(src);
            true
        }

        match (self, data) {
            (ArrayData::Int32(dst), ArrayData::Int32(src)) => copy(dst, src),
            (ArrayData::Int64(dst), ArrayData::Int64(src)) => copy(dst, src),
            (ArrayData::Float32(dst), ArrayData::Float32(src)) => copy(dst, src),
            (ArrayData::Float64(dst), ArrayData::Float64(src)) => copy(dst, src),
            _ => false,
        }
    }
}

/// Rust types that map onto a remote [`ElementType`].
pub trait Element: Copy + PartialEq + Default + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const TYPE: ElementType;

    fn into_array(values: Vec<Self>) -> ArrayData;

    /// Unwraps an array of the matching type, handing the array back otherwise.
    fn from_array(data: ArrayData) -> Result<Vec<Self>, ArrayData>;

    fn to_scalar(self) -> Scalar;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const TYPE: ElementType = ElementType::$variant;

            fn into_array(values: Vec<Self>) -> ArrayData {
                ArrayData::$variant(values)
            }

            fn from_array(data: ArrayData) -> Result<Vec<Self>, ArrayData> {
                match data {
                    ArrayData::$variant(values) => Ok(values),
                    other => Err(other),
                }
            }

            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
        }
    };
}

impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);

//! Scalar element types and their payloads

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::packing::SCALAR_WIDTH;

/// Element type of every leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    Uint,
    Float,
}

impl ScalarType {
    /// Shading language spelling
    pub fn glsl_name(self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Uint => "uint",
            ScalarType::Float => "float",
        }
    }

    /// Prefix used for vector type names (`ivec3`, `uvec2`, `vec4`)
    pub fn vector_prefix(self) -> &'static str {
        match self {
            ScalarType::Int => "i",
            ScalarType::Uint => "u",
            ScalarType::Float => "",
        }
    }

    pub fn size(self) -> usize {
        SCALAR_WIDTH
    }

    pub fn zero(self) -> Scalar {
        match self {
            ScalarType::Int => Scalar::Int(0),
            ScalarType::Uint => Scalar::Uint(0),
            ScalarType::Float => Scalar::Float(0.0),
        }
    }

    /// Same conversion the generated source applies: `int(seed)`, `uint(seed)`, `float(seed)`
    pub fn from_seed(self, seed: f32) -> Scalar {
        match self {
            ScalarType::Int => Scalar::Int(seed as i32),
            ScalarType::Uint => Scalar::Uint(seed as u32),
            ScalarType::Float => Scalar::Float(seed),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// Current value of one scalar slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i32),
    Uint(u32),
    Float(f32),
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Int(_) => ScalarType::Int,
            Scalar::Uint(_) => ScalarType::Uint,
            Scalar::Float(_) => ScalarType::Float,
        }
    }

    /// Host-endian write of exactly `SCALAR_WIDTH` bytes
    pub fn write_bytes(&self, dst: &mut [u8]) {
        match self {
            Scalar::Int(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Scalar::Uint(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Scalar::Float(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
        }
    }

    /// Host-endian read, keeping this slot's type
    pub fn read_bytes(&mut self, src: &[u8]) {
        *self = match self {
            Scalar::Int(_) => Scalar::Int(bytemuck::pod_read_unaligned(src)),
            Scalar::Uint(_) => Scalar::Uint(bytemuck::pod_read_unaligned(src)),
            Scalar::Float(_) => Scalar::Float(bytemuck::pod_read_unaligned(src)),
        };
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Uint(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
        }
    }
}

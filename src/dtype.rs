//! Element types understood by the fixed-function kernel set
//!
//! The precompiled kernels exist in fp32 and fp16 flavours only. The dtype
//! feeds two things: the element size used for stride capture, and the
//! channel-packing rules in the constraint checker (fp16 doubles every
//! channel divisibility requirement relative to fp32).

use std::fmt;

/// Element type of the convolution tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE float
    F32,
    /// 16-bit IEEE float
    F16,
}

impl DType {
    /// Size of one element in bytes.
    #[inline]
    pub fn size_bytes(&self) -> u32 {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
        }
    }

    /// Whether this is the half-precision type.
    #[inline]
    pub fn is_fp16(&self) -> bool {
        matches!(self, DType::F16)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
        }
    }
}

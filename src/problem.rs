//! Convolution problem descriptor
//!
//! [`ConvProblem`] carries the immutable shape/layout facts the solver plans
//! against. It is created once per call site by the caller and never mutated;
//! every planning entry point is a pure function of this value (plus the
//! device capability).
//!
//! The descriptor always describes the *forward* convolution geometry:
//! `n x c x h x w` activations, `k x c x r x s` filters, `n x k x out_h x
//! out_w` outputs. Backward directions reuse the same geometry and flip the
//! roles of the tensors inside the kernels, not in the descriptor.

use crate::dtype::DType;

/// Which derivative of the convolution is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Plain forward convolution
    Forward,
    /// Gradient with respect to the input activations
    BackwardData,
    /// Gradient with respect to the filter weights
    BackwardWeights,
}

impl Direction {
    /// Whether this is the forward direction.
    #[inline]
    pub fn is_forward(&self) -> bool {
        matches!(self, Direction::Forward)
    }

    /// Whether this is the backward-data direction.
    #[inline]
    pub fn is_backward_data(&self) -> bool {
        matches!(self, Direction::BackwardData)
    }

    /// Whether this is the backward-weights direction.
    #[inline]
    pub fn is_backward_weights(&self) -> bool {
        matches!(self, Direction::BackwardWeights)
    }

    /// Whether this is one of the two backward directions.
    #[inline]
    pub fn is_backward(&self) -> bool {
        !self.is_forward()
    }
}

/// Memory layout of the activation tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorLayout {
    /// Packed channel-major layout (the only layout the kernel set supports)
    Nchw,
    /// Channel-minor layout
    Nhwc,
}

/// Immutable descriptor of one convolution problem.
///
/// All dimensions are raw tensor extents; output extents and backward
/// padding are derived. Validation happens in the constraint checker, not
/// here - constructing an oversized or otherwise unsupported problem is
/// fine, it will simply be reported as not applicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvProblem {
    /// Batch size (N)
    pub n: u32,
    /// Input channels (C)
    pub c: u32,
    /// Input height (H)
    pub h: u32,
    /// Input width (W)
    pub w: u32,
    /// Output channels (K)
    pub k: u32,
    /// Filter height (R)
    pub r: u32,
    /// Filter width (S)
    pub s: u32,
    /// Vertical padding
    pub pad_h: u32,
    /// Horizontal padding
    pub pad_w: u32,
    /// Vertical filter stride
    pub stride_h: u32,
    /// Horizontal filter stride
    pub stride_w: u32,
    /// Vertical filter dilation
    pub dilation_h: u32,
    /// Horizontal filter dilation
    pub dilation_w: u32,
    /// Convolution direction
    pub direction: Direction,
    /// Number of convolution groups
    pub group_count: u32,
    /// Element type of all three tensors
    pub dtype: DType,
    /// Activation tensor layout
    pub layout: TensorLayout,
    /// Whether a bias tensor is fused into the convolution
    pub has_bias: bool,
    /// Whether a relu activation is fused into the main compute kernel
    pub fused_relu: bool,
}

impl Default for ConvProblem {
    fn default() -> Self {
        Self {
            n: 1,
            c: 1,
            h: 1,
            w: 1,
            k: 1,
            r: 1,
            s: 1,
            pad_h: 0,
            pad_w: 0,
            stride_h: 1,
            stride_w: 1,
            dilation_h: 1,
            dilation_w: 1,
            direction: Direction::Forward,
            group_count: 1,
            dtype: DType::F32,
            layout: TensorLayout::Nchw,
            has_bias: false,
            fused_relu: false,
        }
    }
}

impl ConvProblem {
    /// Output height by the standard convolution formula, clamped at zero.
    pub fn out_h(&self) -> u32 {
        conv_out_dim(self.h, self.pad_h, self.r, self.stride_h, self.dilation_h)
    }

    /// Output width by the standard convolution formula, clamped at zero.
    pub fn out_w(&self) -> u32 {
        conv_out_dim(self.w, self.pad_w, self.s, self.stride_w, self.dilation_w)
    }

    /// Vertical padding of the equivalent backward (transposed) convolution.
    ///
    /// May be negative, in which case the backward directions are rejected
    /// by the constraint checker.
    pub fn backward_pad_h(&self) -> i64 {
        self.r as i64 - self.pad_h as i64 - 1
    }

    /// Horizontal padding of the equivalent backward (transposed) convolution.
    pub fn backward_pad_w(&self) -> i64 {
        self.s as i64 - self.pad_w as i64 - 1
    }

    /// Whether filter size, stride, and dilation are all unit.
    ///
    /// Such problems take the single-stage pointwise fast path and need no
    /// auxiliary workspace.
    pub fn is_unit_pointwise(&self) -> bool {
        (self.r | self.s | self.stride_h | self.stride_w | self.dilation_h | self.dilation_w) == 1
    }

    /// Whether the input needs out-of-bounds zero padding before compute.
    #[inline]
    pub fn needs_spatial_padding(&self) -> bool {
        (self.pad_h | self.pad_w) != 0
    }

    /// Padded input width (`W + 2 * pad_w`).
    #[inline]
    pub fn padded_w(&self) -> u32 {
        self.w + 2 * self.pad_w
    }

    /// Padded input height (`H + 2 * pad_h`).
    #[inline]
    pub fn padded_h(&self) -> u32 {
        self.h + 2 * self.pad_h
    }

    /// Input channels per group.
    #[inline]
    pub fn c_per_group(&self) -> u32 {
        self.c / self.group_count.max(1)
    }
}

/// One output extent: `(dim + 2*pad - dilation*(filter-1) - 1) / stride + 1`.
fn conv_out_dim(dim: u32, pad: u32, filter: u32, stride: u32, dilation: u32) -> u32 {
    let numer = dim as i64 + 2 * pad as i64 - dilation as i64 * (filter as i64 - 1) - 1;
    if numer < 0 || stride == 0 {
        return 0;
    }
    (numer / stride as i64 + 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_dims_identity() {
        let p = ConvProblem {
            h: 56,
            w: 56,
            ..Default::default()
        };
        assert_eq!(p.out_h(), 56);
        assert_eq!(p.out_w(), 56);
    }

    #[test]
    fn test_out_dims_3x3_same() {
        let p = ConvProblem {
            h: 56,
            w: 56,
            r: 3,
            s: 3,
            pad_h: 1,
            pad_w: 1,
            ..Default::default()
        };
        assert_eq!(p.out_h(), 56);
        assert_eq!(p.out_w(), 56);
    }

    #[test]
    fn test_out_dims_stride_2() {
        let p = ConvProblem {
            h: 224,
            w: 224,
            r: 7,
            s: 7,
            pad_h: 3,
            pad_w: 3,
            stride_h: 2,
            stride_w: 2,
            ..Default::default()
        };
        assert_eq!(p.out_h(), 112);
        assert_eq!(p.out_w(), 112);
    }

    #[test]
    fn test_backward_pad() {
        let p = ConvProblem {
            r: 3,
            s: 3,
            pad_h: 1,
            pad_w: 1,
            ..Default::default()
        };
        assert_eq!(p.backward_pad_h(), 1);
        assert_eq!(p.backward_pad_w(), 1);

        let q = ConvProblem {
            pad_h: 2,
            ..Default::default()
        };
        // 1x1 filter with padding: backward pad goes negative.
        assert_eq!(q.backward_pad_h(), -2);
    }

    #[test]
    fn test_unit_pointwise() {
        assert!(ConvProblem::default().is_unit_pointwise());
        let p = ConvProblem {
            r: 3,
            s: 3,
            ..Default::default()
        };
        assert!(!p.is_unit_pointwise());
        let q = ConvProblem {
            stride_w: 2,
            ..Default::default()
        };
        assert!(!q.is_unit_pointwise());
    }
}

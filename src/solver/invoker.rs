//! Invocation builder
//!
//! Everything the kernels need at execution time except the tensor
//! addresses is captured when the plan is built: dimensions, padding,
//! per-tensor axis strides, workspace sub-buffer offsets, and the routing
//! flag word. Invoking the plan later only substitutes addresses and issues
//! the launches in stage order - no shape arithmetic is redone, which is a
//! performance contract, not a style choice.

use tracing::debug;

use crate::device::DeviceCapability;
use crate::error::{Error, Result};
use crate::launch::LaunchSpec;
use crate::problem::ConvProblem;
use crate::runtime::{ConvTensors, KernelLauncher, LaunchArg, LaunchArgs};
use crate::solver::planner::{staged_ntidx, StageKind};
use crate::solver::workspace::{padding_buffer_size, permute_buffer_size};

/// Reverse the filter height axis (backward directions).
pub const F_REVERSE_R: u32 = 1 << 0;
/// Reverse the filter width axis (backward directions).
pub const F_REVERSE_S: u32 = 1 << 1;
/// Swap the input/output channel roles of the filter (backward directions).
pub const F_FLIP_K_C: u32 = 1 << 2;
/// Explicit per-tensor strides are supplied in the argument list.
pub const F_EXPLICIT_NKC_STRIDES: u32 = 1 << 9;

/// Scalars captured at plan-construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InvokeScalars {
    n: u32,
    c: u32,
    h: u32,
    w: u32,
    k: u32,
    compute_units: u32,
    out_h: u32,
    out_w: u32,
    r: u32,
    s: u32,
    pad_h: u32,
    pad_w: u32,
    group_count: u32,
    ntidx: u32,
    flags: u32,
    // Axis strides in bytes, derived from layout, dtype, and direction.
    d_n_stride: i32,
    d_c_stride: i32,
    f_k_stride: i32,
    f_c_stride: i32,
    o_n_stride: i32,
    o_k_stride: i32,
    // Workspace sub-buffer offsets (padding buffer starts at 0).
    perm_offset: u64,
    idx_offset: u64,
}

/// Deferred invocation value bound to one solution plan.
///
/// Pure data plus a `run` method; safe to call any number of times against
/// varying tensor addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvInvoker {
    stages: Vec<StageKind>,
    scalars: InvokeScalars,
}

impl ConvInvoker {
    /// Capture every execution-time scalar for `problem`.
    pub(crate) fn capture(
        problem: &ConvProblem,
        caps: &DeviceCapability,
        stages: Vec<StageKind>,
    ) -> Self {
        let es = problem.dtype.size_bytes() as i32;
        let forward = problem.direction.is_forward();

        let flags = if forward {
            F_EXPLICIT_NKC_STRIDES
        } else {
            F_EXPLICIT_NKC_STRIDES | F_REVERSE_R | F_REVERSE_S | F_FLIP_K_C
        };

        let d_c_stride = problem.h as i32 * problem.w as i32 * es;
        let d_n_stride = problem.c as i32 * d_c_stride;
        let f_c_stride = problem.r as i32 * problem.s as i32 * es
            * if forward { 1 } else { problem.k as i32 };
        let f_k_stride = problem.r as i32 * problem.s as i32 * es
            * if forward { problem.c as i32 } else { 1 };
        let o_k_stride = problem.out_h() as i32 * problem.out_w() as i32 * es;
        let o_n_stride = problem.k as i32 * o_k_stride;

        let perm_offset = padding_buffer_size(problem);
        let idx_offset = perm_offset + permute_buffer_size(problem);

        let ntidx = if problem.is_unit_pointwise() {
            crate::solver::planner::pointwise_ntidx(problem) as u32
        } else {
            staged_ntidx(problem) as u32
        };

        let scalars = InvokeScalars {
            n: problem.n,
            c: problem.c,
            h: problem.h,
            w: problem.w,
            k: problem.k,
            compute_units: caps.max_compute_units,
            out_h: problem.out_h(),
            out_w: problem.out_w(),
            r: problem.r,
            s: problem.s,
            pad_h: problem.pad_h,
            pad_w: problem.pad_w,
            group_count: problem.group_count,
            ntidx,
            flags,
            d_n_stride,
            d_c_stride,
            f_k_stride,
            f_c_stride,
            o_n_stride,
            o_k_stride,
            perm_offset,
            idx_offset,
        };

        debug!(
            n = scalars.n,
            c = scalars.c,
            h = scalars.h,
            w = scalars.w,
            k = scalars.k,
            out_h = scalars.out_h,
            out_w = scalars.out_w,
            flags = scalars.flags,
            d_n_stride = scalars.d_n_stride,
            d_c_stride = scalars.d_c_stride,
            f_k_stride = scalars.f_k_stride,
            f_c_stride = scalars.f_c_stride,
            o_n_stride = scalars.o_n_stride,
            o_k_stride = scalars.o_k_stride,
            "captured invocation scalars"
        );

        Self { stages, scalars }
    }

    /// The routing flag word captured for the main compute kernel.
    #[inline]
    pub fn flags(&self) -> u32 {
        self.scalars.flags
    }

    /// Issue every launch in fixed stage order.
    ///
    /// `specs` must be the launch list of the plan this invoker was built
    /// with; the façade passes it through [`crate::solver::SolutionPlan`].
    pub fn run(
        &self,
        launcher: &dyn KernelLauncher,
        specs: &[LaunchSpec],
        tensors: &ConvTensors,
    ) -> Result<()> {
        if specs.len() != self.stages.len() {
            return Err(Error::Internal(format!(
                "stage/spec count mismatch: {} vs {}",
                self.stages.len(),
                specs.len()
            )));
        }
        for (kind, spec) in self.stages.iter().zip(specs.iter()) {
            let args = self.stage_args(*kind, tensors);
            launcher.launch(spec, &args)?;
        }
        Ok(())
    }

    fn stage_args(&self, kind: StageKind, t: &ConvTensors) -> LaunchArgs {
        let sc = &self.scalars;
        match kind {
            StageKind::Pointwise => LaunchArgs::from_slice(&[
                LaunchArg::Ptr(t.input),
                LaunchArg::Ptr(t.weights),
                LaunchArg::Ptr(t.output),
                LaunchArg::U32(sc.n),
                LaunchArg::U32(sc.c),
                LaunchArg::U32(sc.k),
                LaunchArg::U32(sc.out_h * sc.out_w),
                LaunchArg::U32(sc.group_count),
                LaunchArg::U32(sc.flags),
            ]),
            StageKind::Padding => LaunchArgs::from_slice(&[
                LaunchArg::Ptr(t.input),
                LaunchArg::Ptr(t.workspace),
                LaunchArg::U32(sc.n),
                LaunchArg::U32(sc.c),
                LaunchArg::U32(sc.h),
                LaunchArg::U32(sc.w),
                LaunchArg::U32(sc.pad_h),
                LaunchArg::U32(sc.pad_w),
            ]),
            StageKind::PermuteFlip => LaunchArgs::from_slice(&[
                LaunchArg::Ptr(t.weights),
                LaunchArg::Ptr(t.workspace + sc.perm_offset),
                LaunchArg::U32(sc.n),
                LaunchArg::U32(sc.c),
                LaunchArg::U32(sc.k),
                LaunchArg::U32(sc.r),
                LaunchArg::U32(sc.s),
            ]),
            StageKind::IndexGen => LaunchArgs::from_slice(&[
                LaunchArg::Ptr(t.workspace + sc.idx_offset),
                LaunchArg::U32(sc.ntidx),
                LaunchArg::U32(sc.k),
                LaunchArg::U32(sc.out_h),
                LaunchArg::U32(sc.out_w),
            ]),
            // The compute kernel ABI: dimensions, flags, the three tensors,
            // workspace, filter geometry, then the explicit strides.
            StageKind::Compute => LaunchArgs::from_slice(&[
                LaunchArg::I32(sc.n as i32),
                LaunchArg::I32(sc.c as i32),
                LaunchArg::I32(sc.h as i32),
                LaunchArg::I32(sc.w as i32),
                LaunchArg::I32(sc.k as i32),
                LaunchArg::I32(sc.compute_units as i32),
                LaunchArg::I32(sc.flags as i32),
                LaunchArg::I32(0), // reserved
                LaunchArg::Ptr(t.input),
                LaunchArg::Ptr(t.weights),
                LaunchArg::Ptr(t.output),
                LaunchArg::Ptr(t.workspace),
                LaunchArg::I32(sc.r as i32),
                LaunchArg::I32(sc.s as i32),
                LaunchArg::I32(sc.pad_h as i32),
                LaunchArg::I32(sc.pad_w as i32),
                LaunchArg::I32(sc.out_h as i32),
                LaunchArg::I32(sc.out_w as i32),
                LaunchArg::Ptr(0), // reserved
                LaunchArg::I32(0), // reserved
                LaunchArg::I32(sc.d_n_stride),
                LaunchArg::I32(sc.d_c_stride),
                LaunchArg::I32(sc.f_k_stride),
                LaunchArg::I32(sc.f_c_stride),
                LaunchArg::I32(sc.o_n_stride),
                LaunchArg::I32(sc.o_k_stride),
            ]),
        }
    }
}

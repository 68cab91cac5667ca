//! Seam to the external kernel-launch runtime
//!
//! The solver never talks to a GPU. It hands every resolved [`LaunchSpec`]
//! plus a packed argument list to a caller-supplied [`KernelLauncher`]; the
//! launcher owns kernel loading, the command stream, and failure reporting.
//!
//! Buffer addresses cross this seam as raw `u64` device handles.

use crate::error::Result;
use crate::launch::LaunchSpec;
use smallvec::SmallVec;

/// One kernel argument, in the order the kernel's ABI expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchArg {
    /// Signed 32-bit scalar
    I32(i32),
    /// Unsigned 32-bit scalar
    U32(u32),
    /// Device buffer address
    Ptr(u64),
}

/// Argument list for one launch.
///
/// The main compute kernel takes 26 arguments; the staging kernels far
/// fewer. Inline capacity keeps the hot path allocation-free.
pub type LaunchArgs = SmallVec<[LaunchArg; 26]>;

/// Runtime tensor addresses supplied at invocation time.
///
/// Shapes were captured at plan-construction time; only the addresses vary
/// between invocations of the same plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvTensors {
    /// Input activation buffer
    pub input: u64,
    /// Filter weight buffer
    pub weights: u64,
    /// Output buffer
    pub output: u64,
    /// Auxiliary workspace buffer; 0 when the plan needs no workspace
    pub workspace: u64,
}

/// Abstract kernel-launch backend.
///
/// Implementations resolve `spec.kernel_file` / `spec.kernel_name` to a
/// loadable kernel, apply `spec.build_options`, and enqueue the launch on
/// their command stream. Launches issued through one invoker run strictly
/// in call order.
pub trait KernelLauncher {
    /// Launch one kernel with the given arguments.
    fn launch(&self, spec: &LaunchSpec, args: &[LaunchArg]) -> Result<()>;
}

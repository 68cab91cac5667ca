//! Solver façade
//!
//! Composes the constraint checker, launch planner, workspace sizer, and
//! invocation builder into the three-call surface the embedder sees:
//! `is_applicable`, `workspace_size`, `get_solution`. All three are
//! idempotent, side-effect-free functions of the problem and device
//! capability; a [`SolutionPlan`] may be cached by the caller and invoked
//! any number of times.

pub mod applicability;
pub mod invoker;
pub mod planner;
pub mod workspace;

use crate::device::DeviceCapability;
use crate::error::{Error, Result};
use crate::launch::LaunchSpec;
use crate::problem::ConvProblem;
use crate::runtime::{ConvTensors, KernelLauncher};

pub use invoker::ConvInvoker;
pub use planner::{PlannedStage, StageKind};

/// Complete executable plan for one problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionPlan {
    /// Ordered launch configurations; stage order is semantically fixed
    pub launches: Vec<LaunchSpec>,
    /// Auxiliary workspace the caller must allocate, in bytes
    pub workspace_size: u64,
    /// Deferred invocation value bound to this plan
    pub invoker: ConvInvoker,
}

impl SolutionPlan {
    /// Execute the plan against runtime tensor addresses.
    pub fn invoke(&self, launcher: &dyn KernelLauncher, tensors: &ConvTensors) -> Result<()> {
        self.invoker.run(launcher, &self.launches, tensors)
    }
}

/// The fixed-function convolution solver.
///
/// Stateless; a single value can serve any number of problems from any
/// number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvSolver;

impl ConvSolver {
    /// Whether the kernel set can run `problem` on `caps`.
    pub fn is_applicable(&self, problem: &ConvProblem, caps: &DeviceCapability) -> bool {
        applicability::is_applicable(problem, caps)
    }

    /// Auxiliary workspace in bytes; 0 for the pointwise fast path.
    pub fn workspace_size(&self, problem: &ConvProblem) -> u64 {
        workspace::workspace_size(problem)
    }

    /// Assemble the solution plan for an applicable problem.
    ///
    /// Calling this for a problem `is_applicable` rejects is a caller
    /// contract violation; it asserts in debug builds and reports
    /// [`Error::NotApplicable`] in release builds.
    pub fn get_solution(
        &self,
        problem: &ConvProblem,
        caps: &DeviceCapability,
    ) -> Result<SolutionPlan> {
        debug_assert!(
            self.is_applicable(problem, caps),
            "get_solution called for an inapplicable problem"
        );
        if !self.is_applicable(problem, caps) {
            return Err(Error::NotApplicable);
        }

        let stages = planner::plan(problem, caps)?;
        let kinds: Vec<StageKind> = stages.iter().map(|s| s.kind).collect();
        let launches: Vec<LaunchSpec> = stages.into_iter().map(|s| s.spec).collect();
        let invoker = ConvInvoker::capture(problem, caps, kinds);

        Ok(SolutionPlan {
            launches,
            workspace_size: workspace::workspace_size(problem),
            invoker,
        })
    }
}

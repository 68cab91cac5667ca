//! # convplan
//!
//! **Convolution solver selection and kernel launch-configuration engine.**
//!
//! Given a convolution problem descriptor (shapes, layout, stride/dilation,
//! direction, dtype, device identity), convplan decides whether a
//! fixed-function precompiled kernel family applies, sizes the auxiliary
//! workspace, builds the ordered kernel launch configurations, and produces
//! a deferred invoker that later binds runtime tensor addresses.
//!
//! What this crate deliberately does **not** contain: the compute kernels
//! themselves (opaque artifacts addressed by source file and entry name),
//! the GPU stream/runtime that launches them (the [`runtime::KernelLauncher`]
//! seam), and any device memory allocation.
//!
//! ## Quick Start
//!
//! ```rust
//! use convplan::prelude::*;
//!
//! let problem = ConvProblem {
//!     n: 1,
//!     c: 64,
//!     h: 56,
//!     w: 56,
//!     k: 64,
//!     ..Default::default()
//! };
//! let caps = DeviceCapability::new("gfx906", 60);
//!
//! let solver = ConvSolver;
//! assert!(solver.is_applicable(&problem, &caps));
//! assert_eq!(solver.workspace_size(&problem), 0);
//! let plan = solver.get_solution(&problem, &caps).unwrap();
//! assert_eq!(plan.launches.len(), 1);
//! ```
//!
//! ## Design
//!
//! - Every planning entry point is a pure, synchronous function; the crate
//!   holds no shared mutable state and is safe to use concurrently.
//! - Unsupported problems are signalled only through `is_applicable`
//!   returning `false`, never through errors.
//! - Kernel variants are addressed through structured
//!   [`variant::VariantKey`]s resolved against the fixed flat name tables
//!   that form the compatibility contract with the precompiled kernel set.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod dtype;
pub mod error;
pub mod helpers;
pub mod launch;
pub mod problem;
pub mod runtime;
pub mod solver;
pub mod variant;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::device::{DeviceCapability, SolverPolicy};
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
    pub use crate::launch::LaunchSpec;
    pub use crate::problem::{ConvProblem, Direction, TensorLayout};
    pub use crate::runtime::{ConvTensors, KernelLauncher, LaunchArg};
    pub use crate::solver::{ConvSolver, SolutionPlan};
    pub use crate::variant::{ChannelMode, KernelFamily, VariantKey};
}

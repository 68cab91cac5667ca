//! Error types for convplan

use thiserror::Error;

/// Result type alias using convplan's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or running a solution plan
///
/// Unsupported or malformed problems are never reported through this type;
/// they are signalled by [`crate::solver::ConvSolver::is_applicable`]
/// returning `false`.
#[derive(Error, Debug)]
pub enum Error {
    /// `get_solution` was called for a problem the solver rejected
    #[error("solver is not applicable to the given problem")]
    NotApplicable,

    /// Kernel launch failed in the caller-supplied launcher
    #[error("launch of kernel '{kernel}' failed: {reason}")]
    Launch {
        /// Name of the kernel that failed to launch
        kernel: String,
        /// Launcher-provided failure description
        reason: String,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a launch error
    pub fn launch(kernel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Launch {
            kernel: kernel.into(),
            reason: reason.into(),
        }
    }
}

//! Workspace sizer
//!
//! The staged pipeline needs scratch device memory for its preprocessing
//! stages; the pointwise fast path needs none. The total is the exact sum
//! of three independently computed buffer sizes, laid out back to back:
//! padding buffer, permutation buffer, index buffer. Each size is a pure
//! function of problem dimensions - no device calls, no rounding surprises
//! between `workspace_size` and the offsets the invoker captures.

use crate::helpers::round_up;
use crate::problem::ConvProblem;
use crate::solver::planner::staged_ntidx;

/// Total auxiliary workspace in bytes.
///
/// Returns 0 exactly when filter size, stride, and dilation are all unit.
pub fn workspace_size(problem: &ConvProblem) -> u64 {
    if problem.is_unit_pointwise() {
        return 0;
    }
    padding_buffer_size(problem) + permute_buffer_size(problem) + index_buffer_size(problem)
}

/// Bytes for the zero-padded input copy; 0 when no padding is required.
pub(crate) fn padding_buffer_size(problem: &ConvProblem) -> u64 {
    if !problem.needs_spatial_padding() {
        return 0;
    }
    problem.n as u64
        * problem.c as u64
        * problem.padded_h() as u64
        * problem.padded_w() as u64
        * problem.dtype.size_bytes() as u64
}

/// Bytes for the batch-permuted input copy; 0 for the forward direction.
pub(crate) fn permute_buffer_size(problem: &ConvProblem) -> u64 {
    if !problem.direction.is_backward() {
        return 0;
    }
    round_up(problem.n as u64, 4)
        * problem.c as u64
        * problem.h as u64
        * problem.w as u64
        * problem.dtype.size_bytes() as u64
}

/// Bytes for the tile index table generated by the index stage.
pub(crate) fn index_buffer_size(problem: &ConvProblem) -> u64 {
    let srelo = round_up(problem.k as u64, 16) + 32;
    let ntid = staged_ntidx(problem).max(srelo);
    round_up(ntid, 64) * 4
}

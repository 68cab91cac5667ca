//! Integration tests for deferred invocation: stage order, captured
//! scalars, and tensor-address binding through a recording launcher.

mod common;

use common::{FailingLauncher, RecordingLauncher};
use convplan::prelude::*;
use convplan::solver::invoker::{
    F_EXPLICIT_NKC_STRIDES, F_FLIP_K_C, F_REVERSE_R, F_REVERSE_S,
};

fn device() -> DeviceCapability {
    DeviceCapability::new("gfx906", 60)
}

fn tensors() -> ConvTensors {
    ConvTensors {
        input: 0x1000,
        weights: 0x2000,
        output: 0x3000,
        workspace: 0x4000,
    }
}

#[test]
fn test_pointwise_invocation() {
    let solver = ConvSolver;
    let p = ConvProblem {
        n: 1,
        c: 64,
        h: 56,
        w: 56,
        k: 64,
        ..Default::default()
    };
    let plan = solver.get_solution(&p, &device()).unwrap();

    let launcher = RecordingLauncher::new();
    plan.invoke(&launcher, &tensors()).unwrap();

    let recorded = launcher.recorded();
    assert_eq!(recorded.len(), 1);
    let launch = &recorded[0];
    assert_eq!(launch.kernel_name, "suffco7x4_qm");
    assert_eq!(launch.block, [128, 1, 1]);
    assert_eq!(launch.args[0], LaunchArg::Ptr(0x1000));
    assert_eq!(launch.args[1], LaunchArg::Ptr(0x2000));
    assert_eq!(launch.args[2], LaunchArg::Ptr(0x3000));
    assert_eq!(launch.args[3], LaunchArg::U32(1)); // n
    assert_eq!(launch.args[6], LaunchArg::U32(56 * 56)); // output pixels
    assert_eq!(launch.args[8], LaunchArg::U32(F_EXPLICIT_NKC_STRIDES));
}

#[test]
fn test_staged_invocation_order_and_compute_args() {
    let solver = ConvSolver;
    let p = ConvProblem {
        n: 2,
        c: 64,
        h: 56,
        w: 56,
        k: 64,
        r: 3,
        s: 3,
        pad_h: 1,
        pad_w: 1,
        ..Default::default()
    };
    let plan = solver.get_solution(&p, &device()).unwrap();

    let launcher = RecordingLauncher::new();
    plan.invoke(&launcher, &tensors()).unwrap();

    let recorded = launcher.recorded();
    let names: Vec<&str> = recorded.iter().map(|l| l.kernel_name).collect();
    assert_eq!(names, vec!["padding2d", "genidx2d", "sfco7x4"]);

    // Compute-stage ABI: dims, compute units, flags, reserved, then the
    // three tensors and the workspace.
    let compute = recorded.last().unwrap();
    assert_eq!(compute.args[0], LaunchArg::I32(2)); // n
    assert_eq!(compute.args[1], LaunchArg::I32(64)); // c
    assert_eq!(compute.args[4], LaunchArg::I32(64)); // k
    assert_eq!(compute.args[5], LaunchArg::I32(60)); // compute units
    assert_eq!(compute.args[6], LaunchArg::I32(F_EXPLICIT_NKC_STRIDES as i32));
    assert_eq!(compute.args[8], LaunchArg::Ptr(0x1000));
    assert_eq!(compute.args[9], LaunchArg::Ptr(0x2000));
    assert_eq!(compute.args[10], LaunchArg::Ptr(0x3000));
    assert_eq!(compute.args[11], LaunchArg::Ptr(0x4000));

    // Captured strides: d_c = 56*56*4, d_n = 64*d_c, o_k = 56*56*4.
    assert_eq!(compute.args[20], LaunchArg::I32(64 * 56 * 56 * 4)); // d_n
    assert_eq!(compute.args[21], LaunchArg::I32(56 * 56 * 4)); // d_c
    assert_eq!(compute.args[22], LaunchArg::I32(3 * 3 * 4 * 64)); // f_k
    assert_eq!(compute.args[23], LaunchArg::I32(3 * 3 * 4)); // f_c
    assert_eq!(compute.args[24], LaunchArg::I32(64 * 56 * 56 * 4)); // o_n
    assert_eq!(compute.args[25], LaunchArg::I32(56 * 56 * 4)); // o_k
}

#[test]
fn test_backward_invocation_flags_and_offsets() {
    let solver = ConvSolver;
    let p = ConvProblem {
        n: 2,
        c: 64,
        h: 28,
        w: 28,
        k: 64,
        r: 3,
        s: 3,
        pad_h: 1,
        pad_w: 1,
        direction: Direction::BackwardData,
        ..Default::default()
    };
    let plan = solver.get_solution(&p, &device()).unwrap();

    let launcher = RecordingLauncher::new();
    plan.invoke(&launcher, &tensors()).unwrap();

    let recorded = launcher.recorded();
    let names: Vec<&str> = recorded.iter().map(|l| l.kernel_name).collect();
    assert_eq!(names, vec!["padding2d", "perm2d_flip", "genidx2d", "sbco7x4"]);

    // Permutation output lands after the padding buffer.
    let padding_bytes = 2u64 * 64 * 30 * 30 * 4;
    let perm = &recorded[1];
    assert_eq!(perm.args[1], LaunchArg::Ptr(0x4000 + padding_bytes));

    // Index table lands after the permutation buffer.
    let perm_bytes = 4u64 * 64 * 28 * 28 * 4; // batch rounded up to 4
    let idx = &recorded[2];
    assert_eq!(idx.args[0], LaunchArg::Ptr(0x4000 + padding_bytes + perm_bytes));

    // Backward flag word carries both filter-axis reversals and the
    // channel-role swap on top of the explicit-strides bit.
    let compute = recorded.last().unwrap();
    let expected = F_EXPLICIT_NKC_STRIDES | F_REVERSE_R | F_REVERSE_S | F_FLIP_K_C;
    assert_eq!(compute.args[6], LaunchArg::I32(expected as i32));

    // Backward filter strides swap the channel roles.
    assert_eq!(compute.args[22], LaunchArg::I32(3 * 3 * 4)); // f_k
    assert_eq!(compute.args[23], LaunchArg::I32(3 * 3 * 4 * 64)); // f_c
}

#[test]
fn test_launch_failure_stops_the_pipeline() {
    let solver = ConvSolver;
    let p = ConvProblem {
        n: 2,
        c: 64,
        h: 56,
        w: 56,
        k: 64,
        r: 3,
        s: 3,
        pad_h: 1,
        pad_w: 1,
        ..Default::default()
    };
    let plan = solver.get_solution(&p, &device()).unwrap();

    let launcher = FailingLauncher::new("genidx2d");
    let err = plan.invoke(&launcher, &tensors()).unwrap_err();
    assert!(
        matches!(&err, Error::Launch { kernel, .. } if kernel == "genidx2d"),
        "unexpected error: {err}"
    );
    // The compute stage is never issued after the index stage fails.
    assert_eq!(launcher.seen(), vec!["padding2d", "genidx2d"]);
}

#[test]
fn test_invocation_is_repeatable_with_fresh_addresses() {
    let solver = ConvSolver;
    let p = ConvProblem {
        n: 1,
        c: 64,
        h: 56,
        w: 56,
        k: 64,
        ..Default::default()
    };
    let plan = solver.get_solution(&p, &device()).unwrap();

    let launcher = RecordingLauncher::new();
    plan.invoke(&launcher, &tensors()).unwrap();
    let other = ConvTensors {
        input: 0xa000,
        weights: 0xb000,
        output: 0xc000,
        workspace: 0,
    };
    plan.invoke(&launcher, &other).unwrap();

    let recorded = launcher.recorded();
    assert_eq!(recorded.len(), 2);
    // Same kernel and geometry, different addresses only.
    assert_eq!(recorded[0].kernel_name, recorded[1].kernel_name);
    assert_eq!(recorded[0].grid, recorded[1].grid);
    assert_eq!(recorded[1].args[0], LaunchArg::Ptr(0xa000));
    assert_eq!(recorded[1].args[3..], recorded[0].args[3..]);
}

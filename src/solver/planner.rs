//! Launch planner
//!
//! Turns an applicable problem into the ordered list of kernel launches.
//! Two families exist: the single-stage pointwise fast path (unit filter,
//! stride, and dilation) and the staged general pipeline
//! (padding -> permute -> index-gen -> compute). Stage order is a data
//! dependency - later kernels consume buffers earlier ones produce - and is
//! never reordered.

use crate::device::DeviceCapability;
use crate::error::{Error, Result};
use crate::helpers::{ceil_div, round_up};
use crate::launch::{BuildOptions, LaunchSpec};
use crate::problem::ConvProblem;
use crate::variant::{ChannelMode, KernelFamily, VariantKey, POINTWISE_BLOCK, STAGED_BLOCK};

/// Role of one planned launch inside the pipeline.
///
/// The invoker uses this to choose the argument list for each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Single-stage pointwise compute
    Pointwise,
    /// Out-of-bounds zero padding of the input
    Padding,
    /// Batch permutation / filter flip for the backward direction
    PermuteFlip,
    /// Tile index-table generation
    IndexGen,
    /// Staged main compute
    Compute,
}

/// One planned launch: its role plus the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStage {
    /// Stage role
    pub kind: StageKind,
    /// Resolved launch configuration
    pub spec: LaunchSpec,
}

/// Coarse batch-size class, 0..=3.
///
/// The y-tile of every kernel variant spans the batch axis with extents
/// 16/32/64/128; the class picks the variant whose batch tile tracks the
/// batch magnitude.
pub(crate) fn batch_class(n: u32) -> u32 {
    if n <= 16 {
        0
    } else if n <= 32 {
        1
    } else if n <= 64 {
        2
    } else {
        3
    }
}

/// Tile id of the pointwise family.
#[inline]
pub(crate) fn pointwise_tile_id(problem: &ConvProblem) -> u32 {
    batch_class(problem.n)
}

/// Shift pair (x, y) of a pointwise tile id.
pub(crate) fn pointwise_shifts(id: u32) -> (u32, u32) {
    let shx = if id > 0 && id < 3 { 8 } else { 7 };
    (shx, 4 + id)
}

/// Tile id of the staged family's compute stage.
///
/// Forward: 0 selects the generic kernel for outputs too small to fill a
/// dedicated tile, otherwise the tiled variant matching the batch class.
/// Backward tile ids are shifted down by one (no generic backward kernel).
pub(crate) fn staged_tile_id(problem: &ConvProblem) -> u32 {
    let class = batch_class(problem.n);
    if problem.direction.is_backward() {
        class
    } else {
        let out_pixels = problem.out_h() as u64 * problem.out_w() as u64;
        if out_pixels < 256 {
            0
        } else {
            1 + class
        }
    }
}

/// Shift pair (x, y) of a staged tile id, from the packed nibble tables.
pub(crate) fn staged_shifts(id: u32, backward: bool) -> (u32, u32) {
    let (tx, ty): (u32, u32) = if backward {
        (0x7887, 0x7654)
    } else {
        (0x78878, 0x76545)
    };
    let shx = (tx >> (id << 2)) & 0xf;
    let shy = (ty >> (id << 2)) & 0xf;
    (shx, shy)
}

/// Block size of a staged tile id.
///
/// Backward variants reuse the block of their forward twin (tile id + 1 in
/// the forward numbering).
pub(crate) fn staged_block(id: u32, backward: bool) -> u32 {
    if backward {
        STAGED_BLOCK[id as usize + 1]
    } else {
        STAGED_BLOCK[id as usize]
    }
}

/// Padded x-axis thread count of the main compute stage.
pub(crate) fn staged_ntidx(problem: &ConvProblem) -> u64 {
    let id = staged_tile_id(problem);
    let (shx, _) = staged_shifts(id, problem.direction.is_backward());
    let out_pixels = problem.out_h() as u64 * problem.out_w() as u64;
    round_up(out_pixels, 1 << shx)
}

/// Padded x-axis thread count of the pointwise stage.
pub(crate) fn pointwise_ntidx(problem: &ConvProblem) -> u64 {
    let id = pointwise_tile_id(problem);
    let (shx, _) = pointwise_shifts(id);
    let out_pixels = problem.out_h() as u64 * problem.out_w() as u64;
    round_up(out_pixels, 1 << shx)
}

/// Build the ordered stage list for an applicable problem.
pub(crate) fn plan(problem: &ConvProblem, caps: &DeviceCapability) -> Result<Vec<PlannedStage>> {
    let kernel_file = format!("flexgemm_{}.s", caps.arch);
    let build_options = BuildOptions::new()
        .define("ROCM_METADATA_VERSION", caps.metadata_version())
        .render();

    if problem.is_unit_pointwise() {
        plan_pointwise(problem, kernel_file, build_options).map(|s| vec![s])
    } else {
        plan_staged(problem, kernel_file, build_options)
    }
}

fn resolve_kernel(key: &VariantKey) -> Result<&'static str> {
    key.kernel_name()
        .ok_or_else(|| Error::Internal(format!("no kernel variant for key {:?}", key)))
}

fn plan_pointwise(
    problem: &ConvProblem,
    kernel_file: String,
    build_options: String,
) -> Result<PlannedStage> {
    let id = pointwise_tile_id(problem);
    let (shx, shy) = pointwise_shifts(id);
    let blk = POINTWISE_BLOCK[id as usize];
    let backward = problem.direction.is_backward();

    let ntidx = pointwise_ntidx(problem);
    let gdy = ceil_div(problem.n as u64, 1 << shy) as u32;
    let gdx = (ntidx >> shx) as u32;

    let key = VariantKey {
        family: KernelFamily::Pointwise,
        tile: id,
        backward,
        mode: ChannelMode::for_channels(problem.c_per_group()),
        relu: problem.fused_relu && !backward,
    };
    let kernel_name = resolve_kernel(&key)?;

    Ok(PlannedStage {
        kind: StageKind::Pointwise,
        spec: LaunchSpec {
            block: [blk, 1, 1],
            grid: [gdy * blk, gdx, problem.group_count],
            kernel_file,
            kernel_name,
            build_options,
        },
    })
}

fn plan_staged(
    problem: &ConvProblem,
    kernel_file: String,
    build_options: String,
) -> Result<Vec<PlannedStage>> {
    let mut stages = Vec::with_capacity(4);
    let backward = problem.direction.is_backward();
    let ng = problem.group_count;
    let cpg = problem.c_per_group();

    if problem.needs_spatial_padding() {
        let padded = problem.padded_w() as u64 * problem.padded_h() as u64 * problem.c as u64;
        // Admission caps the padded volume, so the rounded extent fits u32.
        let gdx = ceil_div(padded, 256);
        stages.push(PlannedStage {
            kind: StageKind::Padding,
            spec: LaunchSpec {
                block: [256, 1, 1],
                grid: [(gdx * 256) as u32, problem.n, 1],
                kernel_file: kernel_file.clone(),
                kernel_name: "padding2d",
                build_options: build_options.clone(),
            },
        });
    }

    if backward {
        let gdx = ceil_div(round_up(problem.n as u64, 4), 64) as u32;
        stages.push(PlannedStage {
            kind: StageKind::PermuteFlip,
            spec: LaunchSpec {
                block: [64, 1, 1],
                grid: [gdx * 64, cpg, ng],
                kernel_file: kernel_file.clone(),
                kernel_name: "perm2d_flip",
                build_options: build_options.clone(),
            },
        });
    }

    {
        let srelo = round_up(problem.k as u64, 16) + 32;
        let ntid = staged_ntidx(problem).max(srelo);
        let gdx = ceil_div(ntid, 64) as u32;
        stages.push(PlannedStage {
            kind: StageKind::IndexGen,
            spec: LaunchSpec {
                block: [64, 1, 1],
                grid: [gdx * 64, 1, 1],
                kernel_file: kernel_file.clone(),
                kernel_name: "genidx2d",
                build_options: build_options.clone(),
            },
        });
    }

    {
        let id = staged_tile_id(problem);
        let (shx, shy) = staged_shifts(id, backward);
        let blk = staged_block(id, backward);
        let gdx = (staged_ntidx(problem) >> shx) as u32;
        let gdy = ceil_div(problem.n as u64, 1 << shy) as u32;

        let key = VariantKey {
            family: KernelFamily::Staged,
            tile: id,
            backward,
            mode: ChannelMode::One,
            relu: problem.fused_relu && !backward,
        };
        let kernel_name = resolve_kernel(&key)?;

        stages.push(PlannedStage {
            kind: StageKind::Compute,
            spec: LaunchSpec {
                block: [blk, 1, 1],
                grid: [gdx * blk, gdy, ng],
                kernel_file,
                kernel_name,
                build_options,
            },
        });
    }

    Ok(stages)
}

//! Constraint checker
//!
//! Pure predicate deciding whether the fixed-function kernel set can run a
//! problem at all. Checks are ordered by cost: policy and identity checks
//! first, then the tile-padding feasibility arithmetic, then the bit-width
//! budget of every dimension and derived product.
//!
//! A `false` here is the only way unsupported problems are reported; nothing
//! in this module returns errors or has side effects.

use crate::device::DeviceCapability;
use crate::helpers::{ceil_div, floor_div, round_up};
use crate::problem::{ConvProblem, TensorLayout};

/// Filter tile width of the transform-based kernels.
pub(crate) const FILTER_TILE: u64 = 2;
/// Twice the filter tile width.
pub(crate) const FILTER_TILE_X2: u64 = FILTER_TILE * 2;

/// Minimum tile count x channel product that keeps the transform kernels
/// ahead of the generic path.
const MIN_TILE_WORK: u64 = 18;

const DIM_CEILING: u64 = 1 << 16;
const PRODUCT_CEILING: u64 = 1 << 28;
const OUT_PIXEL_CEILING: u64 = 1 << 23;
/// The padding stage runs one thread per padded input element; its x-grid
/// extent must fit `u32` after rounding up to the block size.
const PADDED_VOLUME_CEILING: u64 = 1 << 31;

/// Whether the solver can handle `problem` on a device with `caps`.
pub fn is_applicable(problem: &ConvProblem, caps: &DeviceCapability) -> bool {
    if !caps.policy.fixed_function_enabled {
        return false;
    }
    if !caps.arch_supported() {
        return false;
    }
    if problem.layout != TensorLayout::Nchw {
        return false;
    }
    if problem.has_bias {
        return false;
    }
    if problem.direction.is_backward_weights() {
        return false;
    }
    if !shape_sane(problem) {
        return false;
    }

    if !problem.is_unit_pointwise() {
        // Transform family: single group, unit dilation, and equal strides
        // of at most 2 per the padded-filter rules.
        if problem.group_count != 1 {
            return false;
        }
        if (problem.dilation_h | problem.dilation_w) != 1 {
            return false;
        }
        if problem.stride_h != problem.stride_w || problem.stride_w > 2 {
            return false;
        }
        if !tiling_feasible(problem) {
            return false;
        }
        if problem.needs_spatial_padding() {
            let padded = problem.c as u64
                * problem.padded_h() as u64
                * problem.padded_w() as u64;
            if padded > PADDED_VOLUME_CEILING {
                return false;
            }
        }
    }

    if problem.direction.is_backward_data() {
        let bph = problem.backward_pad_h();
        let bpw = problem.backward_pad_w();
        if !(0..DIM_CEILING as i64).contains(&bph) || !(0..DIM_CEILING as i64).contains(&bpw) {
            return false;
        }
    }

    within_hw_limits(problem, caps.max_compute_units)
}

/// Reject degenerate descriptors before doing any arithmetic on them.
fn shape_sane(p: &ConvProblem) -> bool {
    let dims = [p.n, p.c, p.h, p.w, p.k, p.r, p.s, p.stride_h, p.stride_w];
    if dims.iter().any(|&d| d == 0) {
        return false;
    }
    if p.group_count == 0 || p.c % p.group_count != 0 || p.k % p.group_count != 0 {
        return false;
    }
    p.out_h() > 0 && p.out_w() > 0
}

/// Padded filter extent of the minor (width) axis.
///
/// At stride 1 a filter that already fits one tile pads to the tile width;
/// everything else pads to the next multiple of twice the tile width.
pub(crate) fn padded_filter_s(s: u64, stride_w: u32) -> u64 {
    if stride_w == 1 {
        if s <= FILTER_TILE {
            FILTER_TILE
        } else {
            round_up(s, FILTER_TILE_X2)
        }
    } else {
        round_up(s, FILTER_TILE_X2)
    }
}

/// Padded filter extent of the major (height) axis.
///
/// Stride 1 pads to the next tile multiple. Stride 2 pads to the
/// double-tile multiple, except when the raw extent is 1 mod double-tile,
/// which falls back to the single-tile multiple.
pub(crate) fn padded_filter_r(r: u64, stride_h: u32) -> u64 {
    if stride_h == 1 {
        round_up(r, FILTER_TILE)
    } else if r % FILTER_TILE_X2 == 1 {
        round_up(r, FILTER_TILE)
    } else {
        round_up(r, FILTER_TILE_X2)
    }
}

/// Shape feasibility of the transform family: padded filter tiles must
/// carry enough useful work, and the channel count must satisfy the
/// dtype-dependent packing divisor.
fn tiling_feasible(p: &ConvProblem) -> bool {
    let r = p.r as u64;
    let s = p.s as u64;
    let c = p.c as u64;
    let fp16 = p.dtype.is_fp16();

    let padded_s = padded_filter_s(s, p.stride_w);
    let padded_r = padded_filter_r(r, p.stride_h);

    // fp16 doubles every channel-packing requirement, which implicitly
    // forces an even channel count.
    if fp16 && c % 2 != 0 {
        return false;
    }
    if p.stride_w == 1 && s <= FILTER_TILE && c % (if fp16 { 4 } else { 2 }) != 0 {
        return false;
    }

    let is_dilated_stride_2 = p.direction.is_backward_data() && p.stride_w != 1;

    if fp16 {
        if is_dilated_stride_2 {
            if c % 4 != 0 {
                return false;
            }
            let k = ceil_div(r, FILTER_TILE_X2) + floor_div(r + FILTER_TILE + 1, FILTER_TILE_X2);
            let l = ceil_div(s, FILTER_TILE_X2);
            if c * k * l < MIN_TILE_WORK * 2 {
                return false;
            }
        }
        if padded_r * padded_s * c < FILTER_TILE * FILTER_TILE * MIN_TILE_WORK * 2 {
            return false;
        }
    } else {
        if is_dilated_stride_2 {
            if r <= 1 {
                return false;
            }
            if c % 2 != 0 {
                return false;
            }
        }
        let k = padded_r / FILTER_TILE;
        let l = padded_s / if is_dilated_stride_2 { FILTER_TILE_X2 } else { FILTER_TILE };
        if k * l * c < MIN_TILE_WORK {
            return false;
        }
    }
    true
}

/// Bit-width budget of the kernel argument encoding.
///
/// Every dimension must fit 16 bits; the listed products must fit the 28-
/// and 23-bit index budgets of the kernels' address arithmetic.
fn within_hw_limits(p: &ConvProblem, compute_units: u32) -> bool {
    let n = p.n as u64;
    let c = p.c as u64;
    let k = p.k as u64;
    let h = p.h as u64;
    let w = p.w as u64;
    let r = p.r as u64;
    let s = p.s as u64;
    let oh = p.out_h() as u64;
    let ow = p.out_w() as u64;

    let dims = [
        n,
        c,
        k,
        h,
        w,
        oh,
        ow,
        p.pad_w as u64,
        p.pad_h as u64,
        s,
        r,
        compute_units as u64,
    ];
    dims.iter().all(|&d| d < DIM_CEILING)
        && c * h * w <= PRODUCT_CEILING
        && oh * ow <= OUT_PIXEL_CEILING
        && k * oh * ow <= PRODUCT_CEILING
        && k * r * s <= PRODUCT_CEILING
        && c * r * s <= PRODUCT_CEILING
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::problem::Direction;

    fn device() -> DeviceCapability {
        DeviceCapability::new("gfx906", 60)
    }

    fn staged_base() -> ConvProblem {
        ConvProblem {
            n: 1,
            c: 64,
            h: 56,
            w: 56,
            k: 64,
            r: 3,
            s: 3,
            pad_h: 1,
            pad_w: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_padded_filter_rules() {
        // Minor axis, stride 1: fits one tile -> tile width.
        assert_eq!(padded_filter_s(1, 1), 2);
        assert_eq!(padded_filter_s(2, 1), 2);
        // Larger than the tile -> double-tile multiples.
        assert_eq!(padded_filter_s(3, 1), 4);
        assert_eq!(padded_filter_s(5, 1), 8);
        // Stride 2 always uses double-tile multiples.
        assert_eq!(padded_filter_s(1, 2), 4);
        assert_eq!(padded_filter_s(3, 2), 4);

        // Major axis, stride 1: tile multiples.
        assert_eq!(padded_filter_r(3, 1), 4);
        assert_eq!(padded_filter_r(4, 1), 4);
        // Stride 2: double-tile multiple unless raw extent is 1 mod 2*tile.
        assert_eq!(padded_filter_r(3, 2), 4);
        assert_eq!(padded_filter_r(5, 2), 6);
        assert_eq!(padded_filter_r(6, 2), 8);
    }

    #[test]
    fn test_staged_base_applies() {
        assert!(is_applicable(&staged_base(), &device()));
    }

    #[test]
    fn test_policy_disable() {
        let mut caps = device();
        caps.policy.fixed_function_enabled = false;
        assert!(!is_applicable(&staged_base(), &caps));
    }

    #[test]
    fn test_bad_arch() {
        assert!(!is_applicable(
            &staged_base(),
            &DeviceCapability::new("gfx1030", 36)
        ));
    }

    #[test]
    fn test_layout_bias_direction() {
        let mut p = staged_base();
        p.layout = TensorLayout::Nhwc;
        assert!(!is_applicable(&p, &device()));

        let mut p = staged_base();
        p.has_bias = true;
        assert!(!is_applicable(&p, &device()));

        let mut p = staged_base();
        p.direction = Direction::BackwardWeights;
        assert!(!is_applicable(&p, &device()));
    }

    #[test]
    fn test_transform_family_restrictions() {
        let mut p = staged_base();
        p.group_count = 2;
        assert!(!is_applicable(&p, &device()));

        let mut p = staged_base();
        p.dilation_w = 2;
        assert!(!is_applicable(&p, &device()));

        let mut p = staged_base();
        p.stride_h = 1;
        p.stride_w = 2;
        assert!(!is_applicable(&p, &device()));

        let mut p = staged_base();
        p.stride_h = 3;
        p.stride_w = 3;
        assert!(!is_applicable(&p, &device()));
    }

    #[test]
    fn test_too_few_channels() {
        // 3x3 stride 1 pads to 4x4 = 2x2 tiles; 2*2*c >= 18 needs c >= 5.
        let mut p = staged_base();
        p.c = 4;
        assert!(!is_applicable(&p, &device()));
        p.c = 5;
        assert!(is_applicable(&p, &device()));
    }

    #[test]
    fn test_fp16_channel_parity() {
        let mut p = staged_base();
        p.dtype = DType::F16;
        p.c = 63;
        assert!(!is_applicable(&p, &device()));
        p.c = 64;
        assert!(is_applicable(&p, &device()));
    }

    #[test]
    fn test_dilated_stride2_backward() {
        let base = ConvProblem {
            direction: Direction::BackwardData,
            stride_h: 2,
            stride_w: 2,
            r: 3,
            s: 3,
            pad_h: 1,
            pad_w: 1,
            h: 56,
            w: 56,
            k: 64,
            n: 1,
            ..Default::default()
        };

        // fp32 requires even channels and filter height above 1.
        let mut p = ConvProblem { c: 64, ..base.clone() };
        assert!(is_applicable(&p, &device()));
        p.c = 63;
        assert!(!is_applicable(&p, &device()));
        p.c = 64;
        p.r = 1;
        p.pad_h = 0;
        assert!(!is_applicable(&p, &device()));

        // fp16 requires channels divisible by 4.
        let mut q = ConvProblem {
            c: 64,
            dtype: DType::F16,
            ..base.clone()
        };
        assert!(is_applicable(&q, &device()));
        q.c = 62;
        assert!(!is_applicable(&q, &device()));
        q.c = 61;
        assert!(!is_applicable(&q, &device()));
    }

    #[test]
    fn test_padded_volume_ceiling() {
        // Every per-dimension and product budget holds (c*r*s is exactly
        // 2^28), but the padded input volume 3407 * 3407 * 1024 exceeds
        // what the padding stage's thread grid can address.
        let p = ConvProblem {
            n: 1,
            c: 1024,
            h: 1,
            w: 1,
            k: 1,
            r: 512,
            s: 512,
            pad_h: 1703,
            pad_w: 1703,
            ..Default::default()
        };
        assert!(!is_applicable(&p, &device()));
    }

    #[test]
    fn test_backward_pad_must_be_non_negative() {
        // 1x1 filter with padding makes the backward pad negative.
        let p = ConvProblem {
            c: 64,
            k: 64,
            h: 56,
            w: 56,
            pad_h: 1,
            pad_w: 1,
            direction: Direction::BackwardData,
            ..Default::default()
        };
        assert!(!is_applicable(&p, &device()));
    }

    #[test]
    fn test_compute_unit_ceiling() {
        assert!(!is_applicable(
            &staged_base(),
            &DeviceCapability::new("gfx906", 1 << 16)
        ));
        assert!(is_applicable(
            &staged_base(),
            &DeviceCapability::new("gfx906", (1 << 16) - 1)
        ));
    }

    #[test]
    fn test_degenerate_shapes() {
        let mut p = staged_base();
        p.k = 0;
        assert!(!is_applicable(&p, &device()));

        let mut p = staged_base();
        p.group_count = 3; // does not divide c = 64
        p.r = 1;
        p.s = 1;
        p.pad_h = 0;
        p.pad_w = 0;
        assert!(!is_applicable(&p, &device()));
    }
}

//! Kernel variant tables and routing
//!
//! The precompiled kernel set is addressed through two flat, ordered name
//! tables - one for the single-stage pointwise family, one for the staged
//! general family. Table order is the compatibility contract with the
//! shipped code objects: reordering an entry silently binds the wrong
//! kernel, so the tables below must never be touched.
//!
//! Routing is exposed through [`VariantKey`], a structured key over
//! (family, tile, direction, channel mode, relu) resolved by explicit
//! per-combination arithmetic rather than the historical packed-integer
//! decoding. The unit tests enumerate every combination and assert the
//! resolved indices form an exact bijection onto each table.

use std::fmt;

/// Pointwise fast-path kernel names, indexed by the variant routing index.
///
/// Layout: four tile shapes (7x4, 8x5, 8x6, 7x7), each with
/// om/dm/qm channel modes; forward entries carry a relu twin, backward
/// entries do not.
pub const POINTWISE_KERNELS: [&str; 36] = [
    "suffco7x4_om",
    "suffco7x4_om_relu",
    "suffco7x4_dm",
    "suffco7x4_dm_relu",
    "suffco7x4_qm",
    "suffco7x4_qm_relu",
    "suffco8x5_om",
    "suffco8x5_om_relu",
    "suffco8x5_dm",
    "suffco8x5_dm_relu",
    "suffco8x5_qm",
    "suffco8x5_qm_relu",
    "suffco8x6_om",
    "suffco8x6_om_relu",
    "suffco8x6_dm",
    "suffco8x6_dm_relu",
    "suffco8x6_qm",
    "suffco8x6_qm_relu",
    "suffco7x7_om",
    "suffco7x7_om_relu",
    "suffco7x7_dm",
    "suffco7x7_dm_relu",
    "suffco7x7_qm",
    "suffco7x7_qm_relu",
    "sufbco7x4_om",
    "sufbco7x4_dm",
    "sufbco7x4_qm",
    "sufbco8x5_om",
    "sufbco8x5_dm",
    "sufbco8x5_qm",
    "sufbco8x6_om",
    "sufbco8x6_dm",
    "sufbco8x6_qm",
    "sufbco7x7_om",
    "sufbco7x7_dm",
    "sufbco7x7_qm",
];

/// Staged-family main compute kernel names.
///
/// Layout: forward generic (`sfco`) plus four tiled forward variants, each
/// with a relu twin, then the four backward variants without relu.
pub const STAGED_KERNELS: [&str; 14] = [
    "sfco",
    "sfco_relu",
    "sfco7x4",
    "sfco7x4_relu",
    "sfco8x5",
    "sfco8x5_relu",
    "sfco8x6",
    "sfco8x6_relu",
    "sfco7x7",
    "sfco7x7_relu",
    "sbco7x4",
    "sbco8x5",
    "sbco8x6",
    "sbco7x7",
];

/// Block sizes for the pointwise family, indexed by tile id.
pub const POINTWISE_BLOCK: [u32; 4] = [128, 256, 256, 256];

/// Block sizes for the staged family, indexed by forward tile id
/// (0 = generic, 1..=4 = tiled variants).
pub const STAGED_BLOCK: [u32; 5] = [256, 128, 256, 256, 256];

/// Number of tile shapes in the pointwise family.
pub const POINTWISE_TILE_COUNT: u32 = 4;

/// Number of forward tile shapes in the staged family (including generic).
pub const STAGED_FWD_TILE_COUNT: u32 = 5;

/// Number of backward tile shapes in the staged family.
pub const STAGED_BWD_TILE_COUNT: u32 = 4;

/// Which of the two algorithm families a variant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelFamily {
    /// Single-stage fast path for unit filter/stride/dilation
    Pointwise,
    /// Staged pipeline (padding / permute / index-gen / compute)
    Staged,
}

/// Channel vectorization mode of a pointwise kernel.
///
/// Selects how many input channels one lane consumes per step; derived from
/// channel divisibility at planning time. Staged kernels have a single mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// One channel per lane ("om")
    One,
    /// Two channels per lane ("dm")
    Two,
    /// Four channels per lane ("qm")
    Four,
}

impl ChannelMode {
    /// Mode ordinal used by the table layout.
    #[inline]
    pub fn index(&self) -> u32 {
        match self {
            ChannelMode::One => 0,
            ChannelMode::Two => 1,
            ChannelMode::Four => 2,
        }
    }

    /// Widest mode whose channel divisibility requirement `c` satisfies.
    pub fn for_channels(c: u32) -> Self {
        if c % 4 == 0 {
            ChannelMode::Four
        } else if c % 2 == 0 {
            ChannelMode::Two
        } else {
            ChannelMode::One
        }
    }
}

/// Structured key selecting one precompiled kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    /// Algorithm family
    pub family: KernelFamily,
    /// Tile id within the family (see the per-family tile counts)
    pub tile: u32,
    /// Backward (true) vs forward (false) kernel half of the table
    pub backward: bool,
    /// Channel vectorization mode (pointwise family only)
    pub mode: ChannelMode,
    /// Fused relu variant
    pub relu: bool,
}

impl VariantKey {
    /// Variant routing index into the family's flat table.
    ///
    /// Returns `None` for combinations with no precompiled kernel:
    /// out-of-range tile ids, relu on any backward variant, and non-unit
    /// channel modes in the staged family.
    pub fn table_index(&self) -> Option<usize> {
        match self.family {
            KernelFamily::Pointwise => {
                if self.tile >= POINTWISE_TILE_COUNT {
                    return None;
                }
                let tile = self.tile as usize;
                let mode = self.mode.index() as usize;
                if self.backward {
                    if self.relu {
                        return None;
                    }
                    Some(24 + 3 * tile + mode)
                } else {
                    Some(6 * tile + 2 * mode + usize::from(self.relu))
                }
            }
            KernelFamily::Staged => {
                if self.mode != ChannelMode::One {
                    return None;
                }
                if self.backward {
                    if self.relu || self.tile >= STAGED_BWD_TILE_COUNT {
                        return None;
                    }
                    Some(10 + self.tile as usize)
                } else {
                    if self.tile >= STAGED_FWD_TILE_COUNT {
                        return None;
                    }
                    Some(2 * self.tile as usize + usize::from(self.relu))
                }
            }
        }
    }

    /// Kernel entry-point name for this variant, if one exists.
    pub fn kernel_name(&self) -> Option<&'static str> {
        let idx = self.table_index()?;
        match self.family {
            KernelFamily::Pointwise => POINTWISE_KERNELS.get(idx).copied(),
            KernelFamily::Staged => STAGED_KERNELS.get(idx).copied(),
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kernel_name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "<undefined variant>"),
        }
    }
}

/// Every defined variant key, in table order per family.
///
/// Used by the verification tests to prove the structured routing is an
/// exact bijection onto the flat tables.
pub fn enumerate_defined_variants() -> Vec<VariantKey> {
    let modes = [ChannelMode::One, ChannelMode::Two, ChannelMode::Four];
    let mut keys = Vec::new();
    for tile in 0..POINTWISE_TILE_COUNT {
        for mode in modes {
            for relu in [false, true] {
                keys.push(VariantKey {
                    family: KernelFamily::Pointwise,
                    tile,
                    backward: false,
                    mode,
                    relu,
                });
            }
        }
    }
    for tile in 0..POINTWISE_TILE_COUNT {
        for mode in modes {
            keys.push(VariantKey {
                family: KernelFamily::Pointwise,
                tile,
                backward: true,
                mode,
                relu: false,
            });
        }
    }
    for tile in 0..STAGED_FWD_TILE_COUNT {
        for relu in [false, true] {
            keys.push(VariantKey {
                family: KernelFamily::Staged,
                tile,
                backward: false,
                mode: ChannelMode::One,
                relu,
            });
        }
    }
    for tile in 0..STAGED_BWD_TILE_COUNT {
        keys.push(VariantKey {
            family: KernelFamily::Staged,
            tile,
            backward: true,
            mode: ChannelMode::One,
            relu: false,
        });
    }
    keys
}

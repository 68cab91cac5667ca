//! Kernel launch configuration
//!
//! A [`LaunchSpec`] is one fully-resolved kernel launch: block and grid
//! extents, the source artifact the kernel lives in, the kernel entry name,
//! and the rendered build-option string. The solver emits an ordered list of
//! these; the external runtime resolves the names to loadable kernels and
//! issues them.

use std::fmt::Write as _;

/// Upper bound on threads per block accepted by the target hardware.
pub const MAX_BLOCK_THREADS: u32 = 1024;

/// One kernel launch configuration.
///
/// Invariants (checked by [`LaunchSpec::is_well_formed`]):
/// - the block thread count fits [`MAX_BLOCK_THREADS`];
/// - every grid extent is an integer multiple of the matching block extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Work-group (block) extents, x/y/z
    pub block: [u32; 3],
    /// Total work-item (grid) extents, x/y/z
    pub grid: [u32; 3],
    /// Source artifact the kernel is loaded from (e.g. "flexgemm_gfx906.s")
    pub kernel_file: String,
    /// Kernel entry-point name
    pub kernel_name: &'static str,
    /// Rendered compiler defines for the kernel build
    pub build_options: String,
}

impl LaunchSpec {
    /// Check the hardware-limit and tiling invariants.
    pub fn is_well_formed(&self) -> bool {
        let threads = self.block.iter().copied().map(u64::from).product::<u64>();
        if threads == 0 || threads > MAX_BLOCK_THREADS as u64 {
            return false;
        }
        self.grid
            .iter()
            .zip(self.block.iter())
            .all(|(g, b)| *b > 0 && *g > 0 && g % b == 0)
    }
}

/// Compiler-define renderer for kernel build options.
///
/// Renders assembler defsym flags for the precompiled kernel set; the
/// solver only ever emits integer defines.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    defines: Vec<(&'static str, u32)>,
}

impl BuildOptions {
    /// Empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an integer define.
    pub fn define(mut self, name: &'static str, value: u32) -> Self {
        self.defines.push((name, value));
        self
    }

    /// Render as a single `-Wa,-defsym,NAME=VALUE ...` option string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.defines {
            if !out.is_empty() {
                out.push(' ');
            }
            // Formatting into a String cannot fail.
            let _ = write!(out, "-Wa,-defsym,{}={}", name, value);
        }
        out
    }
}

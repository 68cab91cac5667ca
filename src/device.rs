//! Device identity and injected solver policy
//!
//! [`DeviceCapability`] is everything the solver is allowed to know about the
//! target GPU: the architecture name, the compute-unit count (which also
//! participates in the bit-width checks), the code-object metadata revision,
//! and the embedder-supplied [`SolverPolicy`].
//!
//! Feature disabling is process-wide configuration owned by the embedder; it
//! is injected here as a plain value rather than read from the environment,
//! so planning stays a pure function of its inputs.

/// Architectures the precompiled kernel set ships code objects for.
pub const SUPPORTED_ARCHS: [&str; 2] = ["gfx900", "gfx906"];

/// Embedder-controlled solver toggles.
///
/// The default enables everything; an embedder that wants to force the
/// fixed-function path off (for debugging or benchmarking) passes a policy
/// with the flag cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverPolicy {
    /// Master enable for the fixed-function solver
    pub fixed_function_enabled: bool,
}

impl Default for SolverPolicy {
    fn default() -> Self {
        Self {
            fixed_function_enabled: true,
        }
    }
}

/// Identity and capability of the device the plan targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapability {
    /// Architecture name as reported by the runtime (e.g. "gfx906")
    pub arch: String,
    /// Number of compute units on the device
    pub max_compute_units: u32,
    /// Whether the device uses the V3 code-object metadata format
    pub uses_v3_metadata: bool,
    /// Injected solver policy
    pub policy: SolverPolicy,
}

impl DeviceCapability {
    /// Capability for a named architecture with the default policy.
    pub fn new(arch: impl Into<String>, max_compute_units: u32) -> Self {
        Self {
            arch: arch.into(),
            max_compute_units,
            uses_v3_metadata: true,
            policy: SolverPolicy::default(),
        }
    }

    /// Whether the architecture is on the kernel set's allow-list.
    pub fn arch_supported(&self) -> bool {
        SUPPORTED_ARCHS.iter().any(|a| *a == self.arch)
    }

    /// Metadata revision number rendered into the kernel build options.
    #[inline]
    pub fn metadata_version(&self) -> u32 {
        if self.uses_v3_metadata {
            5
        } else {
            4
        }
    }
}

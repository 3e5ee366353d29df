//! Kernel source synthesis and launch configuration
//!
//! The synthesized source is the only externally visible format. Every
//! dialect exposes the same entry point and argument layout:
//!
//! | index | argument  | kind                         |
//! |-------|-----------|------------------------------|
//! | 0     | `ctr`     | u32 buffer, 2 words/block, read  |
//! | 1     | `key`     | u32 buffer, first 2 words, read  |
//! | 2     | `out`     | u32 buffer, 2 words/block, write |
//! | 3     | `offset`  | u32 scalar, first block      |
//! | 4     | `count`   | u32 scalar, number of blocks |
//! | 5     | `rounds`  | u32 scalar, 0..=32           |
//!
//! Work item `gid` with `gid < count` writes
//! `out[offset + gid] = threefry2x32(ctr[offset + gid], key, rounds)`.

mod opencl;
mod wgsl;

pub use opencl::opencl_source;
pub use wgsl::wgsl_source;

/// Kernel entry point name, stable across builds
pub const ENTRY_POINT: &str = "generate_rng";

/// Program cache key for the Threefry-2x32 kernel
pub const CACHE_KEY: &str = "threefry_engine_32x2";

/// Default local work size
pub const WORKGROUP_SIZE: u32 = 256;

/// Number of arguments the entry point takes
pub const NUM_ARGS: u32 = 6;

/// Argument indices of the entry point
pub mod arg {
    /// Counter buffer
    pub const COUNTERS: u32 = 0;
    /// Key buffer
    pub const KEY: u32 = 1;
    /// Output buffer
    pub const OUTPUT: u32 = 2;
    /// First block to process
    pub const OFFSET: u32 = 3;
    /// Number of blocks to process
    pub const COUNT: u32 = 4;
    /// Round count
    pub const ROUNDS: u32 = 5;
}

/// Source language accepted by a backend's program builder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelDialect {
    /// OpenCL C
    OpenCl,
    /// WebGPU Shading Language
    Wgsl,
}

/// Rotation table as a comma-separated list of `u32` literals
fn rotation_literals() -> String {
    crate::cipher::THREEFRY2X32_ROTATIONS
        .iter()
        .map(|r| format!("{}u", r))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Synthesize the Threefry-2x32 kernel source for `dialect`
pub fn threefry_source(dialect: KernelDialect) -> String {
    match dialect {
        KernelDialect::OpenCl => opencl_source(),
        KernelDialect::Wgsl => wgsl_source(WORKGROUP_SIZE),
    }
}

// ============================================================================
// Launch Configuration
// ============================================================================

/// One-dimensional launch configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Total work items (a multiple of `local_size`)
    pub global_size: u32,
    /// Work items per group
    pub local_size: u32,
}

impl LaunchConfig {
    /// Cover `count` work items with groups of `local_size`
    #[inline]
    pub fn for_count(count: u32, local_size: u32) -> Self {
        let local_size = local_size.max(1);
        let groups = count.div_ceil(local_size);
        Self {
            global_size: groups.saturating_mul(local_size),
            local_size,
        }
    }

    /// Number of work groups
    #[inline]
    pub fn group_count(&self) -> u32 {
        self.global_size / self.local_size
    }
}

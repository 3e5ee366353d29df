//! # threefry-engine
//!
//! **Counter-based Threefry-2x32 random number generation on compute devices.**
//!
//! A Threefry generator is a keyed bijection: block `i` of the stream is
//! `threefry(counter_i, key)`, with no state carried between blocks. That
//! makes it embarrassingly parallel. The engine synthesizes the mixing
//! kernel for a backend, builds it once per device context, and dispatches
//! it over buffers of counters.
//!
//! ## Layers
//!
//! - [`cipher`]: the pure mixing function (2x32 and 2x64), the reference
//!   vectors and a host-side [`ThreefryRng`](cipher::ThreefryRng) stream
//! - [`kernel`]: kernel source synthesis and launch geometry
//! - [`runtime`]: the backend abstraction and the per-context program cache
//! - [`engine`]: lazy build, cache sharing, dispatch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use threefry_engine::prelude::*;
//!
//! let ctx = CpuContext::new();
//! let queue = ctx.create_queue();
//! let engine = ThreefryEngine::<CpuBackend>::new(&ctx)?;
//!
//! let counters = ctx.buffer_from_slice(&[0, 0, 1, 0, 2, 0]);
//! let key = ctx.buffer_from_slice(&[0x1234, 0x5678]);
//! let out = ctx.create_buffer(6);
//!
//! engine.generate(&queue, &counters, &key, &out, 3)?;
//! queue.finish()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cpu` (default): host reference backend
//! - `rayon` (default): multi-threaded host kernels
//! - `wgpu`: cross-platform GPU via WebGPU

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cipher;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cipher::{Rounds, ThreefryRng, threefry2x32, threefry2x64};
    pub use crate::engine::{EngineConfig, GenerateArgs, ThreefryEngine};
    pub use crate::error::{Error, Result};
    pub use crate::runtime::{
        Backend, CommandQueue, ComputeContext, ContextId, DeviceBuffer, ProgramCache,
    };

    #[cfg(feature = "cpu")]
    pub use crate::runtime::cpu::{CpuBackend, CpuBuffer, CpuContext, CpuQueue};

    #[cfg(feature = "wgpu")]
    pub use crate::runtime::wgpu::{WgpuBackend, WgpuBuffer, WgpuContext, WgpuQueue};
}

/// Default backend based on enabled features
///
/// - With `wgpu` feature: `WgpuBackend`
/// - Otherwise: `CpuBackend`
#[cfg(feature = "wgpu")]
pub type DefaultBackend = runtime::wgpu::WgpuBackend;

/// Default backend based on enabled features
#[cfg(all(feature = "cpu", not(feature = "wgpu")))]
pub type DefaultBackend = runtime::cpu::CpuBackend;

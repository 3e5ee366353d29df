//! Device-compute collaborators
//!
//! The engine consumes four capabilities from a compute backend and does not
//! re-specify them: create a queue-bound context, compile source into a
//! program, extract a kernel from a program, enqueue a kernel over a 1D
//! index range.
//!
//! # Architecture
//!
//! ```text
//! Backend (compute API identity)
//! ├── Context  (device/execution domain, owns the ProgramCache)
//! ├── Queue    (bound to one context, FIFO)
//! ├── Program  (compiled artifact, shared through Arc)
//! ├── Kernel   (entry point + positional arguments)
//! └── Buffer   (device-resident u32 words)
//! ```

mod cache;

#[cfg(feature = "cpu")]
pub mod cpu;

#[cfg(feature = "wgpu")]
pub mod wgpu;

pub use cache::ProgramCache;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::kernel::{KernelDialect, LaunchConfig};

// ============================================================================
// Context identity
// ============================================================================

/// Identity of a device context, used to key caches and to detect mismatches
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(u64);

/// Counter for generating unique context IDs
static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ContextId {
    /// Allocate a fresh process-unique id
    pub fn next() -> Self {
        Self(CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// A device/execution domain
pub trait ComputeContext: Clone + Send + Sync + 'static {
    /// Unique identifier for this context
    fn id(&self) -> ContextId;

    /// Check if two handles refer to the same context
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// An execution queue bound to exactly one context
pub trait CommandQueue: Send + Sync {
    /// Context type this queue is bound to
    type Context: ComputeContext;

    /// The context this queue submits to
    fn context(&self) -> &Self::Context;

    /// Block until every enqueued command has completed
    fn finish(&self) -> Result<()>;
}

/// Device-resident memory of a known number of `u32` words
///
/// Handles are cheap to clone and refer to the same memory.
pub trait DeviceBuffer: Clone + Send + Sync + 'static {
    /// Length in `u32` words
    fn len(&self) -> usize;

    /// True if the buffer holds no words
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Context the buffer was allocated in
    fn context_id(&self) -> ContextId;
}

/// Positional kernel argument
#[derive(Debug)]
pub enum KernelArg<'a, B> {
    /// A device buffer
    Buffer(&'a B),
    /// A 32-bit scalar
    U32(u32),
}

/// A kernel extracted from a compiled program
pub trait KernelObject: Send {
    /// Buffer type accepted as an argument
    type Buffer: DeviceBuffer;

    /// Entry-point name this kernel was created from
    fn entry_point(&self) -> &str;

    /// Bind argument `index`
    ///
    /// # Errors
    ///
    /// Returns `ArgumentError` if the index or argument kind does not match
    /// the entry point's signature.
    fn set_arg(&mut self, index: u32, arg: KernelArg<'_, Self::Buffer>) -> Result<()>;
}

/// A compute API: the four capabilities the engine consumes
///
/// Uses static dispatch via generics, like the engine itself.
pub trait Backend: Send + Sync + 'static {
    /// Device context
    type Context: ComputeContext;
    /// Execution queue
    type Queue: CommandQueue<Context = Self::Context>;
    /// Compiled program, shared through `Arc`
    type Program: Send + Sync + 'static;
    /// Kernel object
    type Kernel: KernelObject<Buffer = Self::Buffer>;
    /// Device buffer
    type Buffer: DeviceBuffer;

    /// Source language this backend compiles
    const DIALECT: KernelDialect;

    /// Human-readable name of this backend
    fn name() -> &'static str;

    /// The program cache owned by `context`
    fn program_cache(context: &Self::Context) -> &ProgramCache<Self::Program>;

    /// Compile `source` for `context`
    ///
    /// # Errors
    ///
    /// Returns `BuildFailure` with the compiler diagnostic if the source is
    /// rejected.
    fn build_program(context: &Self::Context, source: &str) -> Result<Self::Program>;

    /// Extract the kernel named `entry_point`
    fn create_kernel(program: &Arc<Self::Program>, entry_point: &str) -> Result<Self::Kernel>;

    /// Enqueue `kernel` over a 1D range; returns once the work is enqueued
    fn enqueue_1d(queue: &Self::Queue, kernel: &Self::Kernel, config: LaunchConfig) -> Result<()>;
}

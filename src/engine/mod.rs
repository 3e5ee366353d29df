//! Threefry engine: cached kernel build and dispatch
//!
//! Constructing an engine looks up the context's program cache under
//! [`CACHE_KEY`]. On a miss the Threefry-2x32 kernel source is synthesized
//! for the backend's dialect, built, and committed; on a hit the cached
//! program is reused. Either way the engine ends up holding an `Arc` to the
//! one program cached for that context, so every engine (and every clone of
//! an engine) on the context dispatches from the same compiled artifact.
//!
//! ```text
//! construct ──cache hit──────────────────────► Ready
//!     └─────cache miss──► Building ──ok──────► Ready
//!                             └────err──────► BuildFailure (no engine)
//! ```

mod config;

pub use config::EngineConfig;

use std::fmt;
use std::sync::Arc;

use crate::cipher::Rounds;
use crate::error::{Error, Result};
use crate::kernel::{CACHE_KEY, ENTRY_POINT, LaunchConfig, arg, threefry_source};
use crate::runtime::{
    Backend, CommandQueue, ComputeContext, ContextId, DeviceBuffer, KernelArg, KernelObject,
};

/// Buffers bound for one dispatch
///
/// `counters` and `output` hold two words per block; `key` holds the key in
/// its first two words.
pub struct GenerateArgs<'a, B: Backend> {
    /// Counter blocks, read
    pub counters: &'a B::Buffer,
    /// Key words, read
    pub key: &'a B::Buffer,
    /// Output blocks, written
    pub output: &'a B::Buffer,
}

impl<B: Backend> Clone for GenerateArgs<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for GenerateArgs<'_, B> {}

/// Threefry-2x32 generator bound to one device context
///
/// Cloning is shallow: the clone shares the compiled program.
pub struct ThreefryEngine<B: Backend> {
    context: B::Context,
    program: Arc<B::Program>,
    config: EngineConfig,
}

impl<B: Backend> Clone for ThreefryEngine<B> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            program: self.program.clone(),
            config: self.config,
        }
    }
}

impl<B: Backend> fmt::Debug for ThreefryEngine<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreefryEngine")
            .field("backend", &B::name())
            .field("context", &self.context.id())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> ThreefryEngine<B> {
    /// Create an engine with the default configuration
    ///
    /// # Errors
    ///
    /// Returns `BuildFailure` if the kernel has to be built and the device
    /// toolchain rejects it. Nothing is cached in that case.
    pub fn new(context: &B::Context) -> Result<Self> {
        Self::with_config(context, EngineConfig::default())
    }

    /// Create an engine against the context of `queue`
    pub fn from_queue(queue: &B::Queue) -> Result<Self> {
        Self::new(queue.context())
    }

    /// Create an engine with an explicit configuration
    pub fn with_config(context: &B::Context, config: EngineConfig) -> Result<Self> {
        let program = load_program::<B>(context)?;
        Ok(Self {
            context: context.clone(),
            program,
            config,
        })
    }

    /// Context the engine is bound to
    pub fn context(&self) -> &B::Context {
        &self.context
    }

    /// The shared compiled program
    pub fn program(&self) -> &Arc<B::Program> {
        &self.program
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Round count used for dispatches
    pub fn rounds(&self) -> Rounds {
        self.config.rounds
    }

    /// Mix blocks `[0, count)` of `counters` into `output`
    ///
    /// Returns once the work is enqueued; it completes in queue order.
    ///
    /// # Errors
    ///
    /// - `ContextMismatch` if the queue or a buffer belongs to another context
    /// - `ArgumentError` if a buffer is too small for `count` blocks
    ///
    /// No work is enqueued when an error is returned. A `count` of zero
    /// enqueues nothing once the contexts are checked.
    pub fn generate(
        &self,
        queue: &B::Queue,
        counters: &B::Buffer,
        key: &B::Buffer,
        output: &B::Buffer,
        count: usize,
    ) -> Result<()> {
        let args = GenerateArgs {
            counters,
            key,
            output,
        };
        self.generate_range(queue, args, 0, count)
    }

    /// Mix blocks `[offset, offset + count)`
    ///
    /// Lets a caller partition one large request across several dispatches.
    pub fn generate_range(
        &self,
        queue: &B::Queue,
        args: GenerateArgs<'_, B>,
        offset: usize,
        count: usize,
    ) -> Result<()> {
        self.check_context(queue.context().id())?;
        for buffer in [args.counters, args.key, args.output] {
            self.check_context(buffer.context_id())?;
        }
        if count == 0 {
            return Ok(());
        }

        let end = offset
            .checked_add(count)
            .filter(|&end| end <= u32::MAX as usize)
            .ok_or_else(|| {
                Error::argument(
                    "count",
                    format!("range {}+{} exceeds the 32-bit index space", offset, count),
                )
            })?;

        check_blocks("counters", args.counters, end)?;
        check_blocks("output", args.output, end)?;
        if args.key.len() < 2 {
            return Err(Error::argument(
                "key",
                format!("key buffer holds {} words, 2 required", args.key.len()),
            ));
        }

        let mut kernel = B::create_kernel(&self.program, ENTRY_POINT)?;
        kernel.set_arg(arg::COUNTERS, KernelArg::Buffer(args.counters))?;
        kernel.set_arg(arg::KEY, KernelArg::Buffer(args.key))?;
        kernel.set_arg(arg::OUTPUT, KernelArg::Buffer(args.output))?;
        kernel.set_arg(arg::OFFSET, KernelArg::U32(offset as u32))?;
        kernel.set_arg(arg::COUNT, KernelArg::U32(count as u32))?;
        kernel.set_arg(arg::ROUNDS, KernelArg::U32(self.config.rounds.get()))?;

        let launch = LaunchConfig::for_count(count as u32, self.config.local_size);
        tracing::trace!(
            backend = B::name(),
            context = %self.context.id(),
            offset,
            count,
            global_size = launch.global_size,
            local_size = launch.local_size,
            "enqueue generate_rng"
        );
        B::enqueue_1d(queue, &kernel, launch)
    }

    fn check_context(&self, got: ContextId) -> Result<()> {
        let expected = self.context.id();
        if got == expected {
            Ok(())
        } else {
            Err(Error::context_mismatch(expected, got))
        }
    }
}

/// Fetch the Threefry program from the context's cache, building on a miss
fn load_program<B: Backend>(context: &B::Context) -> Result<Arc<B::Program>> {
    B::program_cache(context).get_or_build(CACHE_KEY, || {
        let source = threefry_source(B::DIALECT);
        tracing::debug!(
            backend = B::name(),
            context = %context.id(),
            dialect = ?B::DIALECT,
            bytes = source.len(),
            "building threefry kernel"
        );
        B::build_program(context, &source).inspect_err(|e| {
            tracing::warn!(backend = B::name(), context = %context.id(), "kernel build failed: {e}");
        })
    })
}

fn check_blocks<Buf: DeviceBuffer>(name: &'static str, buffer: &Buf, blocks: usize) -> Result<()> {
    let have = buffer.len() / 2;
    if have < blocks {
        return Err(Error::argument(
            name,
            format!("buffer holds {} blocks, {} required", have, blocks),
        ));
    }
    Ok(())
}

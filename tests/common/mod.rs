//! Common test utilities
//!
//! `MockBackend` records every build and enqueue per context so tests can
//! observe cache behavior without a device.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use threefry_engine::error::{Error, Result};
use threefry_engine::kernel::{KernelDialect, LaunchConfig, NUM_ARGS};
use threefry_engine::runtime::{
    Backend, CommandQueue, ComputeContext, ContextId, DeviceBuffer, KernelArg, KernelObject,
    ProgramCache,
};

/// Diagnostic returned by a mock build set to fail
pub const MOCK_DIAGNOSTIC: &str = "<source>:1:1: error: mock toolchain rejected source";

/// One recorded dispatch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Launch {
    pub config: LaunchConfig,
    pub offset: u32,
    pub count: u32,
    pub rounds: u32,
}

struct MockInner {
    id: ContextId,
    cache: ProgramCache<MockProgram>,
    builds: AtomicUsize,
    fail_builds: Mutex<bool>,
    build_delay: Mutex<Option<Duration>>,
    launches: Mutex<Vec<Launch>>,
    launched_programs: Mutex<Vec<Arc<MockProgram>>>,
}

#[derive(Clone)]
pub struct MockContext {
    inner: Arc<MockInner>,
}

impl MockContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockInner {
                id: ContextId::next(),
                cache: ProgramCache::new(),
                builds: AtomicUsize::new(0),
                fail_builds: Mutex::new(false),
                build_delay: Mutex::new(None),
                launches: Mutex::new(Vec::new()),
                launched_programs: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn queue(&self) -> MockQueue {
        MockQueue {
            context: self.clone(),
        }
    }

    pub fn buffer(&self, words: usize) -> MockBuffer {
        MockBuffer {
            context: self.inner.id,
            len: words,
        }
    }

    pub fn cache(&self) -> &ProgramCache<MockProgram> {
        &self.inner.cache
    }

    pub fn builds(&self) -> usize {
        self.inner.builds.load(Ordering::SeqCst)
    }

    pub fn enqueues(&self) -> usize {
        self.inner.launches.lock().len()
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.inner.launches.lock().clone()
    }

    /// Programs held by the kernels of each launch, in order
    pub fn launched_programs(&self) -> Vec<Arc<MockProgram>> {
        self.inner.launched_programs.lock().clone()
    }

    pub fn set_fail_builds(&self, fail: bool) {
        *self.inner.fail_builds.lock() = fail;
    }

    pub fn set_build_delay(&self, delay: Duration) {
        *self.inner.build_delay.lock() = Some(delay);
    }
}

impl ComputeContext for MockContext {
    fn id(&self) -> ContextId {
        self.inner.id
    }
}

pub struct MockQueue {
    context: MockContext,
}

impl CommandQueue for MockQueue {
    type Context = MockContext;

    fn context(&self) -> &MockContext {
        &self.context
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MockBuffer {
    context: ContextId,
    len: usize,
}

impl DeviceBuffer for MockBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn context_id(&self) -> ContextId {
        self.context
    }
}

#[derive(Debug)]
pub struct MockProgram {
    pub context: ContextId,
    pub source: String,
}

pub struct MockKernel {
    program: Arc<MockProgram>,
    scalars: [Option<u32>; 3],
    buffers: [bool; 3],
}

impl KernelObject for MockKernel {
    type Buffer = MockBuffer;

    fn entry_point(&self) -> &str {
        "generate_rng"
    }

    fn set_arg(&mut self, index: u32, arg: KernelArg<'_, MockBuffer>) -> Result<()> {
        match (index, arg) {
            (0..=2, KernelArg::Buffer(b)) => {
                if b.context_id() != self.program.context {
                    return Err(Error::context_mismatch(self.program.context, b.context_id()));
                }
                self.buffers[index as usize] = true;
            }
            (3..NUM_ARGS, KernelArg::U32(v)) => self.scalars[index as usize - 3] = Some(v),
            _ => return Err(Error::argument("arg", format!("bad argument {}", index))),
        }
        Ok(())
    }
}

/// Backend with no device: builds and dispatches are only recorded
pub struct MockBackend;

impl Backend for MockBackend {
    type Context = MockContext;
    type Queue = MockQueue;
    type Program = MockProgram;
    type Kernel = MockKernel;
    type Buffer = MockBuffer;

    const DIALECT: KernelDialect = KernelDialect::OpenCl;

    fn name() -> &'static str {
        "mock"
    }

    fn program_cache(context: &MockContext) -> &ProgramCache<MockProgram> {
        &context.inner.cache
    }

    fn build_program(context: &MockContext, source: &str) -> Result<MockProgram> {
        context.inner.builds.fetch_add(1, Ordering::SeqCst);
        let delay = *context.inner.build_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if *context.inner.fail_builds.lock() {
            return Err(Error::build_failure(MOCK_DIAGNOSTIC));
        }
        Ok(MockProgram {
            context: context.id(),
            source: source.to_string(),
        })
    }

    fn create_kernel(program: &Arc<MockProgram>, entry_point: &str) -> Result<MockKernel> {
        if !program.source.contains(entry_point) {
            return Err(Error::Backend(format!("no kernel '{}'", entry_point)));
        }
        Ok(MockKernel {
            program: program.clone(),
            scalars: [None; 3],
            buffers: [false; 3],
        })
    }

    fn enqueue_1d(queue: &MockQueue, kernel: &MockKernel, config: LaunchConfig) -> Result<()> {
        let unbound = || Error::argument("kernel", "unbound argument");
        if !kernel.buffers.iter().all(|&b| b) {
            return Err(unbound());
        }
        let [Some(offset), Some(count), Some(rounds)] = kernel.scalars else {
            return Err(unbound());
        };
        queue.context.inner.launches.lock().push(Launch {
            config,
            offset,
            count,
            rounds,
        });
        queue
            .context
            .inner
            .launched_programs
            .lock()
            .push(kernel.program.clone());
        Ok(())
    }
}

/// Route engine logs to the test harness output; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Interleave block indices `i` as counters `(i, 0)`
pub fn sequential_counters(blocks: u32) -> Vec<u32> {
    (0..blocks).flat_map(|i| [i, 0]).collect()
}

/// Pack an output block with word 1 in the high half
pub fn packed(words: &[u32], block: usize) -> u64 {
    ((words[2 * block + 1] as u64) << 32) | words[2 * block] as u64
}

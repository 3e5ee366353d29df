//! CPU backend
//!
//! A host reference device implementing the same kernel contract as the
//! GPU backends. Program builds accept the OpenCL dialect: the source is
//! checked and its `__kernel` entry points are resolved to native host
//! kernels, which call the cipher core directly.
//!
//! Queues execute on a dedicated worker thread in FIFO order, so `enqueue`
//! returns before the work has run, as on a real device. Call
//! [`CpuQueue::finish`](crate::runtime::CommandQueue::finish) before
//! reading results.

mod buffer;
mod context;
mod kernels;
mod program;
mod queue;

pub use buffer::CpuBuffer;
pub use context::CpuContext;
pub use program::{CpuKernel, CpuProgram};
pub use queue::CpuQueue;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::kernel::{KernelDialect, LaunchConfig};
use crate::runtime::{Backend, CommandQueue, ComputeContext, ProgramCache};

/// Host reference backend
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    type Context = CpuContext;
    type Queue = CpuQueue;
    type Program = CpuProgram;
    type Kernel = CpuKernel;
    type Buffer = CpuBuffer;

    const DIALECT: KernelDialect = KernelDialect::OpenCl;

    fn name() -> &'static str {
        "cpu"
    }

    fn program_cache(context: &CpuContext) -> &ProgramCache<CpuProgram> {
        context.program_cache()
    }

    fn build_program(context: &CpuContext, source: &str) -> Result<CpuProgram> {
        CpuProgram::build(context, source)
    }

    fn create_kernel(program: &Arc<CpuProgram>, entry_point: &str) -> Result<CpuKernel> {
        CpuKernel::new(program, entry_point)
    }

    fn enqueue_1d(queue: &CpuQueue, kernel: &CpuKernel, config: LaunchConfig) -> Result<()> {
        let program_context = kernel.program().context_id();
        if queue.context().id() != program_context {
            return Err(Error::context_mismatch(program_context, queue.context().id()));
        }
        let launch = kernel.prepare_launch(config)?;
        queue.submit(move || launch.run())
    }
}

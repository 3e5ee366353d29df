//! WebGPU backend (requires `wgpu` feature)
//!
//! Builds the WGSL dialect of the kernel into a compute pipeline. The
//! scalar kernel arguments are packed into a uniform block at enqueue time.
//! Enqueue records one compute pass and submits it without waiting; use
//! [`WgpuQueue::finish`](crate::runtime::CommandQueue::finish) or
//! [`WgpuContext::read_buffer`] to synchronize.

mod buffer;
mod context;
mod program;
mod queue;

pub use buffer::WgpuBuffer;
pub use context::{WgpuContext, is_wgpu_available};
pub use program::{WgpuKernel, WgpuProgram};
pub use queue::WgpuQueue;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::kernel::{KernelDialect, LaunchConfig, WORKGROUP_SIZE};
use crate::runtime::{Backend, CommandQueue, ComputeContext, ProgramCache};

/// WebGPU compute backend
#[derive(Clone, Copy, Debug, Default)]
pub struct WgpuBackend;

impl Backend for WgpuBackend {
    type Context = WgpuContext;
    type Queue = WgpuQueue;
    type Program = WgpuProgram;
    type Kernel = WgpuKernel;
    type Buffer = WgpuBuffer;

    const DIALECT: KernelDialect = KernelDialect::Wgsl;

    fn name() -> &'static str {
        "wgpu"
    }

    fn program_cache(context: &WgpuContext) -> &ProgramCache<WgpuProgram> {
        context.program_cache()
    }

    fn build_program(context: &WgpuContext, source: &str) -> Result<WgpuProgram> {
        WgpuProgram::build(context, source)
    }

    fn create_kernel(program: &Arc<WgpuProgram>, entry_point: &str) -> Result<WgpuKernel> {
        WgpuKernel::new(program, entry_point)
    }

    fn enqueue_1d(queue: &WgpuQueue, kernel: &WgpuKernel, config: LaunchConfig) -> Result<()> {
        let program_context = kernel.program().context_id();
        if queue.context().id() != program_context {
            return Err(Error::context_mismatch(program_context, queue.context().id()));
        }

        // The workgroup size is compiled into the shader
        if config.local_size != WORKGROUP_SIZE {
            return Err(Error::argument(
                "local_size",
                format!(
                    "wgpu kernels are compiled with workgroup size {}, got {}",
                    WORKGROUP_SIZE, config.local_size
                ),
            ));
        }

        let groups = config.group_count();
        let max_groups = queue.context().max_workgroups();
        if groups > max_groups {
            return Err(Error::argument(
                "count",
                format!(
                    "dispatch needs {} workgroups, device allows {}; split the range",
                    groups, max_groups
                ),
            ));
        }

        kernel.check_bindings(queue.context().max_binding_size())?;
        kernel.dispatch(queue.context(), groups)
    }
}

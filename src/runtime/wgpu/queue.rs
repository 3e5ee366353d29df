//! WebGPU queue handle

use super::WgpuContext;
use crate::error::Result;
use crate::runtime::CommandQueue;

/// Handle to the device queue of a [`WgpuContext`]
///
/// `wgpu` exposes one queue per device, so every handle created from the
/// same context submits to the same in-order queue.
#[derive(Clone, Debug)]
pub struct WgpuQueue {
    context: WgpuContext,
}

impl WgpuQueue {
    pub(crate) fn new(context: WgpuContext) -> Self {
        Self { context }
    }
}

impl CommandQueue for WgpuQueue {
    type Context = WgpuContext;

    fn context(&self) -> &WgpuContext {
        &self.context
    }

    fn finish(&self) -> Result<()> {
        let _ = self.context.device().poll(wgpu::Maintain::Wait);
        Ok(())
    }
}

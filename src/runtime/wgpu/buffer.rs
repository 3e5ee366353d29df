//! WebGPU storage buffers

use std::fmt;
use std::sync::Arc;

use crate::runtime::{ContextId, DeviceBuffer};

/// Device storage buffer of `u32` words
///
/// Clones share the same device allocation.
#[derive(Clone)]
pub struct WgpuBuffer {
    context: ContextId,
    raw: Arc<wgpu::Buffer>,
    len: usize,
}

impl WgpuBuffer {
    pub(crate) const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
        .union(wgpu::BufferUsages::COPY_SRC)
        .union(wgpu::BufferUsages::COPY_DST);

    /// Allocation size for `len` words, never zero
    pub(crate) fn byte_size(len: usize) -> u64 {
        (len.max(1) * 4) as u64
    }

    pub(crate) fn new(context: ContextId, raw: wgpu::Buffer, len: usize) -> Self {
        Self {
            context,
            raw: Arc::new(raw),
            len,
        }
    }

    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    pub(crate) fn len_words(&self) -> usize {
        self.len
    }

    /// Whether both handles refer to one device allocation
    pub fn shares_allocation(&self, other: &WgpuBuffer) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }
}

impl DeviceBuffer for WgpuBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn context_id(&self) -> ContextId {
        self.context
    }
}

impl fmt::Debug for WgpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuBuffer")
            .field("context", &self.context)
            .field("len", &self.len)
            .finish()
    }
}

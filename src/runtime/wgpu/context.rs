//! WebGPU context: one `wgpu::Device` and its queue

use std::fmt;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::{WgpuBuffer, WgpuProgram, WgpuQueue};
use crate::error::{Error, Result};
use crate::runtime::{ComputeContext, ContextId, ProgramCache};

struct ContextInner {
    id: ContextId,
    adapter_name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_workgroups: u32,
    max_binding_size: u64,
    cache: ProgramCache<WgpuProgram>,
}

/// WebGPU execution domain
///
/// Each [`WgpuContext::new`] requests its own device, so two contexts never
/// share buffers or compiled pipelines. Clones share everything.
#[derive(Clone)]
pub struct WgpuContext {
    inner: Arc<ContextInner>,
}

fn request_adapter(instance: &wgpu::Instance) -> Option<wgpu::Adapter> {
    // Fall back to a software adapter when no hardware one is exposed
    [false, true].into_iter().find_map(|force_fallback_adapter| {
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter,
        }))
    })
}

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// Check whether a WebGPU adapter is available
pub fn is_wgpu_available() -> bool {
    request_adapter(&instance()).is_some()
}

impl WgpuContext {
    /// Request a device on the default high-performance adapter
    ///
    /// Blocks until the device is ready.
    pub fn new() -> Result<Self> {
        let adapter = request_adapter(&instance())
            .ok_or_else(|| Error::Backend("No suitable WebGPU adapter found".into()))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("threefry-engine"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| Error::Backend(format!("WebGPU device request failed: {}", e)))?;

        let limits = device.limits();
        let max_workgroups = limits.max_compute_workgroups_per_dimension;
        let max_binding_size = u64::from(limits.max_storage_buffer_binding_size);
        let id = ContextId::next();
        tracing::debug!(
            %id,
            adapter = %adapter_name,
            max_workgroups,
            max_binding_size,
            "created wgpu context"
        );

        Ok(Self {
            inner: Arc::new(ContextInner {
                id,
                adapter_name,
                device,
                queue,
                max_workgroups,
                max_binding_size,
                cache: ProgramCache::new(),
            }),
        })
    }

    /// Name of the adapter backing this context
    pub fn adapter_name(&self) -> &str {
        &self.inner.adapter_name
    }

    /// Largest buffer, in bytes, a kernel argument may bind
    pub fn max_binding_size(&self) -> u64 {
        self.inner.max_binding_size
    }

    /// The program cache owned by this context
    pub fn program_cache(&self) -> &ProgramCache<WgpuProgram> {
        &self.inner.cache
    }

    /// Create a queue handle bound to this context
    pub fn create_queue(&self) -> WgpuQueue {
        WgpuQueue::new(self.clone())
    }

    /// Allocate a zeroed buffer of `len` words
    pub fn create_buffer(&self, len: usize) -> WgpuBuffer {
        let raw = self.inner.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("threefry buffer"),
            size: WgpuBuffer::byte_size(len),
            usage: WgpuBuffer::USAGE,
            mapped_at_creation: false,
        });
        WgpuBuffer::new(self.inner.id, raw, len)
    }

    /// Allocate a buffer initialized from `data`
    pub fn buffer_from_slice(&self, data: &[u32]) -> WgpuBuffer {
        // Zero-sized bindings are invalid, keep at least one word
        let contents: &[u32] = if data.is_empty() { &[0] } else { data };
        let raw = self
            .inner
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("threefry buffer"),
                contents: bytemuck::cast_slice(contents),
                usage: WgpuBuffer::USAGE,
            });
        WgpuBuffer::new(self.inner.id, raw, data.len())
    }

    /// Overwrite `buffer` from word 0; excess input is ignored
    pub fn write_buffer(&self, buffer: &WgpuBuffer, data: &[u32]) -> Result<()> {
        self.check_owned(buffer)?;
        let n = buffer.len_words().min(data.len());
        if n > 0 {
            self.inner
                .queue
                .write_buffer(buffer.raw(), 0, bytemuck::cast_slice(&data[..n]));
        }
        Ok(())
    }

    /// Copy `buffer` back to the host, waiting for all submitted work
    pub fn read_buffer(&self, buffer: &WgpuBuffer) -> Result<Vec<u32>> {
        self.check_owned(buffer)?;
        let len = buffer.len_words();
        if len == 0 {
            return Ok(Vec::new());
        }
        let size = (len * 4) as u64;

        let staging = self.inner.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("threefry staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .inner
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("threefry readback"),
            });
        encoder.copy_buffer_to_buffer(buffer.raw(), 0, &staging, 0, size);
        self.inner.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.inner.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| Error::Internal("Failed to read from GPU buffer".into()))?
            .map_err(|e| Error::Internal(format!("Buffer map failed: {:?}", e)))?;

        let words = {
            let data = slice.get_mapped_range();
            data.chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        };
        staging.unmap();
        Ok(words)
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.inner.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.inner.queue
    }

    pub(crate) fn max_workgroups(&self) -> u32 {
        self.inner.max_workgroups
    }

    fn check_owned(&self, buffer: &WgpuBuffer) -> Result<()> {
        use crate::runtime::DeviceBuffer;
        if buffer.context_id() != self.inner.id {
            return Err(Error::context_mismatch(self.inner.id, buffer.context_id()));
        }
        Ok(())
    }
}

impl ComputeContext for WgpuContext {
    fn id(&self) -> ContextId {
        self.inner.id
    }
}

impl fmt::Debug for WgpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuContext")
            .field("id", &self.inner.id)
            .field("adapter", &self.inner.adapter_name)
            .field("programs", &self.inner.cache.len())
            .finish()
    }
}

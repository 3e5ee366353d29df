//! WGSL pipeline build and kernel dispatch

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{WgpuBuffer, WgpuContext};
use crate::error::{Error, Result};
use crate::kernel::NUM_ARGS;
use crate::runtime::{ComputeContext, ContextId, DeviceBuffer, KernelArg, KernelObject};

/// Number of leading buffer arguments; the rest are scalars
const NUM_BUFFERS: usize = 3;

/// Scalar arguments as laid out in the shader's uniform block
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct ThreeFryParams {
    offset: u32,
    count: u32,
    rounds: u32,
    _pad0: u32,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// A compiled compute pipeline
pub struct WgpuProgram {
    context: ContextId,
    entry_point: String,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl WgpuProgram {
    /// Compile `source` under a validation error scope
    ///
    /// The first validation error (WGSL parse, type check or pipeline
    /// creation) is returned verbatim as `BuildFailure`.
    pub(crate) fn build(context: &WgpuContext, source: &str) -> Result<Self> {
        let device = context.device();
        let entry_point = crate::kernel::ENTRY_POINT;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("threefry shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("threefry bind group layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("threefry pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("threefry pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::build_failure(err.to_string()));
        }

        tracing::debug!(context = %context.id(), entry_point, "built wgpu pipeline");

        Ok(Self {
            context: context.id(),
            entry_point: entry_point.to_string(),
            pipeline,
            bind_group_layout,
        })
    }

    /// Context the program was built for
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Entry point compiled into the pipeline
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

impl fmt::Debug for WgpuProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuProgram")
            .field("context", &self.context)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Kernel objects
// ============================================================================

/// The pipeline entry point with its bound arguments
#[derive(Debug)]
pub struct WgpuKernel {
    program: Arc<WgpuProgram>,
    buffers: [Option<WgpuBuffer>; NUM_BUFFERS],
    scalars: [Option<u32>; NUM_ARGS as usize - NUM_BUFFERS],
}

impl WgpuKernel {
    pub(crate) fn new(program: &Arc<WgpuProgram>, entry_point: &str) -> Result<Self> {
        if entry_point != program.entry_point {
            return Err(Error::Backend(format!(
                "kernel '{}' not found in program; available: [{:?}]",
                entry_point, program.entry_point
            )));
        }
        Ok(Self {
            program: program.clone(),
            buffers: Default::default(),
            scalars: Default::default(),
        })
    }

    /// The program this kernel was created from
    pub fn program(&self) -> &Arc<WgpuProgram> {
        &self.program
    }

    fn unbound(&self, index: usize) -> Error {
        Error::argument(
            "kernel",
            format!("argument {} of '{}' is unbound", index, self.program.entry_point),
        )
    }

    fn bound_buffers(&self) -> Result<[&WgpuBuffer; NUM_BUFFERS]> {
        let [Some(ctr), Some(key), Some(out)] = &self.buffers else {
            let i = self.buffers.iter().position(Option::is_none).unwrap_or(0);
            return Err(self.unbound(i));
        };
        Ok([ctr, key, out])
    }

    /// Reject bindings the device would refuse at dispatch time
    ///
    /// The output is bound read-write, so it may not alias an input, and
    /// no binding may exceed the device's storage binding limit.
    pub(crate) fn check_bindings(&self, max_binding_size: u64) -> Result<()> {
        let [ctr, key, out] = self.bound_buffers()?;
        if out.shares_allocation(ctr) || out.shares_allocation(key) {
            return Err(Error::argument(
                "output",
                "output shares an allocation with an input buffer",
            ));
        }
        for (name, buffer) in [("counters", ctr), ("key", key), ("output", out)] {
            let size = buffer.raw().size();
            if size > max_binding_size {
                return Err(Error::argument(
                    name,
                    format!(
                        "buffer of {} bytes exceeds the device binding limit of {} bytes",
                        size, max_binding_size
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Record and submit one compute pass of `groups` workgroups
    ///
    /// Encoding runs under a validation error scope; a rejected binding
    /// becomes `ArgumentError` and nothing is submitted.
    pub(crate) fn dispatch(&self, context: &WgpuContext, groups: u32) -> Result<()> {
        let buffers = self.bound_buffers()?;
        let mut scalars = [0u32; NUM_ARGS as usize - NUM_BUFFERS];
        for (i, s) in self.scalars.iter().enumerate() {
            scalars[i] = s.ok_or_else(|| self.unbound(NUM_BUFFERS + i))?;
        }

        let params = ThreeFryParams {
            offset: scalars[0],
            count: scalars[1],
            rounds: scalars[2],
            _pad0: 0,
        };

        let device = context.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("threefry params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("threefry bind group"),
            layout: &self.program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers[0].raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers[1].raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers[2].raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("threefry encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("threefry pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        let commands = encoder.finish();

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::argument("kernel", err.to_string()));
        }
        context.queue().submit(std::iter::once(commands));
        Ok(())
    }
}

impl KernelObject for WgpuKernel {
    type Buffer = WgpuBuffer;

    fn entry_point(&self) -> &str {
        &self.program.entry_point
    }

    fn set_arg(&mut self, index: u32, arg: KernelArg<'_, WgpuBuffer>) -> Result<()> {
        let i = index as usize;
        match arg {
            KernelArg::Buffer(b) if i < NUM_BUFFERS => {
                if b.context_id() != self.program.context {
                    return Err(Error::context_mismatch(self.program.context, b.context_id()));
                }
                self.buffers[i] = Some(b.clone());
            }
            KernelArg::U32(v) if (NUM_BUFFERS..NUM_ARGS as usize).contains(&i) => {
                self.scalars[i - NUM_BUFFERS] = Some(v);
            }
            _ => {
                return Err(Error::argument(
                    "arg",
                    format!(
                        "'{}' takes {} buffers then {} u32 scalars; index {} does not accept this argument",
                        self.program.entry_point,
                        NUM_BUFFERS,
                        NUM_ARGS as usize - NUM_BUFFERS,
                        index
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelDialect, threefry_source};
    use crate::runtime::wgpu::is_wgpu_available;

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<ThreeFryParams>(), 16);
    }

    #[test]
    fn test_build_and_bind() {
        if !is_wgpu_available() {
            println!("No GPU available, skipping test");
            return;
        }
        let ctx = WgpuContext::new().unwrap();
        let program =
            Arc::new(WgpuProgram::build(&ctx, &threefry_source(KernelDialect::Wgsl)).unwrap());
        let mut kernel = WgpuKernel::new(&program, "generate_rng").unwrap();
        let buf = ctx.create_buffer(2);

        kernel.set_arg(0, KernelArg::Buffer(&buf)).unwrap();
        assert!(kernel.set_arg(0, KernelArg::U32(1)).is_err());
        assert!(kernel.set_arg(3, KernelArg::Buffer(&buf)).is_err());
        assert!(kernel.set_arg(6, KernelArg::U32(1)).is_err());
        assert!(WgpuKernel::new(&program, "missing").is_err());
    }

    #[test]
    fn test_build_failure_carries_diagnostic() {
        if !is_wgpu_available() {
            println!("No GPU available, skipping test");
            return;
        }
        let ctx = WgpuContext::new().unwrap();
        match WgpuProgram::build(&ctx, "fn generate_rng( {") {
            Err(Error::BuildFailure { diagnostic }) => assert!(!diagnostic.is_empty()),
            other => panic!("expected build failure, got {other:?}"),
        }
    }
}

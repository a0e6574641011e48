use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use super::args::{slot, KernelArg, ARG_COUNT, KERNEL_SIGNATURE};
use super::backend::{BufferAccess, BufferHandle, ComputeBackend};
use super::error::{ComputeError, FrameStep};

/// Invocations per workgroup; must match `@workgroup_size` in the program.
pub const WORKGROUP_SIZE: u32 = 64;

/// Entry point the program must export.
pub const ENTRY_POINT: &str = "main";

/// Storage bindings may not be empty; tiny buffers are padded to this.
const MIN_BUFFER_SIZE: u64 = 16;

/// WGSL source of a compute program.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    label: String,
    wgsl: String,
}

impl ProgramSource {
    pub fn from_wgsl(label: impl Into<String>, wgsl: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            wgsl: wgsl.into(),
        }
    }

    /// Reads a `.wgsl` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let wgsl = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read compute program {}", path.display()))?;
        Ok(Self::from_wgsl(path.display().to_string(), wgsl))
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn wgsl(&self) -> &str {
        &self.wgsl
    }
}

/// Scalar arguments packed for binding 1.
///
/// Field order follows WGSL uniform layout: each `vec3<f32>` is padded by the
/// `u32` that follows it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
struct FrameUniforms {
    position: [f32; 3],
    width: u32,
    look_at: [f32; 3],
    height: u32,
    up: [f32; 3],
    sample_count: u32,
}

impl FrameUniforms {
    fn set(&mut self, index: usize, arg: &KernelArg) -> bool {
        match (index, *arg) {
            (slot::WIDTH, KernelArg::U32(v)) => self.width = v,
            (slot::HEIGHT, KernelArg::U32(v)) => self.height = v,
            (slot::SAMPLE_COUNT, KernelArg::U32(v)) => self.sample_count = v,
            (slot::POSITION, KernelArg::Float3(v)) => self.position = v,
            (slot::LOOK_AT, KernelArg::Float3(v)) => self.look_at = v,
            (slot::UP, KernelArg::Float3(v)) => self.up = v,
            _ => return false,
        }
        true
    }
}

struct DeviceBuffer {
    buffer: wgpu::Buffer,
    /// Host-readable copy target for `DeviceWrite` buffers.
    readback: Option<wgpu::Buffer>,
    size: u64,
    mapped: bool,
}

/// `ComputeBackend` over one wgpu compute pipeline.
///
/// Binding layout of the program:
/// - 0: `array<vec4<f32>>` output, read-write storage
/// - 1: frame uniforms
/// - 2: `array<vec2<f32>>` samples, read-only storage
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,

    buffers: HashMap<BufferHandle, DeviceBuffer>,
    next_id: u32,

    uniforms: FrameUniforms,
    output: Option<BufferHandle>,
    samples: Option<BufferHandle>,
    bind_group: Option<(BufferHandle, BufferHandle, wgpu::BindGroup)>,
}

impl WgpuBackend {
    /// Compiles `program` and builds the pipeline.
    ///
    /// A program that fails to compile is an error carrying the full build log.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, program: &ProgramSource) -> Result<Self> {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(program.label()),
            source: wgpu::ShaderSource::Wgsl(program.wgsl().into()),
        });
        check_compilation(&module, program.label())?;

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rayview compute bgl"),
            entries: &[
                storage(0, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FrameUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                storage(2, true),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rayview compute pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("rayview compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(ENTRY_POINT),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rayview frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!("compute program '{}' compiled", program.label());

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            pipeline,
            bind_group_layout,
            uniform_buffer,
            buffers: HashMap::new(),
            next_id: 1,
            uniforms: FrameUniforms::default(),
            output: None,
            samples: None,
            bind_group: None,
        })
    }

    fn buffer(&self, handle: BufferHandle, step: FrameStep) -> Result<&DeviceBuffer, ComputeError> {
        self.buffers
            .get(&handle)
            .ok_or_else(|| ComputeError::backend(step, format!("unknown buffer {}", handle.id())))
    }

    fn ensure_bind_group(&mut self) -> Result<(), ComputeError> {
        let (Some(output), Some(samples)) = (self.output, self.samples) else {
            return Err(ComputeError::backend(
                FrameStep::Enqueue,
                "output and sample buffers must be bound",
            ));
        };

        if matches!(&self.bind_group, Some((o, s, _)) if *o == output && *s == samples) {
            return Ok(());
        }

        let out = self.buffer(output, FrameStep::Enqueue)?;
        let smp = self.buffer(samples, FrameStep::Enqueue)?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rayview compute bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: out.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: smp.buffer.as_entire_binding(),
                },
            ],
        });

        self.bind_group = Some((output, samples, bind_group));
        Ok(())
    }
}

impl ComputeBackend for WgpuBackend {
    fn create_buffer(
        &mut self,
        label: &str,
        size: u64,
        access: BufferAccess,
    ) -> Result<BufferHandle, ComputeError> {
        let max = self.device.limits().max_storage_buffer_binding_size as u64;
        if size > max {
            return Err(ComputeError::backend(
                FrameStep::CreateBuffer,
                format!("{label}: {size} bytes exceeds the device limit of {max}"),
            ));
        }

        let alloc = size.max(MIN_BUFFER_SIZE);
        let usage = match access {
            BufferAccess::DeviceWrite => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            BufferAccess::HostWrite => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        };

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: alloc,
            usage,
            mapped_at_creation: false,
        });

        let readback_label = format!("{label} readback");
        let readback = (access == BufferAccess::DeviceWrite).then(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(readback_label.as_str()),
                size: alloc,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let handle = BufferHandle::new(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            handle,
            DeviceBuffer {
                buffer,
                readback,
                size,
                mapped: false,
            },
        );

        log::debug!("allocated {label} ({size} bytes) as buffer {}", handle.id());
        Ok(handle)
    }

    fn bind_argument(&mut self, index: usize, arg: &KernelArg) -> Result<(), ComputeError> {
        if index >= ARG_COUNT {
            return Err(ComputeError::backend(
                FrameStep::Bind,
                format!("argument index {index} out of range"),
            ));
        }

        match (index, *arg) {
            (slot::OUTPUT, KernelArg::Buffer(b)) => {
                self.buffer(b, FrameStep::Bind)?;
                self.output = Some(b);
            }
            (slot::SAMPLES, KernelArg::Buffer(b)) => {
                self.buffer(b, FrameStep::Bind)?;
                self.samples = Some(b);
            }
            _ => {
                if !self.uniforms.set(index, arg) {
                    return Err(ComputeError::ArgumentLayout {
                        index,
                        expected: KERNEL_SIGNATURE[index],
                        found: arg.kind(),
                    });
                }
            }
        }
        Ok(())
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), ComputeError> {
        let target = self.buffer(buffer, FrameStep::WriteSamples)?;
        if data.len() as u64 > target.size {
            return Err(ComputeError::backend(
                FrameStep::WriteSamples,
                format!("{} bytes do not fit in {} byte buffer", data.len(), target.size),
            ));
        }
        if data.is_empty() {
            return Ok(());
        }

        // Ordered before any later submission on the same queue.
        self.queue.write_buffer(&target.buffer, 0, data);
        Ok(())
    }

    fn dispatch(&mut self, work_items: u32) -> Result<(), ComputeError> {
        self.ensure_bind_group()?;

        let Some((output, _, bind_group)) = self.bind_group.as_ref() else {
            return Err(ComputeError::backend(FrameStep::Enqueue, "no bind group"));
        };
        let out = self.buffer(*output, FrameStep::Enqueue)?;
        if out.mapped {
            return Err(ComputeError::backend(
                FrameStep::Enqueue,
                "output buffer is still mapped",
            ));
        }

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let (gx, gy) = workgroup_grid(
            work_items,
            self.device.limits().max_compute_workgroups_per_dimension,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rayview compute encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("rayview compute pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(gx, gy, 1);
        }

        if let Some(readback) = &out.readback {
            encoder.copy_buffer_to_buffer(&out.buffer, 0, readback, 0, out.buffer.size());
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("dispatched {work_items} work items as {gx}x{gy} workgroups");
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), ComputeError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ComputeError::backend(FrameStep::Wait, e.to_string()))?;
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<u8>, ComputeError> {
        let entry = self.buffer(buffer, FrameStep::MapOutput)?;
        if entry.mapped {
            return Err(ComputeError::backend(FrameStep::MapOutput, "buffer already mapped"));
        }
        let Some(readback) = entry.readback.as_ref() else {
            return Err(ComputeError::backend(
                FrameStep::MapOutput,
                "buffer is not readable by the host",
            ));
        };

        let slice = readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ComputeError::backend(FrameStep::MapOutput, e.to_string()))?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ComputeError::backend(FrameStep::MapOutput, e.to_string())),
            Err(_) => {
                return Err(ComputeError::backend(
                    FrameStep::MapOutput,
                    "map callback was dropped",
                ))
            }
        }

        let bytes = slice.get_mapped_range()[..entry.size as usize].to_vec();

        if let Some(entry) = self.buffers.get_mut(&buffer) {
            entry.mapped = true;
        }
        Ok(bytes)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), ComputeError> {
        let entry = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| ComputeError::backend(FrameStep::Unmap, "unknown buffer"))?;
        if !entry.mapped {
            return Err(ComputeError::backend(FrameStep::Unmap, "buffer is not mapped"));
        }
        if let Some(readback) = &entry.readback {
            readback.unmap();
        }
        entry.mapped = false;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        let Some(entry) = self.buffers.remove(&buffer) else {
            return;
        };

        if matches!(&self.bind_group, Some((o, s, _)) if *o == buffer || *s == buffer) {
            self.bind_group = None;
        }
        if self.output == Some(buffer) {
            self.output = None;
        }
        if self.samples == Some(buffer) {
            self.samples = None;
        }

        if let Some(readback) = entry.readback {
            if entry.mapped {
                readback.unmap();
            }
            readback.destroy();
        }
        entry.buffer.destroy();
        log::debug!("freed buffer {}", buffer.id());
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        let handles: Vec<BufferHandle> = self.buffers.keys().copied().collect();
        for handle in handles {
            self.destroy_buffer(handle);
        }
        self.uniform_buffer.destroy();
    }
}

/// Splits `work_items` into a 2D workgroup grid that respects the
/// per-dimension dispatch limit. The program flattens it back with
/// `num_workgroups`.
fn workgroup_grid(work_items: u32, max_per_dimension: u32) -> (u32, u32) {
    let groups = work_items.div_ceil(WORKGROUP_SIZE).max(1);
    let max = max_per_dimension.max(1);
    if groups <= max {
        (groups, 1)
    } else {
        (max, groups.div_ceil(max))
    }
}

fn check_compilation(module: &wgpu::ShaderModule, label: &str) -> Result<()> {
    let info = pollster::block_on(module.get_compilation_info());

    let mut log_text = String::new();
    let mut errors = 0usize;
    for msg in &info.messages {
        let kind = match msg.message_type {
            wgpu::CompilationMessageType::Error => {
                errors += 1;
                "error"
            }
            wgpu::CompilationMessageType::Warning => "warning",
            wgpu::CompilationMessageType::Info => "info",
        };
        match &msg.location {
            Some(loc) => log_text.push_str(&format!(
                "{label}:{}:{}: {kind}: {}\n",
                loc.line_number, loc.line_position, msg.message
            )),
            None => log_text.push_str(&format!("{label}: {kind}: {}\n", msg.message)),
        }
    }

    if errors > 0 {
        anyhow::bail!("compute program '{label}' failed to compile:\n{log_text}");
    }
    if !log_text.is_empty() {
        log::warn!("compute program build log:\n{log_text}");
    }
    Ok(())
}

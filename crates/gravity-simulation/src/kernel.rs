//! Compute pipelines and per-run device buffers for the leapfrog kernels

use crate::device::{DeviceContext, DeviceError};
use crate::params::KernelParams;
use crate::state::TracerState;
use gravity_physics::{FieldMode, FieldParams, Source, Vector};
use std::sync::Arc;
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = 256;

/// Shader module, bind group layout and the three leapfrog pipelines
pub struct GravityKernels {
    bind_group_layout: wgpu::BindGroupLayout,
    kick_drift_pipeline: wgpu::ComputePipeline,
    accelerate_pipeline: wgpu::ComputePipeline,
    kick_pipeline: wgpu::ComputePipeline,
}

impl GravityKernels {
    /// Compile the shader and build the pipelines
    ///
    /// Validation errors are captured in an error scope and returned instead
    /// of reaching the device's uncaptured error handler.
    pub fn new(device: &wgpu::Device) -> Result<Self, DeviceError> {
        Self::with_source(device, include_str!("shaders/gravity.wgsl"))
    }

    /// Build from WGSL exposing `kick_drift`, `accelerate` and `kick` over
    /// the gravity bind group layout
    pub fn with_source(device: &wgpu::Device, source: &str) -> Result<Self, DeviceError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let kernels = Self::build(device, source);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(DeviceError::Pipeline(err.to_string()));
        }
        log::debug!("Gravity pipelines created");
        Ok(kernels)
    }

    fn build(device: &wgpu::Device, source: &str) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gravity Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

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
            label: Some("Gravity Bind Group Layout"),
            entries: &[
                storage(0, false),
                storage(1, false),
                storage(2, false),
                storage(3, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
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
            label: Some("Gravity Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let kick_drift_pipeline = pipeline("Kick Drift Pipeline", "kick_drift");
        let accelerate_pipeline = pipeline("Accelerate Pipeline", "accelerate");
        let kick_pipeline = pipeline("Kick Pipeline", "kick");

        Self {
            bind_group_layout,
            kick_drift_pipeline,
            accelerate_pipeline,
            kick_pipeline,
        }
    }
}

/// Workgroup grid covering `target_count` invocations
///
/// Rows hold at most `max_per_dimension` workgroups; past that the grid grows
/// a second dimension. `None` when even a square grid is too small.
pub fn dispatch_grid(target_count: u32, max_per_dimension: u32) -> Option<(u32, u32)> {
    let groups = target_count.div_ceil(WORKGROUP_SIZE);
    let x = groups.min(max_per_dimension);
    if x == 0 {
        return (groups == 0).then_some((0, 0));
    }
    let y = groups.div_ceil(x);
    (y <= max_per_dimension).then_some((x, y))
}

/// Check a batch against the device limits and size its dispatch grid
pub fn plan_dispatch<const D: usize>(
    limits: &wgpu::Limits,
    target_count: usize,
    source_count: usize,
) -> Result<(u32, u32), DeviceError> {
    let f32_size = std::mem::size_of::<f32>() as u64;
    let max_binding =
        u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);

    let buffers = [
        ("target buffer", target_count as u64 * D as u64 * f32_size),
        ("source buffer", source_count as u64 * (D as u64 + 1) * f32_size),
    ];
    for (what, required) in buffers {
        if required > max_binding {
            return Err(DeviceError::Capacity {
                what,
                required,
                limit: max_binding,
            });
        }
    }

    let too_many = |what, required: usize| DeviceError::Capacity {
        what,
        required: required as u64,
        limit: u64::from(u32::MAX),
    };
    let count =
        u32::try_from(target_count).map_err(|_| too_many("target count", target_count))?;
    u32::try_from(source_count).map_err(|_| too_many("source count", source_count))?;

    let max_per_dimension = limits.max_compute_workgroups_per_dimension;
    dispatch_grid(count, max_per_dimension).ok_or(DeviceError::Capacity {
        what: "workgroup grid",
        required: u64::from(count.div_ceil(WORKGROUP_SIZE)),
        limit: u64::from(max_per_dimension) * u64::from(max_per_dimension),
    })
}

/// Flatten vectors into `f32`s, padded so the buffer is never empty
fn flatten<const D: usize>(values: &[Vector<D>]) -> Vec<f32> {
    let mut flat: Vec<f32> = values.iter().flat_map(|v| v.to_f32()).collect();
    if flat.is_empty() {
        flat.push(0.0);
    }
    flat
}

/// Sources packed as `D` coordinates followed by the mass
fn pack_sources<const D: usize>(sources: &[Source<D>]) -> Vec<f32> {
    let mut packed = Vec::with_capacity(sources.len() * (D + 1));
    for source in sources {
        packed.extend(source.position.to_f32());
        packed.push(source.mass as f32);
    }
    if packed.is_empty() {
        packed.push(0.0);
    }
    packed
}

fn unflatten<const D: usize>(flat: &[f32]) -> Vec<Vector<D>> {
    if D == 0 {
        return Vec::new();
    }
    flat.chunks_exact(D).map(Vector::from_f32).collect()
}

/// Targets, sources and parameters resident on the device
///
/// Buffers are released when the session is dropped.
pub struct DeviceSession<const D: usize> {
    context: Arc<DeviceContext>,
    kernels: Arc<GravityKernels>,

    positions: wgpu::Buffer,
    velocities: wgpu::Buffer,
    accelerations: wgpu::Buffer,
    sources: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    params: KernelParams,
    target_count: usize,
    grid: (u32, u32),
}

impl<const D: usize> DeviceSession<D> {
    /// Upload `state` as the targets together with a fixed set of sources
    ///
    /// Fails when the arrays of `state` differ in length or the batch does
    /// not fit the device limits.
    pub fn new(
        context: Arc<DeviceContext>,
        kernels: Arc<GravityKernels>,
        state: &TracerState<D>,
        sources: &[Source<D>],
        field: &FieldParams,
        mode: FieldMode,
    ) -> gravity_physics::Result<Self> {
        state.validate()?;
        let grid = plan_dispatch::<D>(&context.device.limits(), state.len(), sources.len())?;

        let positions = &state.positions;
        let device = &context.device;
        let target_usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;

        let target_buffer = |label: &str, values: &[Vector<D>]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&flatten(values)),
                usage: target_usage,
            })
        };
        let positions_buffer = target_buffer("Position Buffer", positions);
        let velocities_buffer = target_buffer("Velocity Buffer", &state.velocities);
        let accelerations_buffer = target_buffer("Acceleration Buffer", &state.accelerations);

        let sources_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Source Buffer"),
            contents: bytemuck::cast_slice(&pack_sources(sources)),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let params = KernelParams::new(field, positions.len(), sources.len(), D, mode);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Kernel Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Gravity Bind Group"),
            layout: &kernels.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: positions_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: velocities_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: accelerations_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: sources_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        log::debug!(
            "Device session: {} targets, {} sources, D = {}, grid {:?}",
            positions.len(),
            sources.len(),
            D,
            grid
        );

        Ok(Self {
            context,
            kernels,
            positions: positions_buffer,
            velocities: velocities_buffer,
            accelerations: accelerations_buffer,
            sources: sources_buffer,
            params_buffer,
            bind_group,
            params,
            target_count: positions.len(),
            grid,
        })
    }

    pub fn len(&self) -> usize {
        self.target_count
    }

    pub fn is_empty(&self) -> bool {
        self.target_count == 0
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::ComputePipeline,
    ) {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(pipeline);
        compute_pass.set_bind_group(0, &self.bind_group, &[]);
        compute_pass.dispatch_workgroups(self.grid.0, self.grid.1, 1);
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) -> Result<(), DeviceError> {
        self.context.queue.submit(std::iter::once(encoder.finish()));
        self.context.wait()
    }

    /// Evaluate the field at the current positions
    pub fn accelerate(&mut self) -> Result<(), DeviceError> {
        if self.is_empty() {
            return Ok(());
        }
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Accelerate Encoder"),
                });
        self.encode_pass(&mut encoder, "Accelerate Pass", &self.kernels.accelerate_pipeline);
        self.submit(encoder)
    }

    /// One kick-drift-kick step, blocking until the device is done
    pub fn step(&mut self, dt: f64) -> Result<(), DeviceError> {
        if self.is_empty() {
            return Ok(());
        }

        self.params = self.params.with_dt(dt);
        self.context
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Leapfrog Encoder"),
                });

        // Passes run in order; each sees the previous pass's writes
        self.encode_pass(&mut encoder, "Kick Drift Pass", &self.kernels.kick_drift_pipeline);
        self.encode_pass(&mut encoder, "Accelerate Pass", &self.kernels.accelerate_pipeline);
        self.encode_pass(&mut encoder, "Kick Pass", &self.kernels.kick_pipeline);

        self.submit(encoder)
    }

    fn read(&self, buffer: &wgpu::Buffer) -> Result<Vec<Vector<D>>, DeviceError> {
        let size = (self.target_count * D * std::mem::size_of::<f32>()) as u64;
        let flat = self.context.read_f32(buffer, size)?;
        Ok(unflatten(&flat))
    }

    pub fn read_positions(&self) -> Result<Vec<Vector<D>>, DeviceError> {
        self.read(&self.positions)
    }

    pub fn read_velocities(&self) -> Result<Vec<Vector<D>>, DeviceError> {
        self.read(&self.velocities)
    }

    pub fn read_accelerations(&self) -> Result<Vec<Vector<D>>, DeviceError> {
        self.read(&self.accelerations)
    }

    /// Download all three arrays
    pub fn read_state(&self) -> Result<TracerState<D>, DeviceError> {
        Ok(TracerState {
            positions: self.read_positions()?,
            velocities: self.read_velocities()?,
            accelerations: self.read_accelerations()?,
        })
    }
}

impl<const D: usize> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.positions.destroy();
        self.velocities.destroy();
        self.accelerations.destroy();
        self.sources.destroy();
        self.params_buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_are_padded() {
        assert_eq!(flatten::<2>(&[]), vec![0.0]);
        assert_eq!(pack_sources::<2>(&[]), vec![0.0]);
    }

    #[test]
    fn sources_are_packed_with_mass_last() {
        let packed = pack_sources(&[
            Source::new(Vector::new([1.0, 2.0]), 3.0),
            Source::new(Vector::new([-4.0, 5.0]), 0.5),
        ]);
        assert_eq!(packed, vec![1.0, 2.0, 3.0, -4.0, 5.0, 0.5]);
    }

    #[test]
    fn small_batches_use_one_row_of_workgroups() {
        assert_eq!(dispatch_grid(0, 65_535), Some((0, 0)));
        assert_eq!(dispatch_grid(1, 65_535), Some((1, 1)));
        assert_eq!(dispatch_grid(257, 65_535), Some((2, 1)));
        assert_eq!(dispatch_grid(65_535 * 256, 65_535), Some((65_535, 1)));
    }

    #[test]
    fn large_batches_spill_into_a_second_dimension() {
        assert_eq!(dispatch_grid(65_535 * 256 + 1, 65_535), Some((65_535, 2)));
        assert_eq!(dispatch_grid(u32::MAX, 65_535), Some((65_535, 257)));
        assert_eq!(dispatch_grid(u32::MAX, 4), None);
    }

    #[test]
    fn batches_are_checked_against_device_limits() {
        let limits = wgpu::Limits::downlevel_defaults();

        let grid = plan_dispatch::<1>(&limits, 16_776_961, 2).unwrap();
        assert_eq!(grid, (65_535, 2));

        let err = plan_dispatch::<3>(&limits, 16_776_961, 2).unwrap_err();
        assert!(matches!(err, DeviceError::Capacity { what: "target buffer", .. }));

        let err = plan_dispatch::<2>(&limits, 1, 20_000_000).unwrap_err();
        assert!(matches!(err, DeviceError::Capacity { what: "source buffer", .. }));

        let limits = wgpu::Limits {
            max_compute_workgroups_per_dimension: 16,
            ..limits
        };
        let err = plan_dispatch::<1>(&limits, 100_000, 2).unwrap_err();
        assert!(matches!(err, DeviceError::Capacity { what: "workgroup grid", .. }));
    }

    #[test]
    fn shader_parses_and_validates() {
        let source = include_str!("shaders/gravity.wgsl");
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|err| panic!("{}", err.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap();

        let entry_points: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(entry_points, ["kick_drift", "accelerate", "kick"]);
    }

    #[test]
    fn unflatten_splits_by_dimension() {
        let vectors = unflatten::<2>(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(vectors, vec![Vector::new([1.0, 2.0]), Vector::new([3.0, 4.0])]);
    }
}

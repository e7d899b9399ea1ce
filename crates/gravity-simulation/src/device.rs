//! GPU adapter, device and queue acquisition

use thiserror::Error;

/// Failures talking to the GPU
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("readback callback was dropped before completing")]
    MapCallbackDropped,

    #[error("failed to build compute pipelines: {0}")]
    Pipeline(String),

    #[error("{what} needs {required} but the device allows {limit}")]
    Capacity {
        what: &'static str,
        required: u64,
        limit: u64,
    },
}

impl From<DeviceError> for gravity_physics::Error {
    fn from(err: DeviceError) -> Self {
        gravity_physics::Error::Backend(err.to_string())
    }
}

/// Headless device and queue used for compute work
pub struct DeviceContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    adapter_name: String,
}

impl DeviceContext {
    pub async fn new() -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_name = adapter.get_info().name;
        log::info!("✓ Using GPU: {adapter_name}");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Gravity Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_name,
        })
    }

    /// Blocking variant of [`DeviceContext::new`]
    pub fn blocking() -> Result<Self, DeviceError> {
        pollster::block_on(Self::new())
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Block until all submitted work has finished
    pub fn wait(&self) -> Result<(), DeviceError> {
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        Ok(())
    }

    /// Copy `size` bytes out of `source` and return them as `f32`s
    pub fn read_f32(&self, source: &wgpu::Buffer, size: u64) -> Result<Vec<f32>, DeviceError> {
        if size == 0 {
            return Ok(Vec::new());
        }

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait()?;
        rx.recv().map_err(|_| DeviceError::MapCallbackDropped)??;

        let values = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, f32>(&data).to_vec()
        };
        staging.unmap();
        staging.destroy();

        Ok(values)
    }
}

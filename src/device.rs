//! GPU device acquisition.
//!
//! This module wraps wgpu's instance, adapter, device and queue in a
//! single [`GpuDevice`].  Requesting an adapter and a device is
//! asynchronous in wgpu; [`GpuDevice::new_blocking`] hides that behind
//! [`pollster`] so the rest of the crate can stay synchronous.

use log::info;
use wgpu::{Adapter, AdapterInfo, Device, Instance, Queue};

use crate::config::GpuConfig;
use crate::error::{Error, Result};

/// A logical GPU device and its submission queue.
///
/// The wgpu handles are internally reference counted, so cloning a
/// `GpuDevice` is cheap and both copies refer to the same device.
#[derive(Clone)]
pub struct GpuDevice {
    /// Kept alive for the lifetime of the adapter.
    pub instance: Instance,
    /// The physical device selected for computation.
    pub adapter: Adapter,
    /// Logical device used to create resources and command encoders.
    pub device: Device,
    /// Queue that recorded command buffers are submitted to.
    pub queue: Queue,
}

impl GpuDevice {
    /// Acquire a device synchronously, blocking the current thread until
    /// the adapter and device requests resolve.
    pub fn new_blocking(config: &GpuConfig) -> Result<Self> {
        pollster::block_on(Self::new_async(config))
    }

    /// Acquire a device asynchronously.
    pub async fn new_async(config: &GpuConfig) -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::DeviceInit(format!("unable to find a suitable GPU adapter: {e}")))?;
        // Downlevel backends may not expose compute at all.
        let capabilities = adapter.get_downlevel_capabilities();
        if !capabilities.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
            return Err(Error::DeviceInit(
                "selected adapter does not support compute shaders".into(),
            ));
        }
        let adapter_info = adapter.get_info();
        info!(
            "using adapter {} ({:?}, {:?})",
            adapter_info.name, adapter_info.backend, adapter_info.device_type
        );
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(&config.label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::DeviceInit(format!("failed to create GPU device: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Information about the adapter backing this device.
    pub fn adapter_info(&self) -> AdapterInfo {
        self.adapter.get_info()
    }

    /// Block until all submitted work on this device has finished.
    pub(crate) fn wait_idle(&self) -> std::result::Result<(), wgpu::PollError> {
        self.device.poll(wgpu::PollType::Wait).map(|_| ())
    }
}

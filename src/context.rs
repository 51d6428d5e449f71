//! Kernel dispatch context.
//!
//! A [`Context`] ties one compute entry point to its own device and
//! queue.  Buffers are bound to numbered argument slots, which map to
//! `@binding` indices in bind group 0 of the kernel, and
//! [`Context::dispatch`] submits the work and blocks until the device has
//! finished it.
//!
//! Device-side failures are captured with wgpu error scopes so that they
//! come back as [`Error`] values instead of hitting the default
//! uncaptured-error handler, which panics.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use wgpu::{BufferAddress, ErrorFilter};

use crate::buffer::Buffer;
use crate::config::GpuConfig;
use crate::device::GpuDevice;
use crate::dim::Dim3;
use crate::error::{Error, Result};
use crate::kernel::{EntryPoint, KernelModule};

/// A buffer bound to an argument slot for the next dispatch.
struct Binding {
    buffer: wgpu::Buffer,
    offset: BufferAddress,
}

/// Owns a device, a queue and the compiled pipeline for exactly one
/// kernel entry point.
///
/// Re-targeting another entry point means building another `Context`.
/// A fresh command encoder is recorded for every dispatch, so a context
/// can be dispatched any number of times.
pub struct Context {
    gpu: GpuDevice,
    entry_point: EntryPoint,
    pipeline: wgpu::ComputePipeline,
    bindings: BTreeMap<u32, Binding>,
}

impl Context {
    /// Load the module at `module_path`, resolve `entry_point` and build
    /// its pipeline on a device chosen by [`GpuConfig::from_env`].
    pub fn new(module_path: impl AsRef<Path>, entry_point: &str) -> Result<Self> {
        Self::with_config(module_path, entry_point, &GpuConfig::from_env())
    }

    /// Like [`Context::new`] with an explicit device configuration.
    ///
    /// The module is parsed and the entry point resolved before a device
    /// is requested, so a bad path or name fails without touching the GPU.
    pub fn with_config(
        module_path: impl AsRef<Path>,
        entry_point: &str,
        config: &GpuConfig,
    ) -> Result<Self> {
        let module = KernelModule::load(module_path)?;
        let entry_point = module.entry_point(entry_point)?;
        let gpu = GpuDevice::new_blocking(config)?;
        Self::build(gpu, module, entry_point)
    }

    /// Build a context on a device the caller already acquired.
    pub fn with_device(
        gpu: GpuDevice,
        module_path: impl AsRef<Path>,
        entry_point: &str,
    ) -> Result<Self> {
        let module = KernelModule::load(module_path)?;
        let entry_point = module.entry_point(entry_point)?;
        Self::build(gpu, module, entry_point)
    }

    fn build(gpu: GpuDevice, module: KernelModule, entry_point: EntryPoint) -> Result<Self> {
        let path = module.path().to_path_buf();
        let device = &gpu.device;

        device.push_error_scope(ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&entry_point.name),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module.into_naga())),
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::ModuleLoad {
                path,
                reason: e.to_string(),
            });
        }

        device.push_error_scope(ErrorFilter::Validation);
        // No explicit layout: wgpu derives bind group 0 from the bindings
        // the entry point actually uses.
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&entry_point.name),
            layout: None,
            module: &shader,
            entry_point: Some(&entry_point.name),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::PipelineBuild(e.to_string()));
        }

        info!(
            "built pipeline for '{}' from {} (workgroup size {})",
            entry_point.name,
            path.display(),
            entry_point.workgroup_size
        );
        Ok(Self {
            gpu,
            entry_point,
            pipeline,
            bindings: BTreeMap::new(),
        })
    }

    /// Bind `buffer` at `offset` bytes to argument slot `slot` for the
    /// next dispatch, replacing whatever the slot held before.
    ///
    /// Nothing is checked against the kernel's declared bindings here; a
    /// mismatch is reported by [`Context::dispatch`].
    pub fn bind_buffer(&mut self, buffer: &Buffer, offset: BufferAddress, slot: u32) {
        debug!(
            "binding {}-byte buffer at offset {offset} to slot {slot}",
            buffer.capacity()
        );
        self.bindings.insert(
            slot,
            Binding {
                buffer: buffer.raw().clone(),
                offset,
            },
        );
    }

    /// Forget every slot binding.
    pub fn clear_bindings(&mut self) {
        self.bindings.clear();
    }

    /// Dispatch `grid` workgroups of `block` invocations each, and block
    /// until the device has finished.
    ///
    /// `block` must equal the entry point's compiled workgroup size.
    /// Whether `grid` times `block` covers the data is the caller's
    /// concern; kernels are expected to bounds-check their invocation id.
    pub fn dispatch(&self, grid: Dim3, block: Dim3) -> Result<()> {
        let declared = self.entry_point.workgroup_size;
        if block != declared {
            return Err(Error::WorkgroupSizeMismatch {
                declared,
                requested: block,
            });
        }
        debug!(
            "dispatching '{}': grid {grid} x block {block} = {} invocations, {} binding(s)",
            self.entry_point.name,
            grid.volume() * block.volume(),
            self.bindings.len()
        );

        let device = &self.gpu.device;
        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.push_error_scope(ErrorFilter::Validation);

        let entries: Vec<wgpu::BindGroupEntry> = self
            .bindings
            .iter()
            .map(|(&slot, binding)| wgpu::BindGroupEntry {
                binding: slot,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &binding.buffer,
                    offset: binding.offset,
                    size: None,
                }),
            })
            .collect();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kernel_arguments"),
            layout: &self.pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("kernel_dispatch"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&self.entry_point.name),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(grid.x, grid.y, grid.z);
        }
        self.gpu.queue.submit([encoder.finish()]);
        let waited = self.gpu.wait_idle();

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(e) = validation.or(out_of_memory) {
            return Err(Error::KernelExecution(e.to_string()));
        }
        waited.map_err(|e| Error::KernelExecution(e.to_string()))?;
        debug!("'{}' completed", self.entry_point.name);
        Ok(())
    }

    /// The device this context dispatches on.  Buffers for this context
    /// must be created on it.
    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point.name
    }

    /// The block shape every dispatch must use.
    pub fn workgroup_size(&self) -> Dim3 {
        self.entry_point.workgroup_size
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.gpu.adapter_info()
    }
}

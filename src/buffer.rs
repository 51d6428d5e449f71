//! Host/device shared buffers.
//!
//! A [`Buffer`] pairs a storage allocation on the device with a host
//! mirror of the same bytes.  Host writes land in the mirror and are
//! published to the device one modified range at a time, the same
//! contract as a managed buffer on APIs where host and device memory are
//! not implicitly coherent.  Reading [`Buffer::contents`] synchronises
//! the mirror from the device through a `MAP_READ` staging buffer.

use std::ops::Range;

use bytemuck::{cast_slice, Pod};
use futures::channel::oneshot;
use log::debug;
use wgpu::{BufferAddress, BufferDescriptor, BufferUsages, COPY_BUFFER_ALIGNMENT};

use crate::context::Context;
use crate::device::GpuDevice;
use crate::error::{Error, Result};

/// A fixed-capacity block of memory visible to both host and device.
pub struct Buffer {
    gpu: GpuDevice,
    raw: wgpu::Buffer,
    staging: wgpu::Buffer,
    /// Host mirror, padded to the copy alignment like the device side.
    host: Vec<u8>,
    capacity: u64,
}

/// Round `size` up to wgpu's copy alignment, never returning zero.
fn aligned_size(size: u64) -> u64 {
    size.max(1).div_ceil(COPY_BUFFER_ALIGNMENT) * COPY_BUFFER_ALIGNMENT
}

impl Buffer {
    /// Allocate `size_bytes` on the device behind `context`.
    ///
    /// Allocation failure is not recoverable: wgpu's default error handler
    /// panics.
    pub fn new(context: &Context, size_bytes: u64) -> Self {
        Self::with_device(context.device(), size_bytes)
    }

    /// Allocate `size_bytes` on `gpu` without going through a context.
    pub fn with_device(gpu: &GpuDevice, size_bytes: u64) -> Self {
        let padded = aligned_size(size_bytes);
        // Storage and uniform so the same buffer can back either kind of
        // kernel argument.
        let raw = gpu.device.create_buffer(&BufferDescriptor {
            label: Some("kernel_buffer"),
            size: padded,
            usage: BufferUsages::STORAGE
                | BufferUsages::UNIFORM
                | BufferUsages::COPY_DST
                | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = gpu.device.create_buffer(&BufferDescriptor {
            label: Some("kernel_buffer_readback"),
            size: padded,
            usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        debug!("allocated {size_bytes}-byte buffer ({padded} bytes on device)");
        Self {
            gpu: gpu.clone(),
            raw,
            staging,
            host: vec![0; padded as usize],
            capacity: size_bytes,
        }
    }

    /// Number of bytes the buffer was created with.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Copy `source` into the start of the buffer and publish it to the
    /// device.
    ///
    /// Fails without writing anything if `source` is larger than the
    /// buffer.
    pub fn fill(&mut self, source: &[u8]) -> Result<()> {
        let requested = source.len() as u64;
        if requested > self.capacity {
            return Err(Error::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }
        self.host[..source.len()].copy_from_slice(source);
        self.did_modify_range(0..requested)
    }

    /// Typed variant of [`Buffer::fill`].
    pub fn fill_from<T: Pod>(&mut self, source: &[T]) -> Result<()> {
        self.fill(cast_slice(source))
    }

    /// Publish host writes in `range` to device memory.
    ///
    /// Needed after writing through [`Buffer::contents`]; [`Buffer::fill`]
    /// calls it itself.  Only the bytes in `range` change on the device:
    /// when the range does not sit on 4-byte boundaries, the partial words
    /// at either end are first refreshed from device memory.
    pub fn did_modify_range(&mut self, range: Range<BufferAddress>) -> Result<()> {
        if range.end > self.capacity || range.start > range.end {
            return Err(Error::CapacityExceeded {
                requested: range.end,
                capacity: self.capacity,
            });
        }
        if range.is_empty() {
            return Ok(());
        }
        // write_buffer wants aligned offsets and lengths.
        let start = range.start / COPY_BUFFER_ALIGNMENT * COPY_BUFFER_ALIGNMENT;
        let end = aligned_size(range.end);
        if start != range.start || end != range.end {
            let device = self.read_device()?;
            let (start, end) = (start as usize, end as usize);
            let (first, last) = (range.start as usize, range.end as usize);
            self.host[start..first].copy_from_slice(&device[start..first]);
            self.host[last..end].copy_from_slice(&device[last..end]);
        }
        self.gpu
            .queue
            .write_buffer(&self.raw, start, &self.host[start as usize..end as usize]);
        debug!("published bytes {start}..{end} to device");
        Ok(())
    }

    /// Synchronise from the device and return a read/write view of the
    /// buffer's bytes.
    ///
    /// Writes through the view stay on the host until
    /// [`Buffer::did_modify_range`] is called.  Every call re-reads the
    /// device, so unpublished writes from an earlier view are discarded.
    pub fn contents(&mut self) -> Result<&mut [u8]> {
        self.host = self.read_device()?;
        Ok(&mut self.host[..self.capacity as usize])
    }

    /// Copy the contents out as `T`s.  Trailing bytes that do not make up
    /// a whole `T` are dropped.  Zero-sized `T`s read as an empty vector.
    pub fn read_as<T: Pod>(&mut self) -> Result<Vec<T>> {
        let element = std::mem::size_of::<T>();
        if element == 0 {
            return Ok(Vec::new());
        }
        let whole = self.capacity as usize / element * element;
        let bytes = &self.contents()?[..whole];
        Ok(bytemuck::pod_collect_to_vec(bytes))
    }

    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    /// Copy the whole padded device allocation back to the host.
    fn read_device(&self) -> Result<Vec<u8>> {
        let size = self.host.len() as BufferAddress;
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kernel_buffer_readback"),
            });
        encoder.copy_buffer_to_buffer(&self.raw, 0, &self.staging, 0, size);
        self.gpu.queue.submit([encoder.finish()]);

        let slice = self.staging.slice(..);
        let (tx, rx) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.gpu
            .wait_idle()
            .map_err(|e| Error::KernelExecution(e.to_string()))?;
        // The callback has run once the device is idle, so a dropped sender
        // means the map was abandoned.
        pollster::block_on(rx)
            .map_err(|_| Error::Readback(wgpu::BufferAsyncError))??;

        let mapped = slice.get_mapped_range();
        let bytes = mapped.to_vec();
        drop(mapped);
        self.staging.unmap();
        debug!("read back {size} bytes from device");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_size_rounds_to_copy_alignment() {
        assert_eq!(aligned_size(0), 4);
        assert_eq!(aligned_size(1), 4);
        assert_eq!(aligned_size(4), 4);
        assert_eq!(aligned_size(13), 16);
        assert_eq!(aligned_size(36), 36);
    }
}

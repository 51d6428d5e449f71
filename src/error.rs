//! Error types for kernel loading, dispatch and buffer transfer.

use std::path::PathBuf;

use thiserror::Error;

use crate::dim::Dim3;

/// Specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between loading a kernel module and
/// reading results back to the host.
#[derive(Debug, Error)]
pub enum Error {
    /// The kernel module could not be read, parsed or accepted by the device.
    #[error("failed to load kernel module {path}: {reason}")]
    ModuleLoad { path: PathBuf, reason: String },

    /// The module has no compute entry point with the requested name.
    #[error("function '{entry_point}' not found in kernel module {path}")]
    FunctionNotFound { entry_point: String, path: PathBuf },

    /// The device rejected the compute pipeline.
    #[error("failed to build compute pipeline: {0}")]
    PipelineBuild(String),

    /// The device reported a failure while encoding or executing a dispatch.
    #[error("kernel execution failed: {0}")]
    KernelExecution(String),

    /// A host write would run past the end of a buffer.
    #[error("{requested} bytes do not fit in a buffer of {capacity} bytes")]
    CapacityExceeded { requested: u64, capacity: u64 },

    /// The block shape passed to a dispatch differs from the kernel's
    /// compiled `@workgroup_size`.
    #[error("block shape {requested} does not match the kernel workgroup size {declared}")]
    WorkgroupSizeMismatch { declared: Dim3, requested: Dim3 },

    /// No adapter or device could be acquired.
    #[error("GPU initialization failed: {0}")]
    DeviceInit(String),

    /// Mapping a staging buffer for readback failed.
    #[error("buffer readback failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),
}

//! Matrix multiplication on the GPU through a small resource-owning layer
//! over [wgpu](https://github.com/gfx-rs/wgpu).
//!
//! A [`Context`] loads a kernel module (WGSL or SPIR-V) from disk, builds
//! the pipeline for one compute entry point and owns the device it runs
//! on.  [`Buffer`]s hold the data: fill them from the host, bind them to
//! the context's argument slots, dispatch, then read the output back.
//! Every call is synchronous and blocks until the GPU is done.
//!
//! ```no_run
//! use gpu_matmul::{Buffer, Context, Dim3};
//!
//! # fn main() -> gpu_matmul::Result<()> {
//! let n = 2u32;
//! let mut context = Context::new("kernels/matmul.wgsl", "device_matrix_multiply")?;
//! let bytes = (n * n) as u64 * 4;
//! let mut a = Buffer::new(&context, bytes);
//! let mut b = Buffer::new(&context, bytes);
//! let mut c = Buffer::new(&context, bytes);
//! let mut width = Buffer::new(&context, 4);
//! a.fill_from(&[1.0f32; 4])?;
//! b.fill_from(&[2.0f32; 4])?;
//! width.fill_from(&[n])?;
//!
//! for (slot, buffer) in [&a, &b, &c, &width].into_iter().enumerate() {
//!     context.bind_buffer(buffer, 0, slot as u32);
//! }
//! let block = context.workgroup_size();
//! context.dispatch(Dim3::covering(Dim3::xy(n, n), block), block)?;
//! assert_eq!(c.read_as::<f32>()?, vec![4.0; 4]);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod compute;
pub mod config;
pub mod context;
pub mod device;
pub mod dim;
pub mod error;
pub mod kernel;
pub mod matrix;

pub use buffer::Buffer;
pub use compute::{multiply_on_device, MatmulBuffers};
pub use config::GpuConfig;
pub use context::Context;
pub use device::GpuDevice;
pub use dim::Dim3;
pub use error::{Error, Result};
pub use kernel::{EntryPoint, KernelModule, ModuleFormat};

//! Matrix multiplication on top of [`Context`] and [`Buffer`].
//!
//! The kernel contract is four slots in bind group 0: the two inputs,
//! the output and the matrix width as a `u32`.

use log::debug;

use crate::buffer::Buffer;
use crate::context::Context;
use crate::dim::Dim3;
use crate::error::Result;

pub const SLOT_A: u32 = 0;
pub const SLOT_B: u32 = 1;
pub const SLOT_OUT: u32 = 2;
pub const SLOT_WIDTH: u32 = 3;

/// The four buffers an `n`×`n` multiply needs.
pub struct MatmulBuffers {
    pub n: u32,
    pub a: Buffer,
    pub b: Buffer,
    pub out: Buffer,
    pub width: Buffer,
}

impl MatmulBuffers {
    /// Allocate buffers for `n`×`n` `f32` matrices and record `n` in the
    /// width buffer.
    pub fn new(context: &Context, n: u32) -> Result<Self> {
        let matrix_bytes = n as u64 * n as u64 * std::mem::size_of::<f32>() as u64;
        let mut width = Buffer::new(context, std::mem::size_of::<u32>() as u64);
        width.fill_from(&[n])?;
        Ok(Self {
            n,
            a: Buffer::new(context, matrix_bytes),
            b: Buffer::new(context, matrix_bytes),
            out: Buffer::new(context, matrix_bytes),
            width,
        })
    }

    /// Copy both operands to the device.
    pub fn upload(&mut self, a: &[f32], b: &[f32]) -> Result<()> {
        self.a.fill_from(a)?;
        self.b.fill_from(b)
    }

    /// Bind all four buffers to their slots on `context`.
    pub fn bind(&self, context: &mut Context) {
        context.bind_buffer(&self.a, 0, SLOT_A);
        context.bind_buffer(&self.b, 0, SLOT_B);
        context.bind_buffer(&self.out, 0, SLOT_OUT);
        context.bind_buffer(&self.width, 0, SLOT_WIDTH);
    }

    /// The grid that covers every output element with the context's
    /// workgroup size.  `x` walks columns and `y` walks rows.
    pub fn grid(&self, context: &Context) -> Dim3 {
        Dim3::covering(Dim3::xy(self.n, self.n), context.workgroup_size())
    }

    /// Dispatch over [`MatmulBuffers::grid`] and read the product back.
    pub fn run(&mut self, context: &Context) -> Result<Vec<f32>> {
        let block = context.workgroup_size();
        context.dispatch(self.grid(context), block)?;
        self.out.read_as::<f32>()
    }
}

/// Multiply two `n`×`n` row-major matrices on the device behind
/// `context`, which must be built from a kernel following the slot
/// layout above.
pub fn multiply_on_device(context: &mut Context, a: &[f32], b: &[f32], n: u32) -> Result<Vec<f32>> {
    debug!("multiplying {n}x{n} matrices on '{}'", context.entry_point());
    let mut buffers = MatmulBuffers::new(context, n)?;
    buffers.upload(a, b)?;
    buffers.bind(context);
    buffers.run(context)
}

//! Square matrix multiplication on the GPU versus the host at growing N.
//!
//! Run with:
//!
//! ```sh
//! cargo run --release --example matmul_scaling
//! ```
//!
//! For small matrices the host loop wins because submission and transfer
//! overhead dominate.  The O(N^3) arithmetic grows much faster than the
//! O(N^2) transfer, so the device pulls ahead as N increases.

use std::time::Instant;

use gpu_matmul::{matrix, Context, MatmulBuffers};

fn main() -> gpu_matmul::Result<()> {
    env_logger::init();
    let mut context = Context::new("kernels/matmul.wgsl", "device_matrix_multiply")?;
    let info = context.adapter_info();
    println!("Square matrix multiplication (N×N) on {} vs host", info.name);

    for n in [32u32, 64, 128, 256, 512] {
        let size = n as usize;
        let a = matrix::populate_matrix(size);
        let b = matrix::populate_matrix(size);

        let start = Instant::now();
        let host = matrix::host_matrix_multiply(&a, &b, size);
        let host_time = start.elapsed();

        let start = Instant::now();
        let mut buffers = MatmulBuffers::new(&context, n)?;
        buffers.upload(&a, &b)?;
        buffers.bind(&mut context);
        let device = buffers.run(&context)?;
        let device_time = start.elapsed();

        let verdict = if matrix::compare_matrices(&device, &host) {
            "match"
        } else {
            "MISMATCH"
        };
        println!("N = {n:>3}: host = {host_time:?}, device = {device_time:?} ({verdict})");
    }
    Ok(())
}

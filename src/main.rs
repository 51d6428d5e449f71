//! Multiply two random square matrices on the GPU and on the host, then
//! report whether the results agree.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use gpu_matmul::{matrix, Context, GpuConfig, MatmulBuffers};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Power {
    Low,
    High,
}

#[derive(Parser)]
#[command(name = "gpu_matmul")]
#[command(about = "Compare GPU and host matrix multiplication", long_about = None)]
#[command(version)]
struct Cli {
    /// Matrix dimension N (matrices are N×N)
    #[arg(short = 'n', long, default_value_t = 3)]
    size: u32,

    /// Path to the kernel module (WGSL or SPIR-V)
    #[arg(short, long, default_value = "kernels/matmul.wgsl")]
    kernel: PathBuf,

    /// Compute entry point inside the kernel module
    #[arg(short, long, default_value = "device_matrix_multiply")]
    entry: String,

    /// Seed for the random operands (random every run when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the operands and both products
    #[arg(long)]
    print: bool,

    /// Print host and device timings
    #[arg(long)]
    timing: bool,

    /// Adapter power preference (overrides WGPU_POWER_PREF)
    #[arg(long, value_enum)]
    power: Option<Power>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = GpuConfig::from_env();
    if let Some(power) = cli.power {
        config = config.with_power_preference(match power {
            Power::Low => wgpu::PowerPreference::LowPower,
            Power::High => wgpu::PowerPreference::HighPerformance,
        });
    }

    let n = cli.size as usize;
    let (a, b) = match cli.seed {
        Some(seed) => (
            matrix::populate_matrix_seeded(n, seed),
            matrix::populate_matrix_seeded(n, seed.wrapping_add(1)),
        ),
        None => (matrix::populate_matrix(n), matrix::populate_matrix(n)),
    };

    let mut context = Context::with_config(&cli.kernel, &cli.entry, &config)
        .with_context(|| format!("failed to set up kernel '{}'", cli.entry))?;

    let start = Instant::now();
    let mut buffers = MatmulBuffers::new(&context, cli.size)?;
    buffers.upload(&a, &b)?;
    buffers.bind(&mut context);
    let device_result = buffers.run(&context).context("device multiply failed")?;
    let device_time = start.elapsed();

    let start = Instant::now();
    let host_result = matrix::host_matrix_multiply(&a, &b, n);
    let host_time = start.elapsed();

    if cli.print {
        println!("A:");
        matrix::print_matrix(&a, n);
        println!("B:");
        matrix::print_matrix(&b, n);
        println!("Device A x B:");
        matrix::print_matrix(&device_result, n);
        println!("Host A x B:");
        matrix::print_matrix(&host_result, n);
    }

    if matrix::compare_matrices(&device_result, &host_result) {
        println!("Matrix multiplication matches");
    } else {
        println!("Matrix multiplication does not match");
    }
    if cli.timing {
        println!("N = {n}: host = {host_time:?}, device = {device_time:?}");
    }
    Ok(())
}

//! End-to-end tests that dispatch on a real adapter.
//!
//! Run with `cargo test -- --ignored` on a machine with a GPU.

use std::io::Write;
use std::path::PathBuf;

use gpu_matmul::{matrix, multiply_on_device, Buffer, Context, Dim3, Error, MatmulBuffers};

fn matmul_context() -> Context {
    let kernel = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("kernels/matmul.wgsl");
    Context::new(kernel, "device_matrix_multiply").expect("context should build on a GPU")
}

fn write_kernel(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".wgsl").tempfile().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

const FILL_NINES: &str = r#"
@group(0) @binding(0)
var<storage, read_write> out: array<u32>;

@compute @workgroup_size(1)
fn fill_nines(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x < arrayLength(&out)) {
        out[id.x] = 0x09090909u;
    }
}
"#;

#[test]
#[ignore = "requires a GPU adapter"]
fn ones_times_twos_matches_host() {
    let mut context = matmul_context();
    let a = vec![1.0f32; 4];
    let b = vec![2.0f32; 4];

    let device = multiply_on_device(&mut context, &a, &b, 2).expect("dispatch should succeed");
    let host = matrix::host_matrix_multiply(&a, &b, 2);

    assert_eq!(device, vec![4.0; 4]);
    assert_eq!(host, vec![4.0; 4]);
    assert!(matrix::compare_matrices(&device, &host));
}

#[test]
#[ignore = "requires a GPU adapter"]
fn random_matrices_match_host_for_several_sizes() {
    let mut context = matmul_context();
    for (n, seed) in [(1u32, 1u64), (3, 2), (8, 3), (17, 4), (64, 5)] {
        let size = n as usize;
        let a = matrix::populate_matrix_seeded(size, seed);
        let b = matrix::populate_matrix_seeded(size, seed + 100);
        let device = multiply_on_device(&mut context, &a, &b, n).unwrap();
        let host = matrix::host_matrix_multiply(&a, &b, size);
        assert!(matrix::compare_matrices(&device, &host), "mismatch for n = {n}");
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn overfilling_a_buffer_fails_and_leaves_it_untouched() {
    let context = matmul_context();
    let mut buffer = Buffer::new(&context, 16);

    let err = buffer.fill(&[0xAB; 32]).unwrap_err();
    assert!(
        matches!(err, Error::CapacityExceeded { requested: 32, capacity: 16 }),
        "got {err:?}"
    );
    assert_eq!(buffer.contents().unwrap(), &[0u8; 16][..]);

    buffer.fill(&[7; 16]).unwrap();
    assert!(buffer.fill(&[1; 17]).is_err());
    assert_eq!(buffer.contents().unwrap(), &[7u8; 16][..]);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn writes_through_contents_reach_the_device_after_did_modify_range() {
    let context = matmul_context();
    let mut buffer = Buffer::new(&context, 8);
    buffer.fill_from(&[1u32, 2]).unwrap();

    buffer.contents().unwrap()[4..8].copy_from_slice(&9u32.to_ne_bytes());
    buffer.did_modify_range(4..8).unwrap();
    assert_eq!(buffer.read_as::<u32>().unwrap(), vec![1, 9]);

    assert!(matches!(
        buffer.did_modify_range(4..12),
        Err(Error::CapacityExceeded { .. })
    ));
}

#[test]
#[ignore = "requires a GPU adapter"]
fn mismatched_block_shape_is_rejected_before_submission() {
    let context = matmul_context();
    let err = context
        .dispatch(Dim3::xy(1, 1), Dim3::xy(3, 3))
        .unwrap_err();
    assert!(
        matches!(err, Error::WorkgroupSizeMismatch { declared, .. } if declared == Dim3::new(8, 8, 1)),
        "got {err:?}"
    );
}

#[test]
#[ignore = "requires a GPU adapter"]
fn missing_binding_surfaces_as_kernel_execution_error() {
    let mut context = matmul_context();
    let mut buffers = MatmulBuffers::new(&context, 2).unwrap();
    buffers.upload(&[1.0; 4], &[1.0; 4]).unwrap();
    buffers.bind(&mut context);
    context.clear_bindings();

    let block = context.workgroup_size();
    let err = context.dispatch(Dim3::xy(1, 1), block).unwrap_err();
    assert!(matches!(err, Error::KernelExecution(_)), "got {err:?}");
}

#[test]
#[ignore = "requires a GPU adapter"]
fn context_dispatches_repeatedly_with_rebound_inputs() {
    let mut context = matmul_context();
    let mut buffers = MatmulBuffers::new(&context, 2).unwrap();
    buffers.bind(&mut context);

    buffers.upload(&[1.0; 4], &[2.0; 4]).unwrap();
    assert_eq!(buffers.run(&context).unwrap(), vec![4.0; 4]);

    buffers.upload(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0]).unwrap();
    assert_eq!(buffers.run(&context).unwrap(), vec![19.0, 22.0, 43.0, 50.0]);

    // Swap the operands by rebinding slots instead of re-uploading.
    context.bind_buffer(&buffers.b, 0, gpu_matmul::compute::SLOT_A);
    context.bind_buffer(&buffers.a, 0, gpu_matmul::compute::SLOT_B);
    assert_eq!(buffers.run(&context).unwrap(), vec![23.0, 34.0, 31.0, 46.0]);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn partial_fill_keeps_device_bytes_past_the_source() {
    let kernel = write_kernel(FILL_NINES);
    let mut context = Context::new(kernel.path(), "fill_nines").unwrap();
    // Six bytes: the device allocation is padded to eight.
    let mut buffer = Buffer::new(&context, 6);
    context.bind_buffer(&buffer, 0, 0);
    context.dispatch(Dim3::new(2, 1, 1), Dim3::new(1, 1, 1)).unwrap();

    buffer.fill(&[1, 2]).unwrap();
    assert_eq!(buffer.contents().unwrap(), &[1u8, 2, 9, 9, 9, 9][..]);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn unaligned_modified_range_only_touches_its_own_bytes() {
    let kernel = write_kernel(FILL_NINES);
    let mut context = Context::new(kernel.path(), "fill_nines").unwrap();
    let mut buffer = Buffer::new(&context, 8);
    buffer.fill(&[0; 8]).unwrap();
    let view = buffer.contents().unwrap();
    view[3] = 5;
    view[4] = 6;

    // The kernel rewrites every byte before the host publishes 3..5.
    context.bind_buffer(&buffer, 0, 0);
    context.dispatch(Dim3::new(2, 1, 1), Dim3::new(1, 1, 1)).unwrap();
    buffer.did_modify_range(3..5).unwrap();

    assert_eq!(buffer.contents().unwrap(), &[9u8, 9, 9, 5, 6, 9, 9, 9][..]);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn oversized_workgroup_is_pipeline_build_error() {
    let kernel = write_kernel(
        r#"
@group(0) @binding(0)
var<storage, read_write> out: array<f32>;

@compute @workgroup_size(1024, 1024, 1)
fn too_wide(@builtin(global_invocation_id) id: vec3<u32>) {
    out[id.x] = 1.0;
}
"#,
    );
    match Context::new(kernel.path(), "too_wide") {
        Err(err) => assert!(matches!(err, Error::PipelineBuild(_)), "got {err:?}"),
        Ok(_) => panic!("expected PipelineBuild, got a context"),
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn zero_sized_elements_read_as_empty() {
    let context = matmul_context();
    let mut buffer = Buffer::new(&context, 16);
    assert!(buffer.read_as::<()>().unwrap().is_empty());
}

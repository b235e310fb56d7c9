//! GPU volume integration tests.
//!
//! These tests bake real fields on a GPU adapter (real or software fallback)
//! and check them against the CPU evaluator. Without an adapter they print a
//! note and return early.

use meshfield::*;
use meshfield_render::{RenderError, KERNEL_PATH};

/// Helper: check that a pixel buffer is not all-black and not uniform.
fn has_nontrivial_content(pixels: &[u8], width: u32, height: u32) -> bool {
    let total = (width * height) as usize;
    assert_eq!(pixels.len(), total * 4, "pixel buffer size mismatch");

    let all_black = pixels
        .chunks(4)
        .all(|px| px[0] == 0 && px[1] == 0 && px[2] == 0);

    let first = &pixels[0..4];
    let all_uniform = pixels.chunks(4).all(|px| px == first);

    !all_black && !all_uniform
}

/// An axis-aligned box between `min` and `max`, offset away from the origin.
fn shifted_box(min: Vec3, max: Vec3) -> Model {
    let cube = Model::unit_cube();
    let extent = max - min;
    let meshes = cube
        .meshes
        .iter()
        .map(|mesh| {
            let vertices = mesh
                .vertices
                .iter()
                .map(|v| Vertex::new(min + v.position * extent, v.normal))
                .collect();
            SubMesh::new(vertices, mesh.indices.clone())
        })
        .collect();
    Model::new(meshes)
}

/// All GPU checks share one context; a single test keeps adapter setup to
/// one attempt per run.
#[test]
fn gpu_volume_tests() {
    init_logging();

    let ctx = match create_context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping GPU volume tests: no GPU adapter available ({e})");
            return;
        }
    };

    // --- Test 1: Cube field matches the CPU evaluator ---
    {
        let options = VolumeOptions::default().with_grid_size(32);
        let volume = Volume::new(&ctx, Model::unit_cube(), options).expect("bake cube");
        assert_eq!(volume.sample_count(), 36);

        let gpu = volume.read_back_field(&ctx).expect("read back");
        let cpu = volume.reference_field().expect("reference");
        let diff = gpu.max_abs_difference(&cpu).expect("same grid");
        assert!(diff < 1e-2, "GPU and CPU fields differ by {diff}");

        // Centre voxel sits ~0.48 inside every face.
        let centre = gpu.distance(UVec3::splat(15));
        assert!(centre < 0.0, "centre should be inside, got {centre}");
        assert!((centre.abs() - 0.484).abs() < 0.02, "centre |d| = {}", centre.abs());

        // Corner voxels are inside too, close to three faces. The far
        // corner sits in the last depth slice of the texture.
        for voxel in [UVec3::ZERO, UVec3::splat(31)] {
            let corner = gpu.distance(voxel);
            assert!(corner < 0.0, "voxel {voxel} should be inside, got {corner}");
            assert!(corner.abs() < 0.05, "voxel {voxel}: |d| = {}", corner.abs());
        }

        // Every depth slice holds a written field, not the zero fill.
        for z in 0..32 {
            let d = gpu.distance(UVec3::new(15, 15, z));
            assert!(d.abs() > 1e-3, "slice {z} was never written");
        }
    }

    // --- Test 2: Unsigned mode never stores a negative distance ---
    {
        let options = VolumeOptions::default()
            .with_grid_size(16)
            .with_sign_mode(SignMode::Unsigned);
        let volume = Volume::new(&ctx, Model::unit_cube(), options).expect("bake unsigned");
        let field = volume.read_back_field(&ctx).expect("read back");
        assert!(field.min_distance() >= 0.0);
    }

    // --- Test 3: Sample-distance mode agrees with its CPU counterpart ---
    {
        let options = VolumeOptions::default()
            .with_grid_size(16)
            .with_distance_mode(DistanceMode::NearestSample);
        let volume = Volume::new(&ctx, Model::unit_cube(), options).expect("bake samples");
        let gpu = volume.read_back_field(&ctx).expect("read back");
        let cpu = volume.reference_field().expect("reference");
        assert!(gpu.max_abs_difference(&cpu).expect("same grid") < 1e-2);
    }

    // --- Test 4: Bounds follow the mesh, not the origin ---
    {
        let model = shifted_box(Vec3::new(2.0, -1.0, 5.0), Vec3::new(4.0, 1.0, 6.0));
        let volume = Volume::new(&ctx, model, VolumeOptions::default().with_grid_size(16))
            .expect("bake shifted box");
        assert_eq!(volume.aabb().min(), Vec3::new(2.0, -1.0, 5.0));
        assert_eq!(volume.aabb().max(), Vec3::new(4.0, 1.0, 6.0));

        let gpu = volume.read_back_field(&ctx).expect("read back");
        let cpu = volume.reference_field().expect("reference");
        assert!(gpu.max_abs_difference(&cpu).expect("same grid") < 2e-2);
    }

    // --- Test 5: Invalid input fails before any dispatch ---
    {
        let empty = Model::new(vec![SubMesh::new(Vec::new(), Vec::new())]);
        assert!(matches!(
            Volume::new(&ctx, empty, VolumeOptions::default()),
            Err(MeshfieldError::EmptyMesh)
        ));

        let misaligned = VolumeOptions::default().with_grid_size(30);
        assert!(matches!(
            Volume::new(&ctx, Model::unit_cube(), misaligned),
            Err(MeshfieldError::InvalidBlockEdge { .. })
        ));
    }

    // --- Test 6: Ray-marched image shows the surface ---
    {
        let volume = Volume::new(&ctx, Model::unit_cube(), VolumeOptions::default().with_grid_size(32))
            .expect("bake cube");
        let pixels = render_to_image(&ctx, &volume, 128, 96).expect("render");
        assert!(
            has_nontrivial_content(&pixels, 128, 96),
            "ray-marched cube should differ from the background"
        );
    }

    // --- Test 7: Full precision matches the CPU evaluator ---
    if ctx
        .device
        .features()
        .contains(wgpu::Features::FLOAT32_FILTERABLE)
    {
        let options = VolumeOptions::default()
            .with_grid_size(16)
            .with_precision(FieldPrecision::Full);
        let volume = Volume::new(&ctx, Model::unit_cube(), options).expect("bake full");
        let gpu = volume.read_back_field(&ctx).expect("read back");
        let cpu = volume.reference_field().expect("reference");
        assert!(gpu.max_abs_difference(&cpu).expect("same grid") < 1e-3);
    }

    // --- Test 8: Half precision refuses distances it cannot store ---
    {
        let model = shifted_box(Vec3::ZERO, Vec3::new(2.0e5, 1.0, 1.0));
        match Volume::new(&ctx, model, VolumeOptions::default().with_grid_size(16)) {
            Err(MeshfieldError::Render(msg)) => {
                assert!(msg.contains("Half precision"), "unexpected message: {msg}");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("a 2e5-long box must not bake at half precision"),
        }
    }

    // --- Test 9: Non-finite vertices are rejected ---
    {
        let mut model = Model::unit_cube();
        model.meshes[0].vertices[4].position.x = f32::NAN;
        assert!(matches!(
            Volume::new(&ctx, model, VolumeOptions::default()),
            Err(MeshfieldError::NonFinitePosition { sub_mesh: 0, vertex: 4 })
        ));
    }

    // --- Test 10: Kernel source problems surface as errors ---
    {
        let mut empty = ShaderLibrary::new();
        match Volume::with_library(&ctx, Model::unit_cube(), VolumeOptions::default(), &mut empty) {
            Err(MeshfieldError::ShaderNotFound(path)) => assert_eq!(path, KERNEL_PATH),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("bake without a kernel source succeeded"),
        }

        let mut broken = builtin_library();
        broken.register(KERNEL_PATH, "this is not wgsl");
        match Volume::with_library(&ctx, Model::unit_cube(), VolumeOptions::default(), &mut broken) {
            Err(MeshfieldError::Render(msg)) => {
                assert!(msg.contains("shader compilation failed"), "unexpected message: {msg}");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("bake with an invalid kernel succeeded"),
        }
    }

    // --- Test 11: Failed allocations are returned, not raised ---
    {
        let size = ctx.device.limits().max_buffer_size.saturating_add(4);
        let result = ctx.scoped(RenderError::BufferCreationFailed, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("oversized buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        assert!(
            matches!(result, Err(RenderError::BufferCreationFailed(_))),
            "oversized buffer was not reported: {result:?}"
        );
    }
}

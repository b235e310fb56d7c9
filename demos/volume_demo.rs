#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
//! Bakes a mesh into a distance field volume and ray-marches it to a PNG.
//!
//! Usage: `cargo run --example volume_demo -- [mesh.obj] [options.json] [out.png]`
//!
//! Without a mesh the demo bakes a unit cube. Options default to
//! `VolumeOptions::default()`.

use meshfield::*;

/// Load an OBJ file as one sub-mesh per object.
///
/// Objects without normals get area-weighted vertex normals.
fn load_obj(path: &str) -> Model {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .expect("Failed to load OBJ file");

    let meshes = models
        .into_iter()
        .map(|model| {
            let mesh = model.mesh;
            let positions: Vec<Vec3> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();

            if mesh.normals.len() == mesh.positions.len() {
                let vertices = positions
                    .iter()
                    .zip(mesh.normals.chunks_exact(3))
                    .map(|(&p, n)| Vertex::new(p, Vec3::new(n[0], n[1], n[2])))
                    .collect();
                SubMesh::new(vertices, mesh.indices)
            } else {
                let triangles: Vec<[u32; 3]> = mesh
                    .indices
                    .chunks_exact(3)
                    .map(|t| [t[0], t[1], t[2]])
                    .collect();
                SubMesh::from_triangles(&positions, &triangles)
            }
        })
        .collect();

    Model::new(meshes)
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let model = match args.first() {
        Some(path) => load_obj(path),
        None => Model::unit_cube(),
    };
    let options = match args.get(1) {
        Some(path) => VolumeOptions::from_json_file(path)?,
        None => VolumeOptions::default(),
    };
    let output = args.get(2).map_or("volume_demo.png", String::as_str);

    println!(
        "Baking {} triangles into a {}^3 field",
        model.num_triangles(),
        options.grid_size
    );

    let ctx = create_context()?;
    let volume = Volume::new(&ctx, model, options)?;

    let field = volume.read_back_field(&ctx)?;
    let reference = volume.reference_field()?;
    let diff = field.max_abs_difference(&reference).unwrap_or(f32::NAN);
    println!(
        "Field range [{:.4}, {:.4}], max |GPU - CPU| = {diff:.2e}",
        field.min_distance(),
        field.max_distance()
    );

    let closest = field.argmin();
    println!(
        "Voxel closest to the surface: {closest} at {}",
        volume.grid().voxel_center(closest)
    );

    render_to_file(&ctx, &volume, output, 800, 600)?;
    println!("Saved {output}");

    Ok(())
}

//! Built-in WGSL sources and shader module creation.

use meshfield_core::ShaderLibrary;

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// Resource path of the distance field kernel.
pub const KERNEL_PATH: &str = "shaders/sdf_kernel.wgsl";

/// Resource path of the ray-march shader.
pub const RAYMARCH_PATH: &str = "shaders/volume_raymarch.wgsl";

const BUILTIN_SOURCES: [(&str, &str); 4] = [
    (KERNEL_PATH, include_str!("shaders/sdf_kernel.wgsl")),
    (RAYMARCH_PATH, include_str!("shaders/volume_raymarch.wgsl")),
    (
        "shaders/common/grid.wgsl",
        include_str!("shaders/common/grid.wgsl"),
    ),
    (
        "shaders/common/distance.wgsl",
        include_str!("shaders/common/distance.wgsl"),
    ),
];

/// Returns a library preloaded with every built-in source.
#[must_use]
pub fn builtin_library() -> ShaderLibrary {
    let mut library = ShaderLibrary::new();
    for (path, source) in BUILTIN_SOURCES {
        library.register(path, source);
    }
    library
}

/// Compiles composed WGSL into a module, surfacing validation errors.
pub fn create_module(
    ctx: &GpuContext,
    label: &str,
    source: String,
) -> RenderResult<wgpu::ShaderModule> {
    ctx.scoped(RenderError::ShaderCompilationFailed, |device| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::kernel_constants;
    use meshfield_core::{FieldPrecision, VolumeOptions};

    #[test]
    fn test_kernel_composes_with_includes() {
        let mut library = builtin_library();
        let options = VolumeOptions::default().with_grid_size(64);
        let source = library
            .compose(KERNEL_PATH, &kernel_constants(&options))
            .unwrap();
        assert!(source.starts_with("const GRID_SIZE: u32 = 64u;"));
        assert!(!source.contains("#include"));
        assert_eq!(source.matches("struct GridUniforms").count(), 1);
        assert!(source.contains("fn closest_on_triangle"));
        assert!(source.contains("@compute"));
    }

    #[test]
    fn test_raymarch_composes() {
        let mut library = builtin_library();
        let source = library.compose(RAYMARCH_PATH, &[]).unwrap();
        assert!(source.contains("fn world_to_uvw"));
        assert!(source.contains("fn fs_main"));
        assert!(!source.contains("#include"));
    }

    #[test]
    fn test_kernel_writes_staging_buffer() {
        let mut library = builtin_library();
        let options = VolumeOptions::default()
            .with_grid_size(16)
            .with_precision(FieldPrecision::Full);
        let source = library
            .compose(KERNEL_PATH, &kernel_constants(&options))
            .unwrap();
        assert!(source.contains("const ROW_TEXELS: u32 = 16u;"));
        assert!(source.contains("const TEXEL_WORDS: u32 = 4u;"));
        assert!(source.contains("var<storage, read_write> field: array<u32>"));
        assert!(!source.contains("texture_storage_3d"));
    }
}

//! Named-parameter interface of a shading program.

use glam::Vec3;

use crate::volume_texture::VolumeTexture;

/// Box minimum corner (vec3).
pub const AABB_MIN: &str = "AABBMin";
/// Box maximum corner (vec3).
pub const AABB_MAX: &str = "AABBMax";
/// Voxels per axis (uint).
pub const GRID_SIZE: &str = "GridSize";
/// Sphere-tracing step budget (uint).
pub const MAX_STEPS: &str = "MaxSteps";
/// Hit threshold relative to the box diagonal (float).
pub const SURFACE_EPSILON: &str = "SurfaceEpsilon";
/// Distance field texture slot.
pub const FIELD: &str = "Field";

/// A scalar or vector shading parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadingValue {
    Float(f32),
    Uint(u32),
    Vec3(Vec3),
}

/// Something that accepts named parameters and a volume texture binding.
///
/// How the program behind it is compiled or laid out is up to the
/// implementor. Unknown names should be ignored with a warning.
pub trait ShadingStage {
    /// Sets a named float.
    fn set_float(&mut self, name: &str, value: f32);

    /// Sets a named unsigned integer.
    fn set_uint(&mut self, name: &str, value: u32);

    /// Sets a named 3-vector.
    fn set_vec3(&mut self, name: &str, value: Vec3);

    /// Binds a volume texture (and its sampler) to a named slot.
    fn bind_volume(&mut self, name: &str, volume: &VolumeTexture);

    /// Dispatches to the typed setter for `value`.
    fn set(&mut self, name: &str, value: ShadingValue) {
        match value {
            ShadingValue::Float(v) => self.set_float(name, v),
            ShadingValue::Uint(v) => self.set_uint(name, v),
            ShadingValue::Vec3(v) => self.set_vec3(name, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, ShadingValue)>,
    }

    impl ShadingStage for Recorder {
        fn set_float(&mut self, name: &str, value: f32) {
            self.calls.push((name.to_string(), ShadingValue::Float(value)));
        }
        fn set_uint(&mut self, name: &str, value: u32) {
            self.calls.push((name.to_string(), ShadingValue::Uint(value)));
        }
        fn set_vec3(&mut self, name: &str, value: Vec3) {
            self.calls.push((name.to_string(), ShadingValue::Vec3(value)));
        }
        fn bind_volume(&mut self, _name: &str, _volume: &VolumeTexture) {}
    }

    #[test]
    fn test_set_dispatches_by_type() {
        let mut stage = Recorder::default();
        stage.set(GRID_SIZE, ShadingValue::Uint(64));
        stage.set(AABB_MIN, ShadingValue::Vec3(Vec3::ONE));
        stage.set(SURFACE_EPSILON, ShadingValue::Float(0.5));
        assert_eq!(
            stage.calls,
            vec![
                ("GridSize".to_string(), ShadingValue::Uint(64)),
                ("AABBMin".to_string(), ShadingValue::Vec3(Vec3::ONE)),
                ("SurfaceEpsilon".to_string(), ShadingValue::Float(0.5)),
            ]
        );
    }
}

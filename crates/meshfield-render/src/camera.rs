//! Perspective camera framing a volume's bounding box.

use glam::{Mat4, Vec3};

const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

// Extra distance so the box does not touch the image border.
const FRAME_MARGIN: f32 = 1.1;

/// Camera uniforms for GPU.
/// Layout must match WGSL `CameraUniforms` exactly (96 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// World-space eye position (w = 1).
    pub camera_pos: [f32; 4],
    /// Direction light travels in (w = 0).
    pub light_dir: [f32; 4],
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 3.0, 1.0],
            light_dir: [0.0, 0.0, -1.0, 0.0],
        }
    }
}

/// A camera looking at the centre of a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    aspect_ratio: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Places the eye along `from` (pointing from the box towards the eye)
    /// far enough back that the whole box `[min, max]` is in view.
    #[must_use]
    pub fn framing(min: Vec3, max: Vec3, from: Vec3, aspect_ratio: f32) -> Self {
        let target = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);
        let from = from.try_normalize().unwrap_or(Vec3::Z);

        let aspect_ratio = aspect_ratio.max(1e-3);
        let half_fov_x = ((FOV_Y * 0.5).tan() * aspect_ratio).atan();
        let half_fov = (FOV_Y * 0.5).min(half_fov_x);
        let distance = radius / half_fov.sin() * FRAME_MARGIN;

        let up = if from.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };

        Self {
            eye: target + from * distance,
            target,
            up,
            aspect_ratio,
            near: (distance - radius) * 0.5,
            far: distance + radius * 2.0,
        }
    }

    /// Eye position.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Point looked at.
    #[must_use]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let projection = Mat4::perspective_rh(FOV_Y, self.aspect_ratio, self.near, self.far);
        projection * view
    }

    /// Packs the camera for upload, lighting along the view direction.
    #[must_use]
    pub fn uniforms(&self) -> CameraUniforms {
        let forward = (self.target - self.eye).normalize_or_zero();
        CameraUniforms {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            camera_pos: self.eye.extend(1.0).to_array(),
            light_dir: forward.extend(0.0).to_array(),
        }
    }
}

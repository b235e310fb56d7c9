//! Headless GPU context and device capability checks.

use meshfield_core::{Aabb, FieldPrecision, VolumeOptions};

use crate::error::{RenderError, RenderResult};
use crate::volume_texture::field_staging_bytes;

/// Device, queue and the adapter they came from.
pub struct GpuContext {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a context without a surface.
    ///
    /// Compute limits are raised to what the adapter offers, and
    /// `FLOAT32_FILTERABLE` is enabled when present.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let required_features = adapter.features() & wgpu::Features::FLOAT32_FILTERABLE;
        let available = adapter.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: available.max_storage_buffer_binding_size,
            max_buffer_size: available.max_buffer_size,
            max_compute_invocations_per_workgroup: available.max_compute_invocations_per_workgroup,
            max_compute_workgroup_size_x: available.max_compute_workgroup_size_x,
            max_compute_workgroup_size_y: available.max_compute_workgroup_size_y,
            max_compute_workgroup_size_z: available.max_compute_workgroup_size_z,
            max_texture_dimension_3d: available.max_texture_dimension_3d,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("meshfield device"),
                required_features,
                required_limits,
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Checks `options`, a sample buffer of `sample_bytes` and the distance
    /// range of `aabb` against this device.
    pub fn check_volume(
        &self,
        options: &VolumeOptions,
        aabb: &Aabb,
        sample_bytes: u64,
    ) -> RenderResult<()> {
        check_limits(
            &self.device.limits(),
            self.device.features(),
            options,
            aabb,
            sample_bytes,
        )
    }

    /// Runs `f` inside validation and out-of-memory error scopes.
    ///
    /// Any error captured while `f` ran is returned instead of its value.
    pub fn scoped<T>(
        &self,
        make_error: fn(String) -> RenderError,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> RenderResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = validation {
            return Err(make_error(err.to_string()));
        }
        if oom.is_some() {
            return Err(RenderError::OutOfMemory);
        }
        Ok(value)
    }

    /// Blocks until `submission` has finished executing.
    pub fn wait(&self, submission: wgpu::SubmissionIndex) -> RenderResult<()> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map(|_| ())
            .map_err(|_| RenderError::Timeout)
    }
}

/// Largest distance a field of `precision` stores without clamping.
#[must_use]
pub fn max_storable_distance(precision: FieldPrecision) -> f32 {
    match precision {
        FieldPrecision::Half => half::f16::MAX.to_f32(),
        FieldPrecision::Full => f32::MAX,
    }
}

/// Device-independent part of [`GpuContext::check_volume`].
///
/// No voxel centre lies farther than the box diagonal from the surface, so a
/// diagonal within the precision's range means no stored distance clamps.
pub fn check_limits(
    limits: &wgpu::Limits,
    features: wgpu::Features,
    options: &VolumeOptions,
    aabb: &Aabb,
    sample_bytes: u64,
) -> RenderResult<()> {
    let edge = options.block_edge;
    let invocations = u64::from(edge).pow(3);
    if invocations > u64::from(limits.max_compute_invocations_per_workgroup) {
        return Err(RenderError::LimitExceeded {
            what: "workgroup invocations",
            requested: invocations,
            limit: u64::from(limits.max_compute_invocations_per_workgroup),
        });
    }

    let max_edge = limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_workgroup_size_y)
        .min(limits.max_compute_workgroup_size_z);
    if edge > max_edge {
        return Err(RenderError::LimitExceeded {
            what: "block edge",
            requested: u64::from(edge),
            limit: u64::from(max_edge),
        });
    }

    let blocks = options.grid_size / edge.max(1);
    if blocks > limits.max_compute_workgroups_per_dimension {
        return Err(RenderError::LimitExceeded {
            what: "blocks per axis",
            requested: u64::from(blocks),
            limit: u64::from(limits.max_compute_workgroups_per_dimension),
        });
    }

    if options.grid_size > limits.max_texture_dimension_3d {
        return Err(RenderError::LimitExceeded {
            what: "grid size",
            requested: u64::from(options.grid_size),
            limit: u64::from(limits.max_texture_dimension_3d),
        });
    }

    let max_binding = u64::from(limits.max_storage_buffer_binding_size);
    if sample_bytes > max_binding {
        return Err(RenderError::LimitExceeded {
            what: "sample buffer bytes",
            requested: sample_bytes,
            limit: max_binding,
        });
    }

    let staging_bytes = field_staging_bytes(options.grid_size, options.precision);
    let max_staging = max_binding.min(limits.max_buffer_size);
    if staging_bytes > max_staging {
        return Err(RenderError::LimitExceeded {
            what: "field staging bytes",
            requested: staging_bytes,
            limit: max_staging,
        });
    }

    if options.precision == FieldPrecision::Full
        && !features.contains(wgpu::Features::FLOAT32_FILTERABLE)
    {
        return Err(RenderError::MissingFeature("FLOAT32_FILTERABLE"));
    }

    let diagonal = aabb.diagonal();
    let max_distance = max_storable_distance(options.precision);
    if diagonal.is_nan() || diagonal > max_distance {
        return Err(RenderError::RangeExceeded {
            distance: diagonal,
            limit: max_distance,
            precision: options.precision,
        });
    }

    Ok(())
}

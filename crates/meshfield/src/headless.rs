//! Headless rendering of a volume to pixels or an image file.

use meshfield_core::{Result, Vec3};
use meshfield_render::{
    builtin_library, save_image, Camera, GpuContext, RenderTarget, VolumeDrawPass, COLOR_FORMAT,
    DEPTH_FORMAT,
};

use crate::Volume;

// Three-quarter view from above, so three faces of a box are visible.
const VIEW_FROM: Vec3 = Vec3::new(0.6, 0.5, 1.0);

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 1.0,
    b: 1.0,
    a: 1.0,
};

/// Ray-marches `volume` into a `width` x `height` RGBA8 buffer.
///
/// The camera frames the volume's bounding box from above and to the side.
pub fn render_to_image(
    ctx: &GpuContext,
    volume: &Volume,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let target = RenderTarget::new(ctx, width, height)?;
    let aabb = volume.aabb();
    let camera = Camera::framing(aabb.min(), aabb.max(), VIEW_FROM, target.aspect_ratio());

    let mut library = builtin_library();
    let mut stage = VolumeDrawPass::new(ctx, &mut library, COLOR_FORMAT, DEPTH_FORMAT)?;
    stage.set_camera(&ctx.queue, &camera);
    volume.apply(&mut stage);
    stage.prepare(&ctx.device, &ctx.queue)?;

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("volume render encoder"),
        });
    {
        let mut pass = target.begin_pass(&mut encoder, BACKGROUND);
        stage.bind(&mut pass)?;
        volume.draw(&mut pass);
    }
    ctx.queue.submit(std::iter::once(encoder.finish()));

    Ok(target.read_pixels(ctx)?)
}

/// Renders `volume` and saves it as PNG or JPEG, chosen by extension.
pub fn render_to_file(
    ctx: &GpuContext,
    volume: &Volume,
    filename: &str,
    width: u32,
    height: u32,
) -> Result<()> {
    let data = render_to_image(ctx, volume, width, height)?;
    save_image(filename, &data, width, height)?;
    Ok(())
}

//! Rasterizer: paints a laid-out render context into an opaque RGBA bitmap
//! using Blitz and Vello.

use crate::config::RenderConfig;
use crate::dimensions::TargetDimensions;
use crate::error::{Error, Result};

#[cfg(feature = "png")]
use anyrender::render_to_buffer;
#[cfg(feature = "png")]
use anyrender_vello_cpu::VelloCpuImageRenderer;
#[cfg(feature = "png")]
use blitz_dom::BaseDocument;
#[cfg(feature = "png")]
use blitz_paint::paint_scene;

/// An opaque RGBA8 bitmap of the target viewport at `density` pixels per
/// CSS pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    /// Pixel width (`target.width * density`).
    pub width: u32,
    /// Pixel height (`target.height * density`).
    pub height: u32,
    /// Target size in CSS pixels.
    pub target: TargetDimensions,
    /// Row-major RGBA8; alpha is always 255.
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// A bitmap filled with a single opaque color.
    pub fn solid(target: TargetDimensions, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = [rgb[0], rgb[1], rgb[2], 255].repeat((width * height) as usize);
        Self {
            width,
            height,
            target,
            pixels,
        }
    }

    /// RGB8 copy of the pixels (alpha dropped).
    pub fn to_rgb(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }
}

/// Scale a CSS edge to device pixels for `density`.
pub fn device_edge(css_px: u32, density: f32) -> u32 {
    ((css_px as f64 * density as f64).round() as u32).max(1)
}

/// Paint `document` into a bitmap covering exactly the target viewport.
///
/// The bitmap is always `target * density` device pixels; `paint_scale`
/// (density times the fit scale) maps layout pixels onto it.
#[cfg(feature = "png")]
pub fn rasterize(
    document: &BaseDocument,
    target: TargetDimensions,
    config: &RenderConfig,
    paint_scale: f32,
) -> Result<Bitmap> {
    let scale = paint_scale as f64;
    let render_width = device_edge(target.width, config.density);
    let render_height = device_edge(target.height, config.density);

    let mut buffer = render_to_buffer::<VelloCpuImageRenderer, _>(
        |scene| {
            paint_scene(scene, document, scale, render_width, render_height);
        },
        render_width,
        render_height,
    );

    let expected = render_width as usize * render_height as usize * 4;
    if buffer.len() != expected {
        return Err(Error::Raster(format!(
            "renderer produced {} bytes, expected {expected}",
            buffer.len()
        )));
    }

    flatten_onto(&mut buffer, config.background);

    Ok(Bitmap {
        width: render_width,
        height: render_height,
        target,
        pixels: buffer,
    })
}

#[cfg(not(feature = "png"))]
pub fn rasterize(
    _document: &blitz_dom::BaseDocument,
    _target: TargetDimensions,
    _config: &RenderConfig,
    _paint_scale: f32,
) -> Result<Bitmap> {
    Err(Error::FormatNotEnabled("png"))
}

/// Composite straight-alpha RGBA pixels over an opaque background in place.
pub fn flatten_onto(pixels: &mut [u8], background: [u8; 4]) {
    for px in pixels.chunks_exact_mut(4) {
        let alpha = px[3] as u32;
        if alpha == 255 {
            continue;
        }
        for channel in 0..3 {
            let src = px[channel] as u32;
            let bg = background[channel] as u32;
            px[channel] = ((src * alpha + bg * (255 - alpha) + 127) / 255) as u8;
        }
        px[3] = 255;
    }
}

//! JPEG encoding of a rasterized bitmap.

use crate::error::{Error, Result};
use crate::render::raster::Bitmap;

#[cfg(feature = "png")]
use image::codecs::jpeg::JpegEncoder;
#[cfg(feature = "png")]
use image::ExtendedColorType;

/// Encode a bitmap to baseline JPEG at `quality` (1-100).
#[cfg(feature = "png")]
pub fn encode_jpeg(bitmap: &Bitmap, quality: u8) -> Result<Vec<u8>> {
    let rgb = bitmap.to_rgb();
    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100))
        .encode(&rgb, bitmap.width, bitmap.height, ExtendedColorType::Rgb8)
        .map_err(|e| Error::JpegEncode(e.to_string()))?;
    Ok(output)
}

#[cfg(not(feature = "png"))]
pub fn encode_jpeg(_bitmap: &Bitmap, _quality: u8) -> Result<Vec<u8>> {
    Err(Error::FormatNotEnabled("jpeg"))
}

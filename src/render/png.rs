//! PNG encoding of a rasterized bitmap.

use crate::error::{Error, Result};
use crate::render::raster::Bitmap;

/// Encode a bitmap to PNG bytes.
#[cfg(feature = "png")]
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let mut output = Vec::new();

    {
        let mut encoder = png::Encoder::new(&mut output, bitmap.width, bitmap.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);

        let mut writer = encoder
            .write_header()
            .map_err(|e| Error::PngEncode(e.to_string()))?;

        writer
            .write_image_data(&bitmap.pixels)
            .map_err(|e| Error::PngEncode(e.to_string()))?;
    }

    Ok(output)
}

#[cfg(not(feature = "png"))]
pub fn encode_png(_bitmap: &Bitmap) -> Result<Vec<u8>> {
    Err(Error::FormatNotEnabled("png"))
}

#[cfg(all(test, feature = "png"))]
mod tests {
    use super::*;
    use crate::dimensions::TargetDimensions;

    #[test]
    fn test_encode_png_header_and_size() {
        let bmp = Bitmap::solid(TargetDimensions::new(3, 2), 6, 4, [255, 0, 0]);
        let bytes = encode_png(&bmp).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]), 6);
        assert_eq!(u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]), 4);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let mut bmp = Bitmap::solid(TargetDimensions::new(2, 2), 2, 2, [0, 0, 0]);
        bmp.pixels.truncate(4);
        assert!(matches!(encode_png(&bmp), Err(Error::PngEncode(_))));
    }
}

//! Rasterization and output encoders.
//!
//! Every raster format shares one [`raster::Bitmap`] captured at a fixed
//! density; the Word encoder works on live HTML/CSS instead.

pub mod doc;
pub mod jpeg;
pub mod pdf;
pub mod png;
pub mod raster;

use crate::error::Result;
use crate::render::raster::Bitmap;

/// Encoding applied to a rasterized bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg { quality: u8 },
    Pdf,
}

impl RasterFormat {
    pub fn encode(self, bitmap: &Bitmap) -> Result<Vec<u8>> {
        match self {
            RasterFormat::Png => self::png::encode_png(bitmap),
            RasterFormat::Jpeg { quality } => self::jpeg::encode_jpeg(bitmap, quality),
            RasterFormat::Pdf => self::pdf::encode_pdf(bitmap),
        }
    }
}

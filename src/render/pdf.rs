//! Image-based PDF output using Krilla.
//!
//! The page is sized to the target in CSS pixels and carries one full-bleed
//! PNG of the rasterized bitmap at the origin. The bitmap is already fitted,
//! so no further scaling happens here.

use crate::error::{Error, Result};
use crate::render::raster::Bitmap;

#[cfg(feature = "pdf")]
use krilla::geom::Size;
#[cfg(feature = "pdf")]
use krilla::image::Image;
#[cfg(feature = "pdf")]
use krilla::page::PageSettings;
#[cfg(feature = "pdf")]
use krilla::Document;

/// Build a single-page PDF around `bitmap`.
#[cfg(feature = "pdf")]
pub fn encode_pdf(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let width = bitmap.target.width as f32;
    let height = bitmap.target.height as f32;

    let png_bytes = crate::render::png::encode_png(bitmap)?;
    let data: krilla::Data = png_bytes.into();
    let image = Image::from_png(data, true)
        .map_err(|e| Error::PdfCreate(format!("could not embed raster: {e:?}")))?;

    let mut pdf_doc = Document::new();

    let size = Size::from_wh(width, height)
        .ok_or_else(|| Error::PdfCreate("Invalid page dimensions".to_string()))?;
    let mut page = pdf_doc.start_page_with(PageSettings::new(size));

    // Krilla's origin is top-left, like the bitmap.
    let mut surface = page.surface();
    surface.draw_image(image, size);
    surface.finish();
    page.finish();

    tracing::debug!(
        orientation = ?bitmap.target.orientation(),
        page = %bitmap.target,
        "PDF page composed"
    );

    pdf_doc
        .finish()
        .map_err(|e| Error::PdfCreate(format!("{:?}", e)))
}

#[cfg(not(feature = "pdf"))]
pub fn encode_pdf(_bitmap: &Bitmap) -> Result<Vec<u8>> {
    Err(Error::FormatNotEnabled("pdf"))
}

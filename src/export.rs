//! The export pipeline: inline assets, lay out offscreen, fit and center,
//! rasterize, encode, deliver.
//!
//! Steps run strictly in sequence; each consumes the previous step's output.

use std::path::{Path, PathBuf};

use crate::config::{ExportRequest, FileKind};
use crate::context::RenderContext;
use crate::dimensions::TargetDimensions;
use crate::error::Result;
use crate::inline::{inline_images, ImageFetcher, InlineWarning};
use crate::output::{export_file_name, write_download};
use crate::render::{self, RasterFormat};
use crate::surface::DocumentContent;
use crate::transform::{ContentBox, FitTransform};

/// An encoded export, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub file_kind: FileKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Target size in CSS pixels.
    pub target: TargetDimensions,
    /// Natural content size measured before fitting.
    pub content_box: ContentBox,
    pub transform: FitTransform,
    /// Images that could not be inlined and may render blank.
    pub warnings: Vec<InlineWarning>,
}

/// A delivered export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub export: RenderedExport,
}

/// Run the pipeline for `content` and return the encoded bytes.
///
/// The offscreen render context is released before this returns, whether it
/// succeeds or fails.
pub async fn render_export(
    content: &DocumentContent,
    request: &ExportRequest,
    fetcher: &dyn ImageFetcher,
) -> Result<RenderedExport> {
    request.validate()?;
    let target = request.dimensions();
    let file_name = export_file_name(&request.name, target, request.file_kind);

    let format = match request.file_kind {
        FileKind::Png => RasterFormat::Png,
        FileKind::Jpeg => RasterFormat::Jpeg {
            quality: request.render.jpeg_quality,
        },
        FileKind::Pdf => RasterFormat::Pdf,
        FileKind::Doc => {
            let bytes = render::doc::render_to_doc(&content.html, &content.css, &request.name);
            return Ok(RenderedExport {
                file_kind: FileKind::Doc,
                file_name,
                bytes,
                target,
                content_box: ContentBox::default(),
                transform: FitTransform::IDENTITY,
                warnings: Vec::new(),
            });
        }
    };

    tracing::debug!(kind = %request.file_kind, dims = %target, "starting export");

    let inlined = inline_images(&content.html, fetcher).await;

    let (bitmap, content_box, transform) = {
        let mut ctx = RenderContext::create(target, &request.render);
        ctx.write(&inlined.html, &content.css)?;
        ctx.await_ready().await?;

        let content_box = ctx.measure_content_box()?;
        let transform = FitTransform::fit(content_box, target);
        tracing::debug!(
            content_width = content_box.width,
            content_height = content_box.height,
            scale = transform.scale,
            "fitting content"
        );
        ctx.apply_transform(transform).await?;

        let bitmap = render::raster::rasterize(
            ctx.capture()?,
            target,
            &request.render,
            ctx.paint_scale(),
        )?;
        (bitmap, content_box, transform)
    };

    let bytes = format.encode(&bitmap)?;

    Ok(RenderedExport {
        file_kind: request.file_kind,
        file_name,
        bytes,
        target,
        content_box,
        transform,
        warnings: inlined.warnings,
    })
}

/// Run the pipeline and write the result into `out_dir`.
///
/// On failure nothing is written.
pub async fn export(
    content: &DocumentContent,
    request: &ExportRequest,
    fetcher: &dyn ImageFetcher,
    out_dir: &Path,
) -> Result<ExportOutcome> {
    let rendered = match render_export(content, request, fetcher).await {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::error!(error = %e, kind = %request.file_kind, "export failed");
            return Err(e);
        }
    };
    let path = write_download(out_dir, &rendered.file_name, &rendered.bytes)?;
    Ok(ExportOutcome {
        path,
        export: rendered,
    })
}

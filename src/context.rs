//! Offscreen render context.
//!
//! A disposable Blitz document sized to the export target. Content is written
//! into a max-content wrapper so it can establish its natural size. Once the
//! fit is known the wrapper is moved to the fitted origin (in unscaled CSS
//! pixels) and the page is painted at `density * fit.scale`.

use std::sync::Arc;

use blitz_dom::net::Resource;
use blitz_dom::{BaseDocument, DocumentConfig, Node};
use blitz_html::HtmlDocument;
use blitz_net::{MpscCallback, Provider};
use blitz_traits::net::NetProvider;
use blitz_traits::shell::{ColorScheme, Viewport};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout, Instant};

use crate::config::RenderConfig;
use crate::dimensions::TargetDimensions;
use crate::error::{Error, Result};
use crate::render::raster::device_edge;
use crate::transform::{ContentBox, FitTransform};

/// Element id of the wrapper that holds the design content.
pub const WRAPPER_ID: &str = "design-render-wrapper";

/// Build the self-contained document written into a render context.
///
/// The wrapper is absolutely positioned and sized to `max-content`, so it is
/// never clipped to the target. With a `placement` it sits at the transform's
/// unscaled origin, otherwise at the top-left corner.
pub fn compose_document(
    body_html: &str,
    css: &str,
    background: [u8; 4],
    placement: Option<FitTransform>,
) -> String {
    let [r, g, b, _] = background;
    let (left, top) = placement
        .map(|t| t.unscaled_origin())
        .unwrap_or((0.0, 0.0));

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{css}\n\
html, body {{ background: rgb({r}, {g}, {b}); margin: 0; padding: 0; }}\n\
#{WRAPPER_ID} {{ width: max-content; height: max-content; position: absolute; left: {left}px; top: {top}px; }}\n\
</style>\n</head>\n<body>\n<div id=\"{WRAPPER_ID}\">\n{body_html}\n</div>\n</body>\n</html>\n"
    )
}

struct LoadedDocument {
    document: HtmlDocument,
    net: Arc<Provider<Resource>>,
    resources: UnboundedReceiver<(usize, Resource)>,
}

/// An offscreen layout-and-paint surface sized independently of any window.
///
/// Dropping the context releases the document and its pending resource
/// loads, so every exit path disposes of it.
pub struct RenderContext {
    target: TargetDimensions,
    config: RenderConfig,
    body_html: String,
    css: String,
    transform: Option<FitTransform>,
    loaded: Option<LoadedDocument>,
}

impl RenderContext {
    /// Create an empty context for `target`. Nothing is laid out until
    /// [`write`](Self::write).
    pub fn create(target: TargetDimensions, config: &RenderConfig) -> Self {
        tracing::debug!(dims = %target, "creating render context");
        Self {
            target,
            config: config.clone(),
            body_html: String::new(),
            css: String::new(),
            transform: None,
            loaded: None,
        }
    }

    pub fn target(&self) -> TargetDimensions {
        self.target
    }

    /// Currently applied transform, if any.
    pub fn transform(&self) -> Option<FitTransform> {
        self.transform
    }

    /// Write a body fragment and stylesheet into the context.
    ///
    /// Must be called from within a Tokio runtime: resource loads (the
    /// inlined `data:` images) are driven by it.
    pub fn write(&mut self, body_html: &str, css: &str) -> Result<()> {
        self.body_html = body_html.to_string();
        self.css = css.to_string();
        self.transform = None;
        self.reload()
    }

    fn reload(&mut self) -> Result<()> {
        let html = compose_document(
            &self.body_html,
            &self.css,
            self.config.background,
            self.transform,
        );

        let (resources, callback) = MpscCallback::new();
        let net = Arc::new(Provider::new(Arc::new(callback)));

        let density = self.config.density;
        let viewport = Viewport::new(
            device_edge(self.target.width, density),
            device_edge(self.target.height, density),
            density,
            ColorScheme::Light,
        );

        let doc_config = DocumentConfig {
            viewport: Some(viewport),
            net_provider: Some(Arc::clone(&net) as Arc<dyn NetProvider<Resource>>),
            ..Default::default()
        };

        // Drop the previous document before building its replacement.
        self.loaded = None;
        self.loaded = Some(LoadedDocument {
            document: HtmlDocument::from_html(&html, doc_config),
            net,
            resources,
        });
        Ok(())
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedDocument> {
        self.loaded
            .as_mut()
            .ok_or_else(|| Error::Layout("render context has no document written".into()))
    }

    /// Wait until the document is ready to measure.
    ///
    /// Drains pending resource loads, waits the configured settle delay, then
    /// polls the natural content box until two consecutive measurements
    /// agree. The whole wait is bounded by `ready_timeout`; hitting the bound
    /// is not an error, the last layout is used.
    pub async fn await_ready(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.config.ready_timeout;
        let poll = self.config.poll_interval;
        let settle = self.config.settle_delay;

        {
            let loaded = self.loaded_mut()?;
            let mut loaded_count = 0usize;
            while !loaded.net.is_empty() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!("resource loading did not finish before the ready timeout");
                    break;
                }
                match timeout(remaining.min(poll), loaded.resources.recv()).await {
                    Ok(Some((_, resource))) => {
                        loaded.document.as_mut().load_resource(resource);
                        loaded_count += 1;
                    }
                    Ok(None) => break,
                    Err(_) => continue,
                }
            }
            // Anything that completed while we were checking is still queued.
            while let Ok((_, resource)) = loaded.resources.try_recv() {
                loaded.document.as_mut().load_resource(resource);
                loaded_count += 1;
            }
            loaded.document.resolve(0.0);
            tracing::debug!(resources = loaded_count, "render context loaded");
        }

        sleep(settle.min(deadline.saturating_duration_since(Instant::now()))).await;

        let mut previous = self.measure_content_box()?;
        loop {
            if Instant::now() + poll > deadline {
                tracing::debug!("layout readiness ceiling reached");
                break;
            }
            sleep(poll).await;
            self.loaded_mut()?.document.resolve(0.0);
            let current = self.measure_content_box()?;
            if current == previous {
                break;
            }
            previous = current;
        }
        Ok(())
    }

    /// Natural (unscaled) size of the content wrapper.
    pub fn measure_content_box(&self) -> Result<ContentBox> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or_else(|| Error::Layout("render context has no document written".into()))?;
        let doc: &BaseDocument = loaded.document.as_ref();
        let wrapper = find_by_id(doc, doc.root_element(), WRAPPER_ID)
            .ok_or_else(|| Error::Layout("content wrapper missing from render context".into()))?;
        let size = wrapper.final_layout.size;
        Ok(ContentBox::new(size.width, size.height))
    }

    /// Move the content wrapper to the fitted origin and lay the document out
    /// again. The scale itself is applied when painting, see
    /// [`paint_scale`](Self::paint_scale).
    pub async fn apply_transform(&mut self, transform: FitTransform) -> Result<()> {
        tracing::debug!(transform = %transform, "applying fit transform");
        self.transform = Some(transform);
        self.reload()?;
        self.drain_resources().await
    }

    async fn drain_resources(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.config.ready_timeout;
        let poll = self.config.poll_interval;
        let loaded = self.loaded_mut()?;
        while !loaded.net.is_empty() && Instant::now() < deadline {
            if let Ok(Some((_, resource))) = timeout(poll, loaded.resources.recv()).await {
                loaded.document.as_mut().load_resource(resource);
            }
        }
        while let Ok((_, resource)) = loaded.resources.try_recv() {
            loaded.document.as_mut().load_resource(resource);
        }
        loaded.document.resolve(0.0);
        Ok(())
    }

    /// Device pixels per layout pixel for the final paint.
    pub fn paint_scale(&self) -> f32 {
        let fit = self.transform.map(|t| t.scale).unwrap_or(1.0);
        self.config.density * fit
    }

    /// The laid-out document, ready for rasterization.
    pub fn capture(&self) -> Result<&BaseDocument> {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.document.as_ref())
            .ok_or_else(|| Error::Layout("render context has no document written".into()))
    }

    /// Dispose of the context. Equivalent to dropping it.
    pub fn destroy(self) {}
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        tracing::debug!(dims = %self.target, "render context released");
    }
}

fn find_by_id<'a>(doc: &'a BaseDocument, node: &'a Node, id: &str) -> Option<&'a Node> {
    if let Some(element) = node.element_data() {
        let matches = element
            .attrs()
            .iter()
            .any(|attr| &*attr.name.local == "id" && &*attr.value == id);
        if matches {
            return Some(node);
        }
    }
    node.children
        .iter()
        .filter_map(|child_id| doc.get_node(*child_id))
        .find_map(|child| find_by_id(doc, child, id))
}

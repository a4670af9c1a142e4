//! Image inlining.
//!
//! Rewrites every `<img src>` that points at a remote (or local file) URL
//! into a base64 `data:` URI so the render context has no external image
//! dependencies. Fetches run concurrently; a failed image keeps its original
//! URL and is reported as an [`InlineWarning`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::future::join_all;
use reqwest::Url;
use scraper::ElementRef;

use crate::error::{Error, Result};
use crate::markup::{parse_fragment, serialize_fragment};

/// Raw image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FetchedImage {
    /// Encode as a `data:<mime>;base64,...` URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Source of image bytes for the inliner.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

/// An image that could not be inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineWarning {
    pub url: String,
    pub reason: String,
}

/// Result of inlining: the rewritten fragment plus per-image failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinedHtml {
    pub html: String,
    pub warnings: Vec<InlineWarning>,
}

fn needs_inlining(src: &str) -> bool {
    !src.is_empty() && !src.starts_with("data:")
}

/// Distinct `<img src>` values that still point somewhere, in document order.
fn find_image_sources(fragment: &scraper::Html) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for element in fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "img")
    {
        let Some(src) = element.value().attr("src").map(str::trim) else {
            continue;
        };
        if needs_inlining(src) && !urls.iter().any(|url| url == src) {
            urls.push(src.to_string());
        }
    }
    urls
}

/// Replace every non-`data:` image source in `html` with an embedded data URI.
///
/// Each distinct URL is fetched once; all fetches are awaited before this
/// returns. When at least one image was inlined the fragment comes back
/// re-serialized; otherwise it is returned as given.
pub async fn inline_images(html: &str, fetcher: &dyn ImageFetcher) -> InlinedHtml {
    let urls = find_image_sources(&parse_fragment(html));
    if urls.is_empty() {
        return InlinedHtml {
            html: html.to_string(),
            warnings: Vec::new(),
        };
    }

    tracing::debug!(count = urls.len(), "inlining images");
    let results = join_all(urls.iter().map(|url| fetcher.fetch(url))).await;

    let mut resolved: HashMap<String, String> = HashMap::with_capacity(urls.len());
    let mut warnings = Vec::new();
    for (url, result) in urls.into_iter().zip(results) {
        match result {
            Ok(image) => {
                resolved.insert(url, image.to_data_uri());
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to inline image");
                warnings.push(InlineWarning {
                    reason: e.to_string(),
                    url,
                });
            }
        }
    }

    if resolved.is_empty() {
        return InlinedHtml {
            html: html.to_string(),
            warnings,
        };
    }

    // Parsed again: scraper trees are not Send and must not live across the fetches.
    let fragment = parse_fragment(html);
    let rewrite = |element: &str, attr: &str, value: &str| {
        if element == "img" && attr == "src" {
            resolved.get(value.trim()).cloned()
        } else {
            None
        }
    };
    InlinedHtml {
        html: serialize_fragment(&fragment, &rewrite),
        warnings,
    }
}

/// [`ImageFetcher`] over HTTP(S) and `file:` URLs.
///
/// Relative URLs are resolved against `base_url` when one is set.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Option<Url>,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            timeout,
        }
    }

    /// Reuse an existing client (connection pooling).
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            base_url: None,
            timeout,
        }
    }

    pub fn base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    fn resolve(&self, raw: &str) -> Result<Url> {
        let parsed = match &self.base_url {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        parsed.map_err(|e| Error::Fetch {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, raw: &str) -> Result<FetchedImage> {
        let url = self.resolve(raw)?;
        let fail = |reason: String| Error::Fetch {
            url: raw.to_string(),
            reason,
        };

        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| fail("not a local path".to_string()))?;
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| fail(e.to_string()))?;
            let mime = sniff_mime(&bytes, url.path()).to_string();
            return Ok(FetchedImage { mime, bytes });
        }

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {status}")));
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(e.to_string()))?
            .to_vec();
        let mime = header_mime.unwrap_or_else(|| sniff_mime(&bytes, url.path()).to_string());

        Ok(FetchedImage { mime, bytes })
    }
}

/// Best-effort MIME type from magic bytes, then the path extension.
fn sniff_mime(bytes: &[u8], path: &str) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".svg") {
        "image/svg+xml"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}

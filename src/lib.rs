//! # design-render
//!
//! Fixed-size export and AI-assisted editing for HTML/CSS design templates.
//!
//! A design is an HTML body fragment plus a stylesheet. This crate turns one
//! into a pixel-exact PNG, JPEG or PDF at a chosen page size or aspect ratio,
//! without a browser: the design is laid out offscreen with
//! [Blitz](https://github.com/DioxusLabs/blitz), scaled to fit and centered in
//! the target box, rasterized at 2x density and encoded.
//!
//! ## Features
//!
//! - **Page sizes and ratios**: A4, Letter, Poster or custom pixels in either
//!   orientation, or square, portrait, story, landscape and custom ratios at a
//!   1080px base width
//! - **Self-contained output**: remote images are inlined as data URIs first
//! - **Word export**: the live HTML/CSS wrapped as a `.doc` document
//! - **AI edits**: one-at-a-time JSON edits from a generative text service,
//!   with embedded images swapped out of the prompt and restored afterwards
//! - **Design store**: a JSON file of saved designs with debounced autosave
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use design_render::{export, AspectRatio, DocumentContent, ExportRequest, FileKind, HttpFetcher};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn run() -> design_render::Result<()> {
//! let content = DocumentContent::new(
//!     "<div class=\"card\"><h1>Spring Sale</h1></div>",
//!     ".card { width: 600px; padding: 40px; background: #fde; }",
//! );
//!
//! let request = ExportRequest::new()
//!     .file_kind(FileKind::Png)
//!     .ratio(AspectRatio::square())
//!     .name("Spring Sale");
//!
//! let fetcher = HttpFetcher::new(Duration::from_secs(10));
//! let outcome = export(&content, &request, &fetcher, Path::new("out")).await?;
//! println!("wrote {}", outcome.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Dimensions
//!
//! ```rust
//! use design_render::{ExportRequest, Orientation, PageSize};
//!
//! let request = ExportRequest::new().page(PageSize::a4(), Orientation::Landscape);
//! assert_eq!(request.dimensions().to_string(), "1123x794");
//! ```

pub mod ai;
mod config;
pub mod context;
pub mod dimensions;
mod error;
mod export;
pub mod inline;
mod markup;
pub mod output;
pub mod render;
pub mod store;
pub mod surface;
pub mod templates;
pub mod transform;

pub use config::{
    AiConfig, ExportRequest, FileKind, RenderConfig, API_KEY_ENV, AVAILABLE_MODELS,
};
pub use dimensions::{
    resolve, AspectRatio, DimensionMode, Orientation, PageSize, TargetDimensions,
};
pub use error::{Error, Result};
pub use export::{export, render_export, ExportOutcome, RenderedExport};
pub use inline::{HttpFetcher, ImageFetcher};
pub use store::{Autosaver, DesignRecord, DesignStore};
pub use surface::{DocumentContent, DocumentSurface, MemorySurface, View, Workspace};
pub use transform::{ContentBox, FitTransform};

//! Configuration types for exporting and editing.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dimensions::{AspectRatio, DimensionMode, Orientation, PageSize};
use crate::error::{Error, Result};

/// Output file kind for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Single-page PDF with one full-bleed raster image.
    #[default]
    Pdf,
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// Word-compatible HTML document. Bypasses rasterization entirely.
    Doc,
}

impl FileKind {
    /// File extension used for downloads.
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Png => "png",
            FileKind::Jpeg => "jpg",
            FileKind::Doc => "doc",
        }
    }

    /// Whether this kind goes through the offscreen render pipeline.
    pub fn is_raster(&self) -> bool {
        !matches!(self, FileKind::Doc)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::Png => write!(f, "png"),
            FileKind::Jpeg => write!(f, "jpeg"),
            FileKind::Doc => write!(f, "doc"),
        }
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "png" => Ok(FileKind::Png),
            "jpeg" | "jpg" => Ok(FileKind::Jpeg),
            "doc" | "word" => Ok(FileKind::Doc),
            other => Err(format!("unknown file kind '{other}'")),
        }
    }
}

/// Knobs for the offscreen render pipeline.
///
/// ```rust
/// use design_render::RenderConfig;
/// use std::time::Duration;
///
/// let config = RenderConfig::new()
///     .density(3.0)
///     .settle_delay(Duration::from_millis(500));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Pixel density multiplier for rasterization (2.0 by default).
    pub density: f32,

    /// Background painted beneath any transparent region, as RGBA.
    /// Always composited as opaque.
    pub background: [u8; 4],

    /// Fixed wait after resource loading finishes, before measuring.
    pub settle_delay: Duration,

    /// Interval between natural-size measurements while waiting for layout
    /// to stabilise.
    pub poll_interval: Duration,

    /// Upper bound on the whole readiness wait.
    pub ready_timeout: Duration,

    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,

    /// Per-image timeout used by the asset inliner.
    pub fetch_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            density: 2.0,
            background: [255, 255, 255, 255],
            settle_delay: Duration::from_millis(300),
            poll_interval: Duration::from_millis(50),
            ready_timeout: Duration::from_secs(2),
            jpeg_quality: 90,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl RenderConfig {
    /// Minimum allowed density multiplier.
    pub const MIN_DENSITY: f32 = 0.1;

    /// Maximum allowed density multiplier.
    pub const MAX_DENSITY: f32 = 8.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set the background color. The alpha channel is ignored; output is
    /// always opaque.
    pub fn background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if !self.density.is_finite() {
            return Err(Error::InvalidConfig("density must be a finite number".into()));
        }
        if self.density < Self::MIN_DENSITY || self.density > Self::MAX_DENSITY {
            return Err(Error::InvalidConfig(format!(
                "density must be between {} and {}, got {}",
                Self::MIN_DENSITY,
                Self::MAX_DENSITY,
                self.density
            )));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(Error::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll_interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// A single export: what kind of file, how big, and under which name.
///
/// ```rust
/// use design_render::{ExportRequest, FileKind, Orientation, PageSize};
///
/// let request = ExportRequest::new()
///     .file_kind(FileKind::Png)
///     .page(PageSize::letter(), Orientation::Landscape)
///     .name("Spring Poster");
/// assert_eq!(request.dimensions().width, 1056);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub file_kind: FileKind,
    pub mode: DimensionMode,
    /// Design name; sanitised into the output file name.
    pub name: String,
    pub render: RenderConfig,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            file_kind: FileKind::Pdf,
            mode: DimensionMode::default(),
            name: "design".to_string(),
            render: RenderConfig::default(),
        }
    }
}

impl ExportRequest {
    /// PDF, A4 portrait, named "design".
    pub fn new() -> Self {
        Self::default()
    }

    /// One-click export at A4 portrait.
    pub fn quick(kind: FileKind) -> Self {
        Self::new().file_kind(kind)
    }

    /// Defaults for a template: certificates export as Letter landscape,
    /// everything else as A4 portrait.
    pub fn for_template(name: &str) -> Self {
        let request = Self::new().name(name);
        if name.to_lowercase().contains("certificate") {
            request.page(PageSize::letter(), Orientation::Landscape)
        } else {
            request
        }
    }

    pub fn file_kind(mut self, kind: FileKind) -> Self {
        self.file_kind = kind;
        self
    }

    /// Standard-size mode with the given page and orientation.
    pub fn page(mut self, page_size: PageSize, orientation: Orientation) -> Self {
        self.mode = DimensionMode::Standard {
            page_size,
            orientation,
        };
        self
    }

    /// Standard-size mode with user-entered pixel edges.
    pub fn custom_pixels(self, width: impl Into<String>, height: impl Into<String>) -> Self {
        self.page(PageSize::custom(width, height), Orientation::Portrait)
    }

    /// Ratio mode.
    pub fn ratio(mut self, ratio: AspectRatio) -> Self {
        self.mode = DimensionMode::Ratio(ratio);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Resolved target dimensions for this request.
    pub fn dimensions(&self) -> crate::dimensions::TargetDimensions {
        crate::dimensions::resolve(&self.mode)
    }

    pub fn validate(&self) -> Result<()> {
        self.render.validate()
    }
}

/// Models offered when the service's model listing is unavailable.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    ("gemini-2.0-flash", "Gemini 2.0 Flash"),
    ("gemini-1.5-flash", "Gemini 1.5 Flash"),
];

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Credential and model selection for the generative text service.
///
/// Loaded once at startup and threaded explicitly into the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl AiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Whether a non-blank API key is present.
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    /// A non-empty `GEMINI_API_KEY` in the environment wins over the file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = key;
            }
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

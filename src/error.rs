//! Error types for design-render.

use thiserror::Error;

/// Result type alias for design-render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exporting or editing a design.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration values are invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested output format feature is not enabled.
    #[error("output format '{0}' is not enabled; enable the '{0}' feature in Cargo.toml")]
    FormatNotEnabled(&'static str),

    /// Failed to rasterize the render context.
    #[error("rasterization failed: {0}")]
    Raster(String),

    /// Failed to encode PNG image.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),

    /// Failed to encode JPEG image.
    #[error("JPEG encoding failed: {0}")]
    JpegEncode(String),

    /// Failed to create PDF document.
    #[error("PDF creation failed: {0}")]
    PdfCreate(String),

    /// Layout computation failed.
    #[error("layout computation failed: {0}")]
    Layout(String),

    /// Fetching a remote resource failed.
    #[error("fetch of {url} failed: {reason}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// Human readable failure reason.
        reason: String,
    },

    /// No API key is configured for the generative text service.
    #[error("no API key configured; set one with `design-render config set-key <KEY>` or GEMINI_API_KEY")]
    MissingApiKey,

    /// The generative text service request failed.
    #[error("AI request failed: {0}")]
    AiRequest(String),

    /// The generative text service answered with something other than the
    /// `{html, css, message}` object it was asked for.
    #[error("AI response violated the output contract: {0}")]
    AiContract(String),

    /// Another AI request is still awaiting the model.
    #[error("an AI request is already in flight")]
    Busy,

    /// The document is currently owned by another view.
    #[error("document is owned by the {0} view")]
    NotOwner(&'static str),

    /// The persistence store could not be read or written.
    #[error("design store error: {0}")]
    Store(String),

    /// A design with the given id does not exist.
    #[error("design not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::AiRequest(err.to_string())
    }
}

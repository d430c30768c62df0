use thiserror::Error;

/// Failure to retrieve raw document bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A document could not be opened. Fatal to that load only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentLoadError {
    #[error("failed to fetch document: {0}")]
    Fetch(#[from] FetchError),

    #[error("unsupported media type `{0}`, expected application/pdf")]
    UnsupportedMime(String),

    #[error("the document is either corrupted or not a valid PDF: {0}")]
    Corrupted(String),

    #[error("PDF backend unavailable: {0}")]
    Backend(String),
}

/// A single page failed to rasterize. The rest of the document stays usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PageRenderError {
    #[error("page {page} does not exist")]
    MissingPage { page: usize },

    #[error("failed to rasterize page {page}: {reason}")]
    Rasterize { page: usize, reason: String },
}

impl PageRenderError {
    /// 1-based index of the page that failed.
    pub fn page(&self) -> usize {
        match self {
            Self::MissingPage { page } | Self::Rasterize { page, .. } => *page,
        }
    }
}

/// Fullscreen, print or save requests rejected by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformCapabilityError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("request denied: {0}")]
    Denied(String),

    #[error("platform request failed: {0}")]
    Failed(String),
}

/// Download or print failed. Logged by the viewer, never retried.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to fetch document bytes: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to stage download: {0}")]
    Staging(#[from] std::io::Error),

    #[error(transparent)]
    Platform(#[from] PlatformCapabilityError),
}

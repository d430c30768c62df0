//! Headless core of an embeddable paginated document viewer.
//!
//! A [`Viewer`] opens a [`DocumentSource`] through a [`DocumentLoader`],
//! rasterizes every page once at a fixed base scale, follows the page the
//! user is looking at through an [`IntersectionSource`], and keeps zoom,
//! rotation, theme and fullscreen in a single [`ViewportState`]. Hosts drive
//! it through [`ViewerControls`] and supply their capabilities as a
//! [`Platform`].
//!
//! ```no_run
//! use std::rc::Rc;
//! use ipdf_viewer_core::{
//!     HeadlessPlatform, HttpFetcher, ManualIntersections, PdfiumLoader, Viewer, ViewerConfig,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new()?;
//! let viewer = Viewer::new(
//!     ViewerConfig::default(),
//!     PdfiumLoader::new(fetcher.clone())?,
//!     ManualIntersections::new(),
//!     Rc::new(HeadlessPlatform::new("downloads")),
//!     fetcher,
//! );
//! viewer.open("https://example.com/report.pdf").await?;
//! println!("{} pages", viewer.page_count());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod controller;
pub mod controls;
pub mod document;
pub mod error;
pub mod export;
pub mod fetch;
pub mod pdfium;
pub mod platform;
pub mod scheduler;
pub mod source;
pub mod subscription;
pub mod surface;
pub mod viewer;
pub mod viewport;
pub mod visibility;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{ConfigError, ViewerConfig};
pub use controller::ViewportController;
pub use controls::ViewerControls;
pub use document::{DocumentHandle, DocumentLoader, PageHandle, PageSize};
pub use error::{DocumentLoadError, ExportError, FetchError, PageRenderError, PlatformCapabilityError};
pub use export::Exporter;
pub use fetch::{Fetcher, HttpFetcher};
pub use pdfium::{PdfiumDocument, PdfiumLoader};
pub use platform::{HeadlessPlatform, Platform};
pub use scheduler::{PageRenderScheduler, RenderReport};
pub use source::{DocumentSource, PDF_MIME};
pub use subscription::Subscription;
pub use surface::PageSurface;
pub use viewer::{LoadState, OpenOutcome, Viewer};
pub use viewport::{PresentationTransform, Theme, TransformOrigin, ViewportAction, ViewportState, ZoomPolicy};
pub use visibility::{IntersectionEntry, IntersectionSource, ManualIntersections, VisibilityTracker};

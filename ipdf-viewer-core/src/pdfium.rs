use std::cell::OnceCell;
use std::fmt;

use image::RgbaImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::document::{DocumentHandle, DocumentLoader, PageHandle, PageSize};
use crate::error::{DocumentLoadError, PageRenderError};
use crate::fetch::Fetcher;
use crate::source::{DocumentSource, PDF_MIME};
use crate::surface::PageSurface;

/// [`DocumentLoader`] backed by PDFium through `pdfium-render`.
pub struct PdfiumLoader<F> {
    pdfium: &'static Pdfium,
    fetcher: F,
}

impl<F> fmt::Debug for PdfiumLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfiumLoader").finish_non_exhaustive()
    }
}

impl<F: Fetcher> PdfiumLoader<F> {
    /// Create a loader on the process-wide PDFium binding, binding it on
    /// first use.
    pub fn new(fetcher: F) -> Result<Self, DocumentLoadError> {
        Ok(Self {
            pdfium: shared_pdfium()?,
            fetcher,
        })
    }

    async fn read_bytes(&self, source: &DocumentSource) -> Result<Vec<u8>, DocumentLoadError> {
        match source {
            DocumentSource::Url(url) => Ok(self.fetcher.fetch(url).await?),
            DocumentSource::Bytes { data, mime } => {
                ensure_pdf(mime.as_deref())?;
                Ok(data.to_vec())
            }
        }
    }
}

thread_local! {
    static PDFIUM: OnceCell<&'static Pdfium> = const { OnceCell::new() };
}

/// Bind PDFium from the working directory, falling back to the system
/// library. The binding is made once per thread (the viewer runs on one) and
/// shared by every loader, so opened documents can outlive the loader that
/// produced them.
fn shared_pdfium() -> Result<&'static Pdfium, DocumentLoadError> {
    PDFIUM.with(|cell| {
        if let Some(pdfium) = cell.get() {
            return Ok(*pdfium);
        }
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                DocumentLoadError::Backend(format!(
                    "failed to bind to PDFium ({e}); install PDFium or download the library from https://github.com/bblanchon/pdfium-binaries"
                ))
            })?;
        debug!("bound PDFium library");
        let pdfium: &'static Pdfium = Box::leak(Box::new(Pdfium::new(bindings)));
        Ok(*cell.get_or_init(|| pdfium))
    })
}

/// Byte sources without a declared type are assumed to be PDFs.
fn ensure_pdf(mime: Option<&str>) -> Result<(), DocumentLoadError> {
    match mime {
        Some(mime) if !mime.trim().eq_ignore_ascii_case(PDF_MIME) => {
            Err(DocumentLoadError::UnsupportedMime(mime.to_string()))
        }
        _ => Ok(()),
    }
}

impl<F: Fetcher> DocumentLoader for PdfiumLoader<F> {
    type Document = PdfiumDocument;

    async fn open(&self, source: &DocumentSource) -> Result<PdfiumDocument, DocumentLoadError> {
        let bytes = self.read_bytes(source).await?;
        let inner = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(map_load_error)?;
        let document = PdfiumDocument { inner };
        info!(source = %source.label(), pages = document.page_count(), "document opened");
        Ok(document)
    }
}

fn map_load_error(e: PdfiumError) -> DocumentLoadError {
    let message = e.to_string();
    if message.to_lowercase().contains("password") {
        DocumentLoadError::Corrupted(format!("document is password protected: {message}"))
    } else {
        DocumentLoadError::Corrupted(message)
    }
}

pub struct PdfiumDocument {
    inner: PdfDocument<'static>,
}

// Manual Debug impl for PdfiumDocument since it contains pdfium types
impl fmt::Debug for PdfiumDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfiumDocument")
            .field("page_count", &self.page_count())
            .finish()
    }
}

impl DocumentHandle for PdfiumDocument {
    type Page<'a> = PdfiumPage<'a>;

    fn page_count(&self) -> usize {
        self.inner.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<PdfiumPage<'_>, PageRenderError> {
        let missing = || PageRenderError::MissingPage { page: index };
        let zero_based = index.checked_sub(1).ok_or_else(missing)?;
        let pdf_index = u16::try_from(zero_based).map_err(|_| missing())?;
        let inner = self.inner.pages().get(pdf_index).map_err(|_| missing())?;
        Ok(PdfiumPage {
            index,
            inner,
            _document: self,
        })
    }
}

pub struct PdfiumPage<'a> {
    index: usize,
    inner: PdfPage<'static>,
    _document: &'a PdfiumDocument,
}

impl PageHandle for PdfiumPage<'_> {
    fn size(&self) -> PageSize {
        PageSize::new(self.inner.width().value, self.inner.height().value)
    }

    async fn render(&self, surface: &mut PageSurface, base_scale: f32) -> Result<(), PageRenderError> {
        let rasterize = |reason: String| PageRenderError::Rasterize {
            page: self.index,
            reason,
        };

        let config = PdfRenderConfig::new()
            .set_target_width(surface.width() as i32)
            .set_maximum_height(surface.height() as i32);

        let bitmap = self
            .inner
            .render_with_config(&config)
            .map_err(|e| rasterize(e.to_string()))?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let pixels = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| rasterize("bitmap buffer does not match its dimensions".into()))?;

        debug!(page = self.index, width, height, base_scale, "rasterized page");
        surface.put_pixels(pixels);
        Ok(())
    }
}

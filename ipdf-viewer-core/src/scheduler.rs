//! Sequential page rasterization.
//!
//! Pages are rendered strictly one after another in ascending order. Each page
//! is drawn into a working surface owned by the scheduler and handed to the
//! caller only once it is complete, so the caller's surface list is never
//! borrowed across a suspension point.

use tracing::{debug, warn};

use crate::cancel::LoadTicket;
use crate::document::{DocumentHandle, PageHandle};
use crate::error::PageRenderError;
use crate::surface::PageSurface;

/// Default rasterization scale, independent of the user-facing zoom.
pub const DEFAULT_BASE_SCALE: f32 = 1.5;

/// Outcome of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub total: usize,
    pub rendered: usize,
    pub failed: Vec<PageRenderError>,
    pub cancelled: bool,
}

impl RenderReport {
    pub fn failed_pages(&self) -> Vec<usize> {
        self.failed.iter().map(PageRenderError::page).collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.rendered + self.failed.len() == self.total
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageRenderScheduler {
    base_scale: f32,
}

impl Default for PageRenderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_SCALE)
    }
}

impl PageRenderScheduler {
    pub fn new(base_scale: f32) -> Self {
        Self { base_scale }
    }

    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    /// One blank surface per page, sized before any rasterization starts.
    /// Pages whose handle cannot be obtained get a 1x1 placeholder.
    pub fn allocate<D: DocumentHandle>(&self, document: &D) -> Vec<PageSurface> {
        (1..=document.page_count())
            .map(|index| match document.page(index) {
                Ok(page) => PageSurface::new(index, page.size(), self.base_scale),
                Err(e) => {
                    warn!(page = index, error = %e, "cannot size page, using placeholder");
                    PageSurface::with_dimensions(index, 1, 1)
                }
            })
            .collect()
    }

    /// Render every page of `document` in order, passing each finished surface
    /// to `install`.
    ///
    /// A page that fails is recorded in the report and skipped. When `ticket`
    /// is superseded the in-flight render is dropped, nothing further is
    /// installed, and the report comes back with `cancelled` set.
    pub async fn run<D, F>(&self, document: &D, ticket: &mut LoadTicket, mut install: F) -> RenderReport
    where
        D: DocumentHandle,
        F: FnMut(PageSurface),
    {
        let total = document.page_count();
        let mut report = RenderReport {
            total,
            ..RenderReport::default()
        };

        for index in 1..=total {
            if !ticket.is_current() {
                report.cancelled = true;
                break;
            }

            let page = match document.page(index) {
                Ok(page) => page,
                Err(e) => {
                    warn!(page = index, error = %e, "skipping page");
                    report.failed.push(e);
                    continue;
                }
            };

            let mut surface = PageSurface::new(index, page.size(), self.base_scale);
            let result = tokio::select! {
                biased;
                _ = ticket.superseded() => None,
                result = page.render(&mut surface, self.base_scale) => Some(result),
            };

            match result {
                None => {
                    debug!(page = index, generation = ticket.generation(), "render aborted");
                    report.cancelled = true;
                    break;
                }
                Some(Err(e)) => {
                    warn!(page = index, error = %e, "page failed to render, leaving it blank");
                    report.failed.push(e);
                }
                Some(Ok(())) => {
                    // The document may have been replaced while this page was
                    // rasterizing; a stale surface must never be installed.
                    if !ticket.is_current() {
                        report.cancelled = true;
                        break;
                    }
                    surface.mark_rendered();
                    debug!(
                        page = index,
                        width = surface.width(),
                        height = surface.height(),
                        "page rendered"
                    );
                    install(surface);
                    report.rendered += 1;
                }
            }

            tokio::task::yield_now().await;
        }

        report
    }
}

//! Backend-neutral view of an opened, paginated document.
//!
//! A [`DocumentLoader`] turns a [`DocumentSource`] into a [`DocumentHandle`];
//! the handle hands out short-lived [`PageHandle`]s that know their intrinsic
//! size and how to rasterize themselves into a [`PageSurface`].

use std::future::Future;

use crate::error::{DocumentLoadError, PageRenderError};
use crate::source::DocumentSource;
use crate::surface::PageSurface;

/// Intrinsic page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions at `scale`, never smaller than 1x1.
    pub fn scaled(self, scale: f32) -> (u32, u32) {
        let px = |points: f32| (points * scale).round().max(1.0) as u32;
        (px(self.width), px(self.height))
    }
}

/// Opens document sources.
pub trait DocumentLoader {
    type Document: DocumentHandle;

    fn open(
        &self,
        source: &DocumentSource,
    ) -> impl Future<Output = Result<Self::Document, DocumentLoadError>>;
}

/// An opened document. Page indices are 1-based.
pub trait DocumentHandle {
    type Page<'a>: PageHandle
    where
        Self: 'a;

    fn page_count(&self) -> usize;

    fn page(&self, index: usize) -> Result<Self::Page<'_>, PageRenderError>;
}

/// One page, valid for a single rasterization.
pub trait PageHandle {
    fn size(&self) -> PageSize;

    /// Rasterize into `surface`, which is already sized for `base_scale`.
    fn render(
        &self,
        surface: &mut PageSurface,
        base_scale: f32,
    ) -> impl Future<Output = Result<(), PageRenderError>>;
}

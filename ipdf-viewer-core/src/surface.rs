use std::fmt;
use std::path::Path;

use image::RgbaImage;

use crate::document::PageSize;

/// Owned raster target holding one page's pixels.
pub struct PageSurface {
    index: usize,
    width: u32,
    height: u32,
    rendered: bool,
    pixels: Option<RgbaImage>,
}

impl fmt::Debug for PageSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSurface")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rendered", &self.rendered)
            .finish()
    }
}

impl PageSurface {
    /// Blank surface for page `index` (1-based) sized to `size` at `base_scale`.
    pub fn new(index: usize, size: PageSize, base_scale: f32) -> Self {
        let (width, height) = size.scaled(base_scale);
        Self::with_dimensions(index, width, height)
    }

    pub fn with_dimensions(index: usize, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            rendered: false,
            pixels: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }

    /// Store rasterized pixels. Backends may round differently than the
    /// allocation did, so the surface adopts the image's dimensions.
    pub fn put_pixels(&mut self, pixels: RgbaImage) {
        if pixels.dimensions() != (self.width, self.height) {
            tracing::trace!(
                page = self.index,
                expected_width = self.width,
                expected_height = self.height,
                width = pixels.width(),
                height = pixels.height(),
                "backend produced a differently sized bitmap"
            );
            self.width = pixels.width();
            self.height = pixels.height();
        }
        self.pixels = Some(pixels);
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.rendered = true;
    }

    /// Write the rendered pixels as a PNG. Returns `false` for a blank surface.
    pub fn write_png(&self, path: &Path) -> Result<bool, image::ImageError> {
        match &self.pixels {
            Some(pixels) => {
                pixels.save_with_format(path, image::ImageFormat::Png)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn new_surface_is_blank_and_unrendered() {
        let surface = PageSurface::new(3, PageSize::new(100.0, 200.0), 1.5);
        assert_eq!(surface.index(), 3);
        assert_eq!((surface.width(), surface.height()), (150, 300));
        assert!(!surface.is_rendered());
        assert!(surface.pixels().is_none());
    }

    #[test]
    fn put_pixels_adopts_bitmap_dimensions() {
        let mut surface = PageSurface::with_dimensions(1, 150, 300);
        surface.put_pixels(RgbaImage::from_pixel(149, 300, Rgba([255, 255, 255, 255])));
        assert_eq!((surface.width(), surface.height()), (149, 300));
        assert!(surface.pixels().is_some());
    }

    #[test]
    fn write_png_skips_blank_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let blank = PageSurface::with_dimensions(1, 4, 4);
        assert!(!blank.write_png(&dir.path().join("blank.png")).unwrap());

        let mut painted = PageSurface::with_dimensions(2, 4, 4);
        painted.put_pixels(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let path = dir.path().join("page-2.png");
        assert!(painted.write_png(&path).unwrap());
        assert!(path.exists());
    }
}

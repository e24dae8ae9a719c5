// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — wrap raster images into PDF pages using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::Path;

use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};
use wandler_core::error::WandlerError;

const MM_PER_INCH: f32 = 25.4;

/// Creates PDF documents whose pages are raster images.
///
/// Each page is sized to its image at the configured resolution, with no
/// margin, so a 1000x500 pixel image at 100 DPI becomes a 10x5 inch page.
pub struct PdfWriter {
    /// Pixels per inch used to derive the physical page size.
    resolution_dpi: f32,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    pub fn new(resolution_dpi: f32) -> Self {
        Self {
            resolution_dpi,
            title: None,
        }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Physical size of an image page in printpdf's Mm units.
    fn page_dimensions(&self, width_px: u32, height_px: u32) -> (Mm, Mm) {
        let to_mm = |px: u32| Mm(px as f32 / self.resolution_dpi * MM_PER_INCH);
        (to_mm(width_px), to_mm(height_px))
    }

    // -- Image to PDF ---------------------------------------------------------

    /// Create a single-page PDF containing the given image.
    pub fn create_from_image(&self, image: &DynamicImage) -> Result<Vec<u8>, WandlerError> {
        self.create_from_images(std::slice::from_ref(image))
    }

    /// Create a PDF with one page per image, in order.
    ///
    /// Images are flattened to 8-bit RGB; any alpha channel is dropped.
    #[instrument(skip_all, fields(pages = images.len(), dpi = self.resolution_dpi))]
    pub fn create_from_images(&self, images: &[DynamicImage]) -> Result<Vec<u8>, WandlerError> {
        if images.is_empty() {
            return Err(WandlerError::PdfError("no images to place".into()));
        }

        let title = self.title.as_deref().unwrap_or("Wandler Image");
        info!(title, "Creating image PDF");

        let mut doc = PdfDocument::new(title);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(images.len());

        for image in images {
            let (width, height) = (image.width(), image.height());
            if width == 0 || height == 0 {
                return Err(WandlerError::ImageError(format!(
                    "cannot place empty {}x{} image",
                    width, height
                )));
            }

            let rgb_image = image.to_rgb8();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb_image.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // At `dpi`, the image's natural size equals the page size, so it
            // is placed unscaled at the origin.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: None,
                    scale_y: None,
                    dpi: Some(self.resolution_dpi),
                    rotate: None,
                },
            }];

            let (page_w, page_h) = self.page_dimensions(width, height);
            debug!(width, height, page_w_mm = page_w.0, page_h_mm = page_h.0, "Image page laid out");
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }

        Ok(output)
    }

    // -- File output convenience ----------------------------------------------

    /// Create an image PDF and write it directly to a file.
    pub fn write_image_to_file(
        &self,
        image: &DynamicImage,
        path: impl AsRef<Path>,
    ) -> Result<(), WandlerError> {
        let bytes = self.create_from_image(image)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote image PDF to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn page_size_follows_resolution() {
        let writer = PdfWriter::new(100.0);
        let (w, h) = writer.page_dimensions(1000, 500);
        assert!((w.0 - 254.0).abs() < 0.01);
        assert!((h.0 - 127.0).abs() < 0.01);
    }

    #[test]
    fn rgba_image_becomes_single_page_pdf() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 10, Rgba([0, 0, 255, 40])));
        let bytes = PdfWriter::new(100.0).create_from_image(&image).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        let reader = crate::pdf::reader::PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(PdfWriter::new(100.0).create_from_images(&[]).is_err());
    }
}

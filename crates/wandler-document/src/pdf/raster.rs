// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterization — render PDF pages to bitmaps.
//
// The default backend shells out to poppler's `pdftoppm`, one invocation per
// page, each into its own scratch directory. Page counting goes through
// `lopdf` so a broken file is reported before any process is spawned.

use std::path::Path;
use std::process::Command;

use image::DynamicImage;
use tracing::{debug, instrument};
use wandler_core::ConverterConfig;
use wandler_core::error::{Result, WandlerError};

use crate::pdf::reader::PdfReader;

/// Renders the pages of a PDF file to images.
pub trait PageRasterizer {
    /// Number of pages in the document.
    fn page_count(&self, pdf: &Path) -> Result<usize>;

    /// Render a single page. `page` is 1-indexed.
    fn render_page(&self, pdf: &Path, page: u32) -> Result<DynamicImage>;
}

/// [`PageRasterizer`] backed by poppler's `pdftoppm` binary.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    program: String,
    dpi: u32,
}

impl PopplerRasterizer {
    pub fn new(program: impl Into<String>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.pdftoppm_program.clone(), config.raster_dpi)
    }

    /// Whether the configured binary can be launched at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-v")
            .output()
            .map(|_| true)
            .unwrap_or(false)
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::from_config(&ConverterConfig::default())
    }
}

impl PageRasterizer for PopplerRasterizer {
    fn page_count(&self, pdf: &Path) -> Result<usize> {
        Ok(PdfReader::open(pdf)?.page_count())
    }

    #[instrument(skip(self), fields(pdf = %pdf.display(), dpi = self.dpi))]
    fn render_page(&self, pdf: &Path, page: u32) -> Result<DynamicImage> {
        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");
        let page_arg = page.to_string();

        // -singlefile writes exactly `<prefix>.png` with no page suffix.
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|err| {
                WandlerError::RasterError(format!(
                    "cannot run {} (is poppler installed?): {}",
                    self.program, err
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WandlerError::RasterError(format!(
                "{} failed on page {}: {}",
                self.program,
                page,
                stderr.trim()
            )));
        }

        let rendered = prefix.with_extension("png");
        let image = image::open(&rendered).map_err(|err| {
            WandlerError::RasterError(format!("cannot load rendered page {}: {}", page, err))
        })?;

        debug!(page, width = image.width(), height = image.height(), "Page rendered");
        Ok(image)
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode a raster image and re-encode it as PNG or JPEG.
// Operates on in-memory images using the `image` crate.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, instrument};
use wandler_core::error::WandlerError;

/// A single decoded image on its way to another encoding.
///
/// ```ignore
/// ImageProcessor::open("photo.png")?.save_jpeg("photo.jpg", 75)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path. The format is sniffed from the content
    /// and extension.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WandlerError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            WandlerError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image loaded"
        );
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, WandlerError> {
        let img = image::load_from_memory(data).map_err(|err| {
            WandlerError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the image carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, WandlerError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| WandlerError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// The image is flattened to 8-bit RGB first. Any alpha channel is
    /// dropped, not composited against a background.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, WandlerError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| WandlerError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image losslessly as PNG, replacing any existing file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), WandlerError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|err| {
                WandlerError::ImageError(format!(
                    "failed to save PNG to {}: {}",
                    path.display(),
                    err
                ))
            })?;
        writer.flush()?;
        debug!("PNG written");
        Ok(())
    }

    /// Write the image as RGB JPEG, replacing any existing file.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), quality = quality))]
    pub fn save_jpeg(&self, path: impl AsRef<Path>, quality: u8) -> Result<(), WandlerError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let rgb = self.image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        rgb.write_with_encoder(encoder).map_err(|err| {
            WandlerError::ImageError(format!(
                "failed to save JPEG to {}: {}",
                path.display(),
                err
            ))
        })?;
        writer.flush()?;
        debug!("JPEG written");
        Ok(())
    }
}

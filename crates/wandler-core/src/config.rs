// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WandlerError};

/// Tunables for the conversion routines. Every field has a default, so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// JPEG encoder quality (1-100).
    pub jpeg_quality: u8,
    /// Resolution used to size the page when an image is written as PDF.
    pub pdf_resolution_dpi: f32,
    /// Resolution at which PDF pages are rasterized.
    pub raster_dpi: u32,
    /// Name or path of poppler's `pdftoppm` binary.
    pub pdftoppm_program: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 75,
            pdf_resolution_dpi: 100.0,
            raster_dpi: 200,
            pdftoppm_program: "pdftoppm".into(),
        }
    }
}

impl ConverterConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            WandlerError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WandlerError::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if !(self.pdf_resolution_dpi.is_finite() && self.pdf_resolution_dpi > 0.0) {
            return Err(WandlerError::Config(format!(
                "pdf_resolution_dpi must be positive, got {}",
                self.pdf_resolution_dpi
            )));
        }
        if self.raster_dpi == 0 {
            return Err(WandlerError::Config("raster_dpi must be positive".into()));
        }
        if self.pdftoppm_program.trim().is_empty() {
            return Err(WandlerError::Config("pdftoppm_program is empty".into()));
        }
        Ok(())
    }
}

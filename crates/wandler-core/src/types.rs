// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Wandler converter.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WandlerError};
use crate::registry;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Png,
    Jpg,
    Pdf,
    GeoJson,
    Shp,
}

/// Which conversion family a format belongs to. Conversions never cross
/// families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatFamily {
    /// Raster images and PDF documents.
    Document,
    /// Geospatial vector datasets.
    Vector,
}

impl FormatTag {
    /// Every format, in menu order.
    pub const ALL: [FormatTag; 5] = [
        FormatTag::Png,
        FormatTag::Jpg,
        FormatTag::Pdf,
        FormatTag::GeoJson,
        FormatTag::Shp,
    ];

    /// Canonical file extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Pdf => "pdf",
            Self::GeoJson => "geojson",
            Self::Shp => "shp",
        }
    }

    /// Short upper-case label for menus and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpg => "JPG",
            Self::Pdf => "PDF",
            Self::GeoJson => "GEOJSON",
            Self::Shp => "SHP",
        }
    }

    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Png | Self::Jpg | Self::Pdf => FormatFamily::Document,
            Self::GeoJson | Self::Shp => FormatFamily::Vector,
        }
    }

    /// Infer a format from a file extension (with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "pdf" => Some(Self::Pdf),
            "geojson" | "json" => Some(Self::GeoJson),
            "shp" => Some(Self::Shp),
            _ => None,
        }
    }

    /// Infer a format from a path. A `.zip` archive is taken to be a zipped
    /// Shapefile, since that is the only archive input the converter reads.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("zip") {
            return Some(Self::Shp);
        }
        Self::from_extension(ext)
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for FormatTag {
    type Err = WandlerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim())
            .ok_or_else(|| WandlerError::UserInput(format!("unknown format: {s}")))
    }
}

/// One conversion run: where to read, where to write, and the declared
/// formats on both ends.
///
/// Fields are private so that every request in circulation has passed
/// [`ConversionRequest::new`]; the dispatcher relies on that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    source_path: PathBuf,
    export_path: PathBuf,
    source_format: FormatTag,
    target_format: FormatTag,
}

impl ConversionRequest {
    /// Validate and build a request.
    ///
    /// Fails with [`WandlerError::UserInput`] when a path is missing and with
    /// [`WandlerError::UnsupportedConversion`] when the registry does not
    /// offer the pair. Identity pairs are accepted.
    pub fn new(
        source_path: impl Into<PathBuf>,
        export_path: impl Into<PathBuf>,
        source_format: FormatTag,
        target_format: FormatTag,
    ) -> Result<Self> {
        let source_path = source_path.into();
        let export_path = export_path.into();

        if source_path.as_os_str().is_empty() {
            return Err(WandlerError::UserInput("no input file selected".into()));
        }
        if export_path.as_os_str().is_empty() {
            return Err(WandlerError::UserInput("no export path selected".into()));
        }
        if !registry::is_supported(source_format, target_format) {
            return Err(WandlerError::UnsupportedConversion {
                from: source_format,
                to: target_format,
            });
        }

        Ok(Self {
            source_path,
            export_path,
            source_format,
            target_format,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    pub fn source_format(&self) -> FormatTag {
        self.source_format
    }

    pub fn target_format(&self) -> FormatTag {
        self.target_format
    }

    /// Source and target formats are the same.
    pub fn is_identity(&self) -> bool {
        self.source_format == self.target_format
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Wandler.

use thiserror::Error;

use crate::types::FormatTag;

/// Top-level error type for all Wandler operations.
#[derive(Debug, Error)]
pub enum WandlerError {
    // -- Request errors --
    /// Missing selection or unusable input; shown to the user verbatim.
    #[error("{0}")]
    UserInput(String),

    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion { from: FormatTag, to: FormatTag },

    #[error("conversion request has already been run")]
    AlreadyRun,

    // -- Codec errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("PDF rasterization failed: {0}")]
    RasterError(String),

    #[error("vector conversion failed: {0}")]
    VectorError(String),

    #[error("archive operation failed: {0}")]
    ArchiveError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error taxonomy used by front ends to decide how to present a
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Nothing selected, bad path, archive without the needed member.
    UserInput,
    /// An underlying reader or writer refused the data.
    Codec,
    /// The caller broke a contract (unsupported pair, request reused).
    InvariantViolation,
}

impl WandlerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UserInput(_) | Self::Config(_) => ErrorClass::UserInput,
            Self::UnsupportedConversion { .. } | Self::AlreadyRun => {
                ErrorClass::InvariantViolation
            }
            Self::ImageError(_)
            | Self::PdfError(_)
            | Self::RasterError(_)
            | Self::VectorError(_)
            | Self::ArchiveError(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorClass::Codec,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WandlerError>;

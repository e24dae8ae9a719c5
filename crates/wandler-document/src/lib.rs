// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wandler-document — Conversion engine for Wandler.
//
// Image codecs (PNG, JPEG), PDF creation and page rasterization, GeoJSON and
// Shapefile drivers over a shared feature model, zip handling for Shapefile
// sets, and the dispatcher that ties them to a `ConversionRequest`.

pub mod acquire;
pub mod archive;
pub mod convert;
pub mod image;
pub mod pdf;
pub mod vector;

// Re-export the primary types so callers can use `wandler_document::Converter` etc.
pub use acquire::{AcquiredInput, acquire};
pub use convert::{Completed, ConversionRun, ConversionState, Converter};
pub use image::processor::ImageProcessor;
pub use pdf::{PageRasterizer, PdfReader, PdfWriter, PopplerRasterizer};
pub use vector::{Feature, FeatureCollection, Geometry};

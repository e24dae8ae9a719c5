// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — inspecting, rasterizing, and creating PDFs.

pub mod raster;
pub mod reader;
pub mod writer;

pub use raster::{PageRasterizer, PopplerRasterizer};
pub use reader::PdfReader;
pub use writer::PdfWriter;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler — Core types, format registry and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::ConverterConfig;
pub use error::{ErrorClass, WandlerError};
pub use types::*;

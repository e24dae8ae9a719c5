// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input acquisition — turn the path the user picked into a path a driver can
// read. Zipped Shapefiles are unpacked into a scratch directory that lives
// exactly as long as the returned value.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, instrument};
use wandler_core::FormatTag;
use wandler_core::error::{Result, WandlerError};

use crate::archive;

/// A readable input path, plus the extraction directory backing it, if any.
///
/// Dropping the value removes the extraction directory.
#[derive(Debug)]
pub struct AcquiredInput {
    path: PathBuf,
    extraction: Option<TempDir>,
}

impl AcquiredInput {
    /// Path the conversion should read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory holding extracted archive members.
    pub fn extraction_dir(&self) -> Option<&Path> {
        self.extraction.as_ref().map(TempDir::path)
    }
}

/// Resolve `user_path` for reading as `source_format`.
///
/// A `.zip` given as Shapefile input is extracted and the first `.shp`
/// member in lexicographic order is returned. Any other input is returned
/// unchanged.
#[instrument(skip_all, fields(path = %user_path.display(), format = %source_format))]
pub fn acquire(user_path: &Path, source_format: FormatTag) -> Result<AcquiredInput> {
    if !user_path.is_file() {
        return Err(WandlerError::UserInput(format!(
            "input file not found: {}",
            user_path.display()
        )));
    }

    if source_format != FormatTag::Shp || !archive::is_archive(user_path) {
        return Ok(AcquiredInput {
            path: user_path.to_path_buf(),
            extraction: None,
        });
    }

    let scratch = tempfile::Builder::new().prefix("wandler-").tempdir()?;
    let members = archive::extract(user_path, scratch.path())?;
    debug!(members = members.len(), "Looking for a .shp member");

    let shp = members.into_iter().find(|member| {
        member
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
    });

    // On the error path `scratch` is dropped here, removing the directory.
    let Some(member) = shp else {
        return Err(WandlerError::UserInput("no shapefile in archive".into()));
    };

    let path = scratch.path().join(&member);
    info!(member = %member.display(), "Using shapefile from archive");
    Ok(AcquiredInput {
        path,
        extraction: Some(scratch),
    })
}

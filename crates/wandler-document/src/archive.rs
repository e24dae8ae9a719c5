// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip archives — unpacking zipped Shapefile input and packaging Shapefile
// sidecars into a single download.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use wandler_core::error::{Result, WandlerError};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Whether `path` names a zip archive, judged by extension only.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn archive_error(path: &Path, err: impl std::fmt::Display) -> WandlerError {
    WandlerError::ArchiveError(format!("{}: {}", path.display(), err))
}

/// Extract every member of `archive_path` into `dest` and return the
/// relative paths of the extracted files, sorted lexicographically.
///
/// Members whose names would escape `dest` are refused by the zip reader.
#[instrument(skip_all, fields(archive = %archive_path.display(), dest = %dest.display()))]
pub fn extract(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|err| archive_error(archive_path, err))?;

    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|err| archive_error(archive_path, err))?;
        if entry.is_dir() {
            continue;
        }
        if let Some(name) = entry.enclosed_name() {
            members.push(name.to_path_buf());
        }
    }

    archive
        .extract(dest)
        .map_err(|err| archive_error(archive_path, err))?;

    members.sort();
    info!(members = members.len(), "Archive extracted");
    Ok(members)
}

/// Write `files` into a new deflated zip at `zip_path`, each stored under its
/// bare file name. An existing archive at that path is replaced.
#[instrument(skip_all, fields(archive = %zip_path.display(), files = files.len()))]
pub fn package(files: &[PathBuf], zip_path: &Path) -> Result<()> {
    let out = File::create(zip_path)?;
    let mut zip = ZipWriter::new(out);

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WandlerError::ArchiveError(format!("unusable file name: {}", path.display()))
            })?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name, options)
            .map_err(|err| archive_error(zip_path, err))?;
        let mut source = File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
        debug!(member = name, "Packed");
    }

    zip.finish().map_err(|err| archive_error(zip_path, err))?;
    Ok(())
}

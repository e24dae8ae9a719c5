// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interactive form used when `wandler` is started without arguments: pick
// the input, the source and target formats, and the export path.

use std::path::{Path, PathBuf};

use dialoguer::{Input, Select};
use wandler_core::error::{Result, WandlerError};
use wandler_core::registry;
use wandler_core::{ConversionRequest, FormatTag};

fn prompt_error(err: dialoguer::Error) -> WandlerError {
    WandlerError::UserInput(format!("prompt failed: {}", err))
}

/// Walk the user through one conversion and return the validated request.
pub fn prompt_request() -> Result<ConversionRequest> {
    println!("=== Wandler ===");
    let input = prompt_input()?;
    let source = prompt_source(&input)?;
    let target = prompt_target(source)?;
    let export = prompt_export(&input, target)?;
    ConversionRequest::new(input, export, source, target)
}

fn prompt_input() -> Result<PathBuf> {
    let raw: String = Input::new()
        .with_prompt("Input file")
        .validate_with(|value: &String| -> std::result::Result<(), String> {
            if Path::new(value).is_file() {
                Ok(())
            } else {
                Err(format!("'{}' is not a file", value))
            }
        })
        .interact_text()
        .map_err(prompt_error)?;
    Ok(PathBuf::from(raw))
}

fn prompt_source(input: &Path) -> Result<FormatTag> {
    let sources = registry::source_formats();
    let labels: Vec<&str> = sources.iter().map(FormatTag::label).collect();
    let guessed = FormatTag::from_path(input)
        .and_then(|tag| sources.iter().position(|s| *s == tag))
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt("Convert from")
        .items(&labels)
        .default(guessed)
        .interact()
        .map_err(prompt_error)?;
    Ok(sources[index])
}

fn prompt_target(source: FormatTag) -> Result<FormatTag> {
    let targets = registry::allowed_targets(source);
    let labels: Vec<&str> = targets.iter().map(FormatTag::label).collect();

    // The first allowed target is pre-selected.
    let index = Select::new()
        .with_prompt("Convert to")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(prompt_error)?;
    Ok(targets[index])
}

fn prompt_export(input: &Path, target: FormatTag) -> Result<PathBuf> {
    let suggested = suggested_export(input, target);
    let raw: String = Input::new()
        .with_prompt("Export to")
        .default(suggested.display().to_string())
        .interact_text()
        .map_err(prompt_error)?;
    Ok(PathBuf::from(raw))
}

/// Input path with the target's extension, e.g. `scan.pdf` -> `scan.png`.
pub fn suggested_export(input: &Path, target: FormatTag) -> PathBuf {
    input.with_extension(target.extension())
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command line arguments and their translation into a conversion request.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wandler_core::error::{Result, WandlerError};
use wandler_core::registry;
use wandler_core::{ConversionRequest, FormatTag};

#[derive(Debug, Parser)]
#[command(
    name = "wandler",
    version,
    about = "Convert a single file between PNG, JPG, PDF, GeoJSON and Shapefile",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// File to convert (a .zip is read as a zipped Shapefile)
    pub input: Option<PathBuf>,

    /// Where to write the result
    pub export: Option<PathBuf>,

    /// Source format; inferred from the input extension when omitted
    #[arg(long)]
    pub from: Option<FormatTag>,

    /// Target format; defaults to the first target offered for the source
    #[arg(long)]
    pub to: Option<FormatTag>,

    /// JSON file with converter settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Do not draw a progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every source format and the targets it converts to
    Formats,
}

impl Cli {
    /// Build a validated request from the positional arguments and flags.
    pub fn request(&self) -> Result<ConversionRequest> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| WandlerError::UserInput("no input file selected".into()))?;
        let export = self
            .export
            .clone()
            .ok_or_else(|| WandlerError::UserInput("no export path selected".into()))?;

        let from = match self.from {
            Some(tag) => tag,
            None => FormatTag::from_path(&input).ok_or_else(|| {
                WandlerError::UserInput(format!(
                    "cannot tell the format of {}; pass --from",
                    input.display()
                ))
            })?,
        };
        let to = self.to.unwrap_or_else(|| registry::default_target(from));

        ConversionRequest::new(input, export, from, to)
    }
}

/// One line per source format, e.g. `PDF -> PNG, JPG`.
pub fn format_table() -> Vec<String> {
    registry::source_formats()
        .iter()
        .map(|source| {
            let targets: Vec<&str> = registry::allowed_targets(*source)
                .iter()
                .map(FormatTag::label)
                .collect();
            format!("{:<8} -> {}", source.label(), targets.join(", "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("wandler").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn infers_source_and_default_target() {
        let cli = parse(&["scan.pdf", "out.png"]);
        let request = cli.request().unwrap();
        assert_eq!(request.source_format(), FormatTag::Pdf);
        assert_eq!(request.target_format(), FormatTag::Png);
    }

    #[test]
    fn zip_input_means_shapefile() {
        let request = parse(&["roads.zip", "roads.geojson"]).request().unwrap();
        assert_eq!(request.source_format(), FormatTag::Shp);
        assert_eq!(request.target_format(), FormatTag::GeoJson);
    }

    #[test]
    fn explicit_formats_win() {
        let cli = parse(&["data.bin", "out", "--from", "png", "--to", "pdf"]);
        let request = cli.request().unwrap();
        assert_eq!(request.source_format(), FormatTag::Png);
        assert_eq!(request.target_format(), FormatTag::Pdf);
    }

    #[test]
    fn cross_family_pair_is_rejected() {
        let err = parse(&["a.png", "b.shp", "--to", "shp"])
            .request()
            .unwrap_err();
        assert!(matches!(err, WandlerError::UnsupportedConversion { .. }));
    }

    #[test]
    fn missing_export_is_user_error() {
        let err = parse(&["a.png"]).request().unwrap_err();
        assert_eq!(err.to_string(), "no export path selected");
    }

    #[test]
    fn unknown_extension_needs_from() {
        let err = parse(&["a.tiff", "b.png"]).request().unwrap_err();
        assert!(matches!(err, WandlerError::UserInput(_)));
    }

    #[test]
    fn unknown_format_flag_fails_to_parse() {
        assert!(Cli::try_parse_from(["wandler", "a.png", "b", "--to", "gif"]).is_err());
    }

    #[test]
    fn formats_subcommand() {
        let cli = parse(&["formats"]);
        assert!(matches!(cli.command, Some(Command::Formats)));
    }

    #[test]
    fn format_table_lists_every_source() {
        let table = format_table();
        assert_eq!(table.len(), FormatTag::ALL.len());
        assert!(table.iter().any(|line| line.starts_with("GEOJSON") && line.ends_with("SHP")));
    }
}

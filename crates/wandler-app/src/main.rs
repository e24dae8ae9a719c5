// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler — single-file converter for images, PDF, GeoJSON and Shapefile.
//
// Entry point. Parses arguments (or runs the interactive form), initialises
// logging, loads the converter configuration and runs one conversion.

mod cli;
mod interactive;
mod progress;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wandler_core::ConverterConfig;
use wandler_core::error::Result;
use wandler_document::{ConversionRun, Converter};

use cli::{Cli, Command};
use progress::ProgressReporter;

fn main() -> ExitCode {
    let interactive_mode = std::env::args_os().len() == 1;
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Some(Command::Formats) = cli.command {
        for line in cli::format_table() {
            println!("{line}");
        }
        return ExitCode::SUCCESS;
    }

    match run(&cli, interactive_mode) {
        Ok(status) => {
            println!("{status}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(class = ?err.class(), "Run aborted");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, interactive_mode: bool) -> Result<String> {
    let request = if interactive_mode {
        interactive::prompt_request()?
    } else {
        cli.request()?
    };
    let config = ConverterConfig::load_or_default(cli.config.as_deref())?;

    tracing::info!(
        from = %request.source_format(),
        to = %request.target_format(),
        input = %request.source_path().display(),
        export = %request.export_path().display(),
        "Wandler starting"
    );

    let message = format!("{} -> {}", request.source_format(), request.target_format());
    let reporter = ProgressReporter::new(message, cli.no_progress);
    let converter = Converter::new(config);
    let mut run = ConversionRun::new(request);

    let outcome = run.run(&converter, &mut |percent| reporter.update(percent));
    reporter.finish();

    let completed = outcome?;
    for path in &completed.outputs {
        tracing::info!(path = %path.display(), "Wrote");
    }
    Ok(run.status_text().to_string())
}

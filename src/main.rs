//! khdl - Download soundtrack albums from a music archive

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod config;
mod download;
mod error;
mod logging;
mod progress;
mod scrape;
mod tagging;
mod utils;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so the log file is flushed on exit
    let _log_guard = logging::init(cli.verbose, &cli.log_file);

    let code = match cli::commands::run(cli).await? {
        // Quit from the prompt
        None => ExitCode::SUCCESS,
        Some(run) if run.is_success() => ExitCode::SUCCESS,
        Some(_) => ExitCode::FAILURE,
    };

    Ok(code)
}

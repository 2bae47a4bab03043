//! CLI command handlers

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Input;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use super::Cli;
use crate::config::{self, Config, Overrides};
use crate::download::{AlbumResult, AlbumSummary, DownloadCoordinator, RunSummary};
use crate::progress;
use crate::scrape::album::parse_album_url;

const EXAMPLE_URL: &str = "https://downloads.khinsider.com/game-soundtracks/album/minecraft";

/// Handle a full run: settle the configuration, collect album URLs and
/// download them one album at a time
///
/// Returns `None` when the user quit from the interactive prompt.
pub async fn run(cli: Cli) -> Result<Option<RunSummary>> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = load_config(&config_path).with_overrides(&overrides(&cli));

    if cli.save_config {
        match config.save(&config_path) {
            Ok(()) => println!("Configuration saved to {}", config_path.display()),
            Err(e) => {
                warn!("{}", e);
                eprintln!("{} {}", "Could not save configuration:".red(), e);
            }
        }
    }

    let mut urls = Vec::new();
    if let Some(url) = &cli.url {
        urls.push(url.trim().to_string());
    }
    if let Some(path) = &cli.input_file {
        match read_url_list(path) {
            Ok(listed) => {
                info!("Read {} album URLs from {}", listed.len(), path.display());
                urls.extend(listed);
            }
            Err(e) => {
                error!("Could not read input file {}: {}", path.display(), e);
                eprintln!(
                    "{} {}: {}",
                    "Could not read input file".red(),
                    path.display(),
                    e
                );
            }
        }
    }

    if urls.is_empty() {
        match prompt_for_url()? {
            Some(url) => urls.push(url),
            None => return Ok(None),
        }
    }

    let coordinator = DownloadCoordinator::from_config(config.clone(), progress::detect())
        .context("Failed to set up the HTTP client")?;

    let run = download_all(&coordinator, &urls).await;

    info!(
        "Download finished: {}/{} albums complete",
        run.albums_complete(),
        run.albums.len()
    );
    println!();
    println!(
        "{} {}/{} albums complete",
        "Download finished:".green().bold(),
        run.albums_complete(),
        run.albums.len()
    );
    println!(
        "Albums are saved in: {}",
        config.output_directory.display().to_string().cyan()
    );

    Ok(Some(run))
}

/// Download albums one after another; a failed album never stops the rest
pub async fn download_all(coordinator: &DownloadCoordinator, urls: &[String]) -> RunSummary {
    let mut run = RunSummary::default();
    for url in urls {
        let result = match coordinator.download_album(url).await {
            Ok(summary) => AlbumResult::Finished(summary),
            Err(e) => {
                error!("Album {} failed: {}", url, e);
                AlbumResult::Aborted {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            }
        };
        print_album_result(&result);
        run.push(result);
    }
    run
}

/// Load the config file; a broken file is reported once and replaced by
/// the defaults
fn load_config(path: &Path) -> Config {
    match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}", e);
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            eprintln!("Continuing with default settings.");
            Config::default()
        }
    }
}

fn overrides(cli: &Cli) -> Overrides {
    Overrides {
        output_directory: cli.output_dir.clone(),
        max_threads: cli.threads.map(usize::from),
        format_preference: cli.format.as_deref().map(config::parse_format_list),
        no_track_numbers: cli.no_track_numbers,
        no_tags: cli.no_tags,
    }
}

fn read_url_list(path: &Path) -> std::io::Result<Vec<String>> {
    Ok(parse_url_list(&fs::read_to_string(path)?))
}

/// One URL per line; blank lines and `#` comments are skipped
fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Ask for a single album URL; `q` quits
fn prompt_for_url() -> Result<Option<String>> {
    println!();
    println!("{}", "khdl - album downloader".cyan().bold());
    println!("Enter an album URL (or 'q' to quit).");
    println!("Example: {}", EXAMPLE_URL.dimmed());

    let input: String = Input::new()
        .with_prompt("URL")
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if is_quit(input) || parse_album_url(input).is_ok() {
                Ok(())
            } else {
                Err("Invalid URL, enter a full http(s) album URL".to_string())
            }
        })
        .interact_text()
        .context("Failed to read album URL")?;

    if is_quit(&input) {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn is_quit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("q")
}

fn print_album_result(result: &AlbumResult) {
    println!();
    match result {
        AlbumResult::Finished(summary) => print_album_summary(summary),
        AlbumResult::Aborted { url, reason } => {
            println!("{} {}", "Album failed:".red().bold(), url);
            println!("  {}", reason);
        }
    }
}

fn print_album_summary(summary: &AlbumSummary) {
    let heading = if summary.is_complete() {
        summary.title.green().bold()
    } else {
        summary.title.yellow().bold()
    };
    println!("{}", heading);
    println!(
        "  Downloaded: {}  Skipped: {}  Failed: {}  (of {} tracks)",
        summary.succeeded,
        summary.skipped,
        summary.failed_count(),
        summary.total_tracks
    );

    if !summary.failed.is_empty() {
        println!("  {}", "Failed tracks:".red());
        for (index, track) in &summary.failed {
            println!("    #{} {}: {}", index, track.name, track.reason);
        }
    }
    println!("  Saved to: {}", summary.output_dir.display());
}

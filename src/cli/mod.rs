//! CLI module for khdl

use clap::Parser;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "khdl", about = "Download soundtrack albums from a music archive")]
#[command(version, author)]
pub struct Cli {
    /// Album page URL to download
    #[arg(short, long)]
    pub url: Option<String>,

    /// File with one album URL per line (blank lines and `#` comments ignored)
    #[arg(short, long, value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Output directory for this run
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,

    /// Preferred formats, most preferred first (e.g. `flac,mp3`)
    #[arg(short, long, value_name = "FORMATS")]
    pub format: Option<String>,

    /// Don't prefix file names with the track number
    #[arg(long)]
    pub no_track_numbers: bool,

    /// Don't write tags into downloaded files
    #[arg(long)]
    pub no_tags: bool,

    /// Save the effective configuration (including overrides)
    #[arg(long)]
    pub save_config: bool,

    /// Config file to load (and save to)
    #[arg(short, long, env = "KHDL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append log lines to this file
    #[arg(long, default_value = "khdl.log", value_name = "FILE")]
    pub log_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "khdl",
            "-u",
            "https://example.com/game-soundtracks/album/test",
            "-o",
            "/tmp/music",
            "-t",
            "5",
            "-f",
            "mp3,flac",
            "--no-track-numbers",
            "--save-config",
        ])
        .unwrap();

        assert_eq!(
            cli.url.as_deref(),
            Some("https://example.com/game-soundtracks/album/test")
        );
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/music")));
        assert_eq!(cli.threads, Some(5));
        assert_eq!(cli.format.as_deref(), Some("mp3,flac"));
        assert!(cli.no_track_numbers);
        assert!(cli.save_config);
        assert!(!cli.no_tags);
        assert_eq!(cli.log_file, PathBuf::from("khdl.log"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(Cli::try_parse_from(["khdl", "-t", "0"]).is_err());
    }

    #[test]
    fn test_no_arguments_is_valid() {
        let cli = Cli::try_parse_from(["khdl"]).unwrap();
        assert!(cli.url.is_none());
        assert!(cli.input_file.is_none());
    }
}

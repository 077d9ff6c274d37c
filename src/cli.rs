use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{MirrorOptions, DEFAULT_MAX_ASSET_SIZE, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(
    name = "page-mirror",
    about = "Mirror a single web page for offline viewing",
    version,
    long_about = "Downloads a page's HTML together with the stylesheets, scripts and images it references, and writes index_local.html pointing at the local copies."
)]
pub struct MirrorCommand {
    /// The URL of the page to mirror
    #[arg(required = true)]
    pub url: String,

    /// Output directory for the mirrored page
    #[arg(short, long, default_value = "./mirrored_page")]
    pub output_dir: PathBuf,

    /// Timeout for each request in seconds
    #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Maximum concurrent asset downloads
    #[arg(short = 'c', long, default_value = "8", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrent: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Remove output of earlier runs before mirroring
    #[arg(long)]
    pub clean: bool,

    /// Print the full result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when any asset failed
    #[arg(long)]
    pub strict: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl MirrorCommand {
    pub fn options(&self) -> MirrorOptions {
        MirrorOptions {
            timeout: Duration::from_secs(self.timeout),
            max_asset_size: DEFAULT_MAX_ASSET_SIZE,
            user_agent: self.user_agent.clone(),
            max_concurrent: self.max_concurrent as usize,
            clean_before_mirror: self.clean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_args() {
        let args = MirrorCommand::try_parse_from(["page-mirror", "https://example.com", "-o", "./output"]).unwrap();

        assert_eq!(args.url, "https://example.com");
        assert_eq!(args.output_dir, PathBuf::from("./output"));
        assert_eq!(args.timeout, 30);
        assert_eq!(args.max_concurrent, 8);
        assert!(!args.clean);
        assert!(!args.json);
        assert_eq!(args.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_parse_all_args() {
        let args = MirrorCommand::try_parse_from([
            "page-mirror",
            "https://example.com",
            "-o",
            "./output",
            "-t",
            "5",
            "-c",
            "2",
            "--user-agent",
            "test/1.0",
            "--clean",
            "--json",
            "--strict",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let options = args.options();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.max_concurrent, 2);
        assert_eq!(options.user_agent, "test/1.0");
        assert!(options.clean_before_mirror);
        assert!(args.json && args.strict);
        assert_eq!(LevelFilter::from(args.log_level), LevelFilter::Debug);
    }

    #[test]
    fn test_default_output_dir() {
        let args = MirrorCommand::try_parse_from(["page-mirror", "https://example.com"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("./mirrored_page"));
        assert_eq!(args.options().user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_parse_missing_url() {
        let result = MirrorCommand::try_parse_from(["page-mirror", "-o", "./output"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_concurrent() {
        let result = MirrorCommand::try_parse_from(["page-mirror", "https://example.com", "-c", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_timeout() {
        let result = MirrorCommand::try_parse_from(["page-mirror", "https://example.com", "-t", "0"]);
        assert!(result.is_err());
    }
}

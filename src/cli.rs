//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Default destination directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_PAGES: u32 = 50;
pub const DEFAULT_PAGE_DELAY_SECS: u64 = 2;
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Bulk download candidate resume PDFs from an authenticated session.
///
/// Reads candidate records from a JSON listing, resolves each profile to
/// its resume link, and saves validated PDFs named after the candidate.
#[derive(Parser, Debug)]
#[command(name = "resume-downloader")]
#[command(author, version, about)]
pub struct Cli {
    /// JSON listing of candidates: an array of records or {"pages": [[...]]}
    pub listing: PathBuf,

    /// Destination directory for resumes [env: DOWNLOAD_FOLDER]
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Maximum concurrent downloads (1-100) [env: DOWNLOAD_MAX_CONCURRENT]
    #[arg(short = 'c', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Retries per candidate after the first attempt (0-10) [env: DOWNLOAD_MAX_RETRIES]
    #[arg(short = 'r', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Per-attempt download timeout in seconds (1-3600) [env: DOWNLOAD_TIMEOUT_SECONDS]
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Maximum listing pages to read [env: EXTRACTION_MAX_PAGES]
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    /// Pause between listing pages in seconds [env: EXTRACTION_DELAY_SECONDS]
    #[arg(long, default_value_t = DEFAULT_PAGE_DELAY_SECS)]
    pub page_delay: u64,

    /// Profile page timeout in seconds [env: BROWSER_TIMEOUT_SECONDS]
    #[arg(long, default_value_t = DEFAULT_PAGE_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub page_timeout: u64,

    /// Netscape-format cookie file holding the logged-in session [env: SESSION_COOKIES_FILE]
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// URL that only loads for a logged-in session; probed before extraction [env: SESSION_CHECK_URL]
    #[arg(long)]
    pub session_check_url: Option<String>,

    /// Base URL for profile references given as paths
    #[arg(long)]
    pub base_url: Option<url::Url>,

    /// Treat profile references as direct document URLs (no page lookup)
    #[arg(long)]
    pub direct: bool,

    /// Report path (default: <output-dir>/download_report.json)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Also retry downloads that fail PDF validation
    #[arg(long)]
    pub retry_invalid: bool,

    /// Stop the download stage after this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub run_timeout: Option<u64>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("resume-downloader").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["candidates.json"]).unwrap();
        assert_eq!(cli.listing, PathBuf::from("candidates.json"));
        assert_eq!(cli.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(cli.concurrency, 3);
        assert_eq!(cli.max_retries, 3);
        assert_eq!(cli.timeout, 120);
        assert_eq!(cli.max_pages, 50);
        assert_eq!(cli.page_delay, 2);
        assert_eq!(cli.page_timeout, 30);
        assert!(cli.cookies.is_none());
        assert!(!cli.retry_invalid);
        assert!(!cli.direct);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_listing_is_required() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = parse(&["l.json", "-o", "out", "-c", "8", "-r", "0", "-t", "15", "-vv"]).unwrap();
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.concurrency, 8);
        assert_eq!(cli.max_retries, 0);
        assert_eq!(cli.timeout, 15);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert!(parse(&["l.json", "-c", "100"]).is_ok());
        let err = parse(&["l.json", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let err = parse(&["l.json", "-c", "101"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_retry_and_timeout_bounds() {
        assert!(parse(&["l.json", "-r", "10"]).is_ok());
        assert!(parse(&["l.json", "-r", "11"]).is_err());
        assert!(parse(&["l.json", "-t", "0"]).is_err());
        assert!(parse(&["l.json", "-t", "3601"]).is_err());
        assert!(parse(&["l.json", "--max-pages", "0"]).is_err());
    }

    #[test]
    fn test_cli_session_flags() {
        let cli = parse(&[
            "l.json",
            "--cookies",
            "cookies.txt",
            "--session-check-url",
            "https://ats.example/home",
            "--base-url",
            "https://ats.example/",
        ])
        .unwrap();
        assert_eq!(cli.cookies, Some(PathBuf::from("cookies.txt")));
        assert_eq!(cli.session_check_url.as_deref(), Some("https://ats.example/home"));
        assert_eq!(cli.base_url.unwrap().host_str(), Some("ats.example"));
    }

    #[test]
    fn test_cli_rejects_invalid_base_url() {
        assert!(parse(&["l.json", "--base-url", "not a url"]).is_err());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let err = parse(&["l.json", "-q", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_help_and_version() {
        assert_eq!(
            parse(&["--help"]).unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
        assert_eq!(
            parse(&["--version"]).unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }
}

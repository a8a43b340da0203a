//! Effective settings: command line, then environment, then built-in defaults.
//!
//! Clap fills every field with its default, so an environment value may only
//! replace a field whose `ValueSource` is not `CommandLine`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use resume_downloader::report::DEFAULT_REPORT_FILENAME;

use crate::cli::Cli;

pub(crate) const ENV_DOWNLOAD_FOLDER: &str = "DOWNLOAD_FOLDER";
pub(crate) const ENV_MAX_CONCURRENT: &str = "DOWNLOAD_MAX_CONCURRENT";
pub(crate) const ENV_TIMEOUT_SECONDS: &str = "DOWNLOAD_TIMEOUT_SECONDS";
pub(crate) const ENV_MAX_RETRIES: &str = "DOWNLOAD_MAX_RETRIES";
pub(crate) const ENV_MAX_PAGES: &str = "EXTRACTION_MAX_PAGES";
pub(crate) const ENV_PAGE_DELAY: &str = "EXTRACTION_DELAY_SECONDS";
pub(crate) const ENV_PAGE_TIMEOUT: &str = "BROWSER_TIMEOUT_SECONDS";
pub(crate) const ENV_COOKIES_FILE: &str = "SESSION_COOKIES_FILE";
pub(crate) const ENV_SESSION_CHECK_URL: &str = "SESSION_CHECK_URL";

/// Which fields were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) concurrency: bool,
    pub(crate) max_retries: bool,
    pub(crate) timeout: bool,
    pub(crate) max_pages: bool,
    pub(crate) page_delay: bool,
    pub(crate) page_timeout: bool,
    pub(crate) cookies: bool,
    pub(crate) session_check_url: bool,
}

impl CliValueSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            output_dir: is_commandline_value(matches, "output_dir"),
            concurrency: is_commandline_value(matches, "concurrency"),
            max_retries: is_commandline_value(matches, "max_retries"),
            timeout: is_commandline_value(matches, "timeout"),
            max_pages: is_commandline_value(matches, "max_pages"),
            page_delay: is_commandline_value(matches, "page_delay"),
            page_timeout: is_commandline_value(matches, "page_timeout"),
            cookies: is_commandline_value(matches, "cookies"),
            session_check_url: is_commandline_value(matches, "session_check_url"),
        }
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Parses the process arguments, exiting on `--help` or invalid input.
pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    (cli, CliValueSources::from_matches(&matches))
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) listing: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) report_path: PathBuf,
    pub(crate) concurrency: usize,
    pub(crate) max_retries: u32,
    pub(crate) timeout: Duration,
    pub(crate) max_pages: u32,
    pub(crate) page_delay: Duration,
    pub(crate) page_timeout: Duration,
    pub(crate) cookies: Option<PathBuf>,
    pub(crate) session_check_url: Option<String>,
    pub(crate) base_url: Option<url::Url>,
    pub(crate) direct: bool,
    pub(crate) retry_invalid: bool,
    pub(crate) run_timeout: Option<Duration>,
    pub(crate) show_progress: bool,
}

/// Applies environment values to fields not set on the command line.
///
/// `lookup` returns the value of an environment variable; empty values are
/// treated as unset.
///
/// # Errors
///
/// Returns an error naming the variable when an environment value does not
/// parse or is out of range.
pub(crate) fn resolve_settings(
    cli: Cli,
    sources: &CliValueSources,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let env = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let mut output_dir = cli.output_dir;
    if !sources.output_dir
        && let Some(folder) = env(ENV_DOWNLOAD_FOLDER)
    {
        output_dir = PathBuf::from(folder);
    }

    let concurrency = layered(sources.concurrency, u64::from(cli.concurrency), ENV_MAX_CONCURRENT, &env, 1..=100)?;
    let max_retries = layered(sources.max_retries, u64::from(cli.max_retries), ENV_MAX_RETRIES, &env, 0..=10)?;
    let timeout = layered(sources.timeout, cli.timeout, ENV_TIMEOUT_SECONDS, &env, 1..=3600)?;
    let max_pages = layered(sources.max_pages, u64::from(cli.max_pages), ENV_MAX_PAGES, &env, 1..=u64::from(u32::MAX))?;
    let page_delay = layered(sources.page_delay, cli.page_delay, ENV_PAGE_DELAY, &env, 0..=3600)?;
    let page_timeout = layered(sources.page_timeout, cli.page_timeout, ENV_PAGE_TIMEOUT, &env, 1..=3600)?;

    let cookies = if sources.cookies {
        cli.cookies
    } else {
        cli.cookies.or_else(|| env(ENV_COOKIES_FILE).map(PathBuf::from))
    };
    let session_check_url = if sources.session_check_url {
        cli.session_check_url
    } else {
        cli.session_check_url.or_else(|| env(ENV_SESSION_CHECK_URL))
    };
    if let Some(url) = &session_check_url {
        url::Url::parse(url).with_context(|| format!("invalid session check URL '{url}'"))?;
    }

    let report_path = cli
        .report
        .unwrap_or_else(|| output_dir.join(DEFAULT_REPORT_FILENAME));

    Ok(Settings {
        listing: cli.listing,
        output_dir,
        report_path,
        concurrency: usize::try_from(concurrency)?,
        max_retries: u32::try_from(max_retries)?,
        timeout: Duration::from_secs(timeout),
        max_pages: u32::try_from(max_pages)?,
        page_delay: Duration::from_secs(page_delay),
        page_timeout: Duration::from_secs(page_timeout),
        cookies,
        session_check_url,
        base_url: cli.base_url,
        direct: cli.direct,
        retry_invalid: cli.retry_invalid,
        run_timeout: cli.run_timeout.map(Duration::from_secs),
        show_progress: !cli.no_progress && !cli.quiet,
    })
}

/// Command-line value if explicit, else the environment value if set, else
/// the clap default already in `cli_value`.
fn layered(
    from_cli: bool,
    cli_value: u64,
    variable: &str,
    env: &impl Fn(&str) -> Option<String>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64> {
    if from_cli {
        return Ok(cli_value);
    }
    let Some(raw) = env(variable) else {
        return Ok(cli_value);
    };
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{variable}='{raw}' is not a non-negative integer"))?;
    if !range.contains(&value) {
        bail!(
            "{variable}={value} is out of range (expected {}..={})",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}

/// Log level used when `RUST_LOG` is not set.
pub(crate) fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

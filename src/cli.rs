//! Command-line interface definitions for token_snapshot.
//!
//! Every option has a default, so running the binary bare scrapes the live
//! listing headlessly and writes `latest_tokens.json` in the working
//! directory.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::extract::MAX_CARDS;
use crate::outputs::json::DEFAULT_OUTPUT;
use crate::scrapers::browser::{BrowserSettings, TARGET_URL};

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Live site, headless
/// token_snapshot
///
/// # Watch the browser work
/// token_snapshot --headed --slow-mo-ms 500
///
/// # Re-run extraction on a saved page with edited locators
/// token_snapshot --fixture page.html --locators locators.yaml -o /tmp/tokens.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Listing page to load; also the base for resolving links
    #[arg(long, default_value = TARGET_URL)]
    pub url: Url,

    /// File the JSON snapshot is written to
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Maximum number of cards to examine
    #[arg(long, default_value_t = MAX_CARDS)]
    pub limit: usize,

    /// Bound, in seconds, on navigation and on the network idle wait
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Pause after each browser step, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub slow_mo_ms: u64,

    /// Path to the Chrome/Chromium binary (detected when omitted)
    #[arg(long)]
    pub chrome: Option<PathBuf>,

    /// YAML file overriding field locators
    #[arg(short, long)]
    pub locators: Option<PathBuf>,

    /// Extract from a saved HTML file instead of launching a browser
    #[arg(short, long)]
    pub fixture: Option<PathBuf>,
}

impl Cli {
    /// Browser settings implied by the flags.
    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            headless: !self.headed,
            slow_mo: Duration::from_millis(self.slow_mo_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            chrome_executable: self.chrome.clone(),
            ..BrowserSettings::new(self.url.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["token_snapshot"]);

        assert_eq!(cli.url.as_str(), TARGET_URL);
        assert_eq!(cli.output, PathBuf::from("latest_tokens.json"));
        assert_eq!(cli.limit, 20);
        assert!(cli.locators.is_none());
        assert!(cli.fixture.is_none());

        let settings = cli.browser_settings();
        assert!(settings.headless);
        assert!(settings.slow_mo.is_zero());
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_cli_debug_flags() {
        let cli = Cli::parse_from([
            "token_snapshot",
            "--headed",
            "--slow-mo-ms",
            "500",
            "--timeout-secs",
            "5",
            "--chrome",
            "/usr/bin/chromium",
        ]);

        let settings = cli.browser_settings();
        assert!(!settings.headless);
        assert_eq!(settings.slow_mo, Duration::from_millis(500));
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(
            settings.chrome_executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "token_snapshot",
            "-o",
            "/tmp/tokens.json",
            "-f",
            "page.html",
            "-l",
            "locators.yaml",
        ]);

        assert_eq!(cli.output, PathBuf::from("/tmp/tokens.json"));
        assert_eq!(cli.fixture, Some(PathBuf::from("page.html")));
        assert_eq!(cli.locators, Some(PathBuf::from("locators.yaml")));
    }

    #[test]
    fn test_cli_rejects_bad_url() {
        assert!(Cli::try_parse_from(["token_snapshot", "--url", "not a url"]).is_err());
    }
}

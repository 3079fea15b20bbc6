//! Error taxonomy for a snapshot run.
//!
//! Every failure ends the run. [`ScrapeError`] keeps enough detail for the
//! log line; the console only ever sees a fixed failure message.

use std::error::Error as StdError;
use std::time::Duration;

use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Why a snapshot could not be taken.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Chrome could not be started or configured.
    #[error("failed to launch browser: {0}")]
    Launch(String),
    /// A CDP command failed (navigation, page creation, DOM serialization).
    #[error("browser error: {0}")]
    Browser(#[from] CdpError),
    /// A bounded wait ran out.
    #[error("timed out waiting for {stage} after {}s", .after.as_secs())]
    Timeout {
        /// Which step was waiting, e.g. `"navigation"` or `"network idle"`.
        stage: &'static str,
        /// The limit that was exceeded.
        after: Duration,
    },
    /// Reading a fixture, a locator file, or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A field locator did not compile.
    #[error("invalid locator `{field}`: {reason}")]
    Locator {
        /// Locator entry name, e.g. `"market_cap"`.
        field: &'static str,
        /// Parser message.
        reason: String,
    },
    /// The locator file was not valid YAML for [`crate::locators::Locators`].
    #[error("invalid locator file: {0}")]
    Config(#[from] serde_yaml::Error),
    /// Records could not be serialized.
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Render an error and its whole `source()` chain on one line.
pub fn error_chain(e: &dyn StdError) -> String {
    let mut out = e.to_string();
    let mut cur = e.source();
    while let Some(inner) = cur {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        cur = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_timeout_display() {
        let e = ScrapeError::Timeout {
            stage: "network idle",
            after: Duration::from_secs(60),
        };
        assert_eq!(e.to_string(), "timed out waiting for network idle after 60s");
    }

    #[test]
    fn test_error_chain_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "fixture.html missing");
        let e = ScrapeError::from(io);
        let chain = error_chain(&e);
        assert!(chain.starts_with("i/o error: fixture.html missing"));
        assert!(chain.ends_with(": fixture.html missing"));
    }

    #[test]
    fn test_locator_display_names_field() {
        let e = ScrapeError::Locator {
            field: "symbol",
            reason: "unexpected token".to_string(),
        };
        assert_eq!(e.to_string(), "invalid locator `symbol`: unexpected token");
        assert!(e.source().is_none());
    }

    #[test]
    fn test_yaml_error_converts_to_config() {
        let yaml = serde_yaml::from_str::<Vec<String>>("[unclosed").unwrap_err();
        let e = ScrapeError::from(yaml);
        assert!(matches!(e, ScrapeError::Config(_)));
        assert!(e.to_string().starts_with("invalid locator file: "));
        assert!(e.source().is_some());
    }
}

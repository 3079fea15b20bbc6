//! Static HTML stand-in for the live site.
//!
//! Reads a saved page from disk. Useful for checking locator edits against a
//! known document, and for reproducing a snapshot exactly.

use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use super::{PageSource, RenderedPage};
use crate::error::ScrapeError;

/// A [`PageSource`] backed by an HTML file.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
    url: Url,
}

impl FixtureSource {
    /// `url` is reported as the document URL so relative links resolve the
    /// same way they would on the live page.
    pub fn new(path: impl Into<PathBuf>, url: Url) -> Self {
        Self {
            path: path.into(),
            url,
        }
    }
}

impl PageSource for FixtureSource {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn render(&self) -> Result<RenderedPage, ScrapeError> {
        let html = fs::read_to_string(&self.path).await?;
        info!(bytes = html.len(), "Read fixture");
        Ok(RenderedPage {
            url: self.url.clone(),
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://fun.virtuals.io/").unwrap()
    }

    #[tokio::test]
    async fn test_reads_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/latest_cards.html");
        let page = FixtureSource::new(path, url()).render().await.unwrap();
        assert!(page.html.contains("card-container"));
        assert_eq!(page.url.as_str(), "https://fun.virtuals.io/");
    }

    #[tokio::test]
    async fn test_missing_fixture_is_io_error() {
        let source = FixtureSource::new("/nonexistent/latest_cards.html", url());
        assert!(matches!(source.render().await, Err(ScrapeError::Io(_))));
    }
}

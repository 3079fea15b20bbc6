//! Page acquisition and the snapshot entry point.
//!
//! Acquisition and extraction are split at the [`PageSource`] trait: a source
//! produces a rendered document, [`crate::extract`] turns it into records.
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Headless Chrome | [`browser`] | Live site, waits for network idle |
//! | HTML file | [`fixture`] | Static stand-in for the live site |

pub mod browser;
pub mod fixture;

use std::time::Instant;
use tracing::{error, info, instrument};
use url::Url;

use crate::error::{ScrapeError, error_chain};
use crate::extract::extract_tokens;
use crate::locators::CompiledLocators;
use crate::models::TokenRecord;

/// A fully rendered document and the URL it was loaded from.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final document URL, used to resolve relative links.
    pub url: Url,
    /// Serialized DOM.
    pub html: String,
}

/// Something that can produce the rendered listing page.
pub trait PageSource {
    /// Produce the document, releasing any resources it acquired on the way.
    async fn render(&self) -> Result<RenderedPage, ScrapeError>;
}

/// Take one snapshot of the latest tokens.
///
/// Either every record from the page or an error; never a partial list. The
/// error is logged here with its full chain before being returned.
///
/// # Arguments
///
/// * `source` - Where the rendered page comes from
/// * `locators` - Compiled field locators
/// * `limit` - Maximum number of cards to examine
#[instrument(level = "info", skip_all, fields(limit = limit))]
pub async fn fetch_latest<S: PageSource>(
    source: &S,
    locators: &CompiledLocators,
    limit: usize,
) -> Result<Vec<TokenRecord>, ScrapeError> {
    let t0 = Instant::now();

    let page = match source.render().await {
        Ok(page) => page,
        Err(e) => {
            error!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                error = %error_chain(&e),
                detail = ?e,
                "Snapshot failed"
            );
            return Err(e);
        }
    };

    let tokens = extract_tokens(&page.html, &page.url, locators, limit);
    info!(
        count = tokens.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        url = %page.url,
        "Snapshot taken"
    );
    Ok(tokens)
}

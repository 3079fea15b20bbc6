//! Named field locators for the listing page.
//!
//! The site styles cards with colour-coded utility classes
//! (`text-[#00FFA3]`, `text-white/50`, ...), which change whenever the design
//! does. Each field therefore gets a named entry here instead of a literal in
//! the extraction code. A YAML file can override any subset:
//!
//! ```yaml
//! symbol: 'p[class*="text-white/60"]'
//! market_cap_pattern: 'MCap\s*:\s*([0-9.]+[kKmMbB]?)'
//! ```

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::ScrapeError;

/// Selector and pattern strings, one per extracted field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Locators {
    /// Container element of one listing.
    pub card: String,
    pub name: String,
    pub symbol: String,
    /// Paragraph holding the `Market Cap: ...` label.
    pub market_cap: String,
    /// Regex applied to the market cap paragraph; capture group 1 is kept.
    pub market_cap_pattern: String,
    pub description: String,
    /// Tried when `description` yields nothing.
    pub description_fallback: String,
    pub created_time: String,
    /// Href prefix of creator profile links.
    pub profile_prefix: String,
    /// Href prefix of the agent page link wrapping a card.
    pub agent_prefix: String,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            card: "div.card-container".to_string(),
            name: "div.text-white p:first-child".to_string(),
            symbol: r#"p[class*="text-white/50"]"#.to_string(),
            market_cap: r#"p[class*="text-[#00FFA3]"]"#.to_string(),
            market_cap_pattern: r"Market Cap\s*:\s*([0-9.]+[kKmMbB]?)".to_string(),
            description: r#"p[class*="text-[#A0CFCB]"]"#.to_string(),
            description_fallback: "p.text-base".to_string(),
            created_time: r#"p[class*="text-[#FCE94B]"]:last-child"#.to_string(),
            profile_prefix: "/profile/".to_string(),
            agent_prefix: "/agents/".to_string(),
        }
    }
}

impl Locators {
    /// Read overrides from a YAML file; entries it omits keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ScrapeError> {
        let raw = fs::read_to_string(path).await?;
        let locators: Locators = serde_yaml::from_str(&raw)?;
        info!("Loaded field locators");
        Ok(locators)
    }

    /// CSS selector for the agent page anchor wrapping a card.
    pub fn agent_anchor(&self) -> String {
        href_prefix_selector(&self.agent_prefix)
    }

    /// Parse every selector and the market cap pattern.
    ///
    /// Fails on the first bad entry, naming it.
    pub fn compile(&self) -> Result<CompiledLocators, ScrapeError> {
        let market_cap_pattern =
            Regex::new(&self.market_cap_pattern).map_err(|e| ScrapeError::Locator {
                field: "market_cap_pattern",
                reason: e.to_string(),
            })?;
        if market_cap_pattern.captures_len() < 2 {
            return Err(ScrapeError::Locator {
                field: "market_cap_pattern",
                reason: "pattern needs a capture group for the value".to_string(),
            });
        }

        Ok(CompiledLocators {
            card: selector("card", &self.card)?,
            name: selector("name", &self.name)?,
            symbol: selector("symbol", &self.symbol)?,
            market_cap: selector("market_cap", &self.market_cap)?,
            market_cap_pattern,
            description: selector("description", &self.description)?,
            description_fallback: selector("description_fallback", &self.description_fallback)?,
            created_time: selector("created_time", &self.created_time)?,
            profile_link: selector("profile_prefix", &href_prefix_selector(&self.profile_prefix))?,
            profile_prefix: self.profile_prefix.clone(),
            agent_link: selector("agent_prefix", &self.agent_anchor())?,
            agent_prefix: self.agent_prefix.clone(),
        })
    }
}

/// Ready-to-use form of [`Locators`].
#[derive(Debug)]
pub struct CompiledLocators {
    pub card: Selector,
    pub name: Selector,
    pub symbol: Selector,
    pub market_cap: Selector,
    pub market_cap_pattern: Regex,
    pub description: Selector,
    pub description_fallback: Selector,
    pub created_time: Selector,
    pub profile_link: Selector,
    pub profile_prefix: String,
    pub agent_link: Selector,
    pub agent_prefix: String,
}

fn selector(field: &'static str, css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Locator {
        field,
        reason: e.to_string(),
    })
}

/// `a[href^="<prefix>"]`
fn href_prefix_selector(prefix: &str) -> String {
    format!(r#"a[href^="{}"]"#, prefix.replace('"', "\\\""))
}

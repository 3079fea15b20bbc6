//! Data models for scraped token listings.
//!
//! - [`TokenRecord`]: One card from the listing page
//! - [`LinkRef`]: A link found on a card, with the address parsed out of it
//!
//! Field names serialize in camelCase so the output file keeps the shape
//! downstream consumers already read (`marketCap`, `createdTime`, ...).

use serde::{Deserialize, Serialize};

/// A link pulled from a card.
///
/// `href` is the attribute exactly as written in the page; `address` is the
/// text following the route prefix (`/profile/` or `/agents/`) once the href
/// has been resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkRef {
    /// Raw `href` attribute value.
    pub href: String,
    /// Text after the route prefix, usually a wallet or contract address.
    pub address: String,
}

/// One token listing as scraped from a card element.
///
/// Every text field is trimmed and may be empty; a record only makes it into
/// a snapshot when [`TokenRecord::is_listed`] holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Display name of the token.
    pub name: String,
    /// Ticker, as shown on the card (often prefixed with `$`).
    pub symbol: String,
    /// Market cap value with optional unit suffix, e.g. `12.3k`.
    pub market_cap: String,
    /// Short free-text description.
    pub description: String,
    /// Relative or absolute creation time, as displayed.
    pub created_time: String,
    /// Creator profile link, if the card has one.
    pub profile_link: Option<LinkRef>,
    /// Agent page link wrapping the card, if any.
    pub agent_link: Option<LinkRef>,
}

impl TokenRecord {
    /// Whether this card carries enough to be worth keeping.
    ///
    /// Skeleton and placeholder cards render with neither a name nor a
    /// symbol; those are dropped.
    pub fn is_listed(&self) -> bool {
        !self.name.is_empty() || !self.symbol.is_empty()
    }
}

//! Card extraction over a parsed DOM.
//!
//! Everything here is a pure function of the HTML and the compiled locators:
//! no browser, no I/O. The browser only has to hand over the rendered
//! document.
//!
//! Queries follow DOM semantics: [`query_selector`] searches descendants of a
//! card (never the card itself), [`closest`] walks from the card up through
//! its ancestors. A card carrying [`AGENT_HREF_ATTR`] takes its agent link
//! from that attribute, since serialized HTML cannot keep the card inside a
//! nested agent anchor.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use crate::locators::CompiledLocators;
use crate::models::{LinkRef, TokenRecord};

/// Upper bound on cards examined per snapshot.
pub const MAX_CARDS: usize = 20;

/// Card attribute holding the href of the agent anchor the card sat in.
pub const AGENT_HREF_ATTR: &str = "data-agent-href";

/// Extract token records from a rendered listing page.
///
/// Looks at the first `limit` cards in document order and keeps those with a
/// name or a symbol. The cap applies before filtering, so placeholder cards
/// still use up slots.
///
/// # Arguments
///
/// * `html` - Serialized document
/// * `base` - URL the document was loaded from, used to resolve hrefs
/// * `locators` - Field locators
/// * `limit` - Maximum number of cards to look at
#[instrument(level = "info", skip_all, fields(%base, limit = limit))]
pub fn extract_tokens(
    html: &str,
    base: &Url,
    locators: &CompiledLocators,
    limit: usize,
) -> Vec<TokenRecord> {
    let document = Html::parse_document(html);
    let cards: Vec<ElementRef> = document.select(&locators.card).collect();
    info!(count = cards.len(), "Found card elements");

    let mut tokens = Vec::new();
    for (index, card) in cards.into_iter().take(limit).enumerate() {
        let token = extract_card(card, base, locators);
        debug!(index, ?token, "Extracted card");
        if token.is_listed() {
            tokens.push(token);
        }
    }

    info!(count = tokens.len(), "Kept token records");
    tokens
}

/// Apply every field rule to one card.
pub fn extract_card(card: ElementRef, base: &Url, locators: &CompiledLocators) -> TokenRecord {
    let description = match text_of(card, &locators.description) {
        primary if !primary.is_empty() => primary,
        _ => text_of(card, &locators.description_fallback),
    };

    TokenRecord {
        name: text_of(card, &locators.name),
        symbol: text_of(card, &locators.symbol),
        market_cap: market_cap(card, locators),
        description,
        created_time: text_of(card, &locators.created_time),
        profile_link: query_selector(card, &locators.profile_link)
            .and_then(|a| a.value().attr("href"))
            .map(|href| link_ref(href, &locators.profile_prefix, base)),
        agent_link: card
            .value()
            .attr(AGENT_HREF_ATTR)
            .or_else(|| closest(card, &locators.agent_link).and_then(|a| a.value().attr("href")))
            .map(|href| link_ref(href, &locators.agent_prefix, base)),
    }
}

fn market_cap(card: ElementRef, locators: &CompiledLocators) -> String {
    let Some(p) = query_selector(card, &locators.market_cap) else {
        return String::new();
    };
    let text = text_content(p);
    locators
        .market_cap_pattern
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// First descendant of `scope` matching `selector`, in document order.
pub fn query_selector<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).find(|el| el.id() != scope.id())
}

/// `element` itself or its nearest ancestor matching `selector`.
pub fn closest<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| selector.matches(el))
}

/// Concatenated text of an element and its descendants, trimmed.
pub fn text_content(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn text_of(scope: ElementRef, selector: &Selector) -> String {
    query_selector(scope, selector)
        .map(text_content)
        .unwrap_or_default()
}

/// Build a [`LinkRef`] from a raw href.
///
/// The address is whatever follows `prefix` in the resolved URL, up to the
/// next occurrence of `prefix` if the path repeats it.
fn link_ref(href: &str, prefix: &str, base: &Url) -> LinkRef {
    let resolved = match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    };
    let address = resolved.split(prefix).nth(1).unwrap_or_default().to_string();

    LinkRef {
        href: href.to_string(),
        address,
    }
}

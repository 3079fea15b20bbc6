//! Human-readable console summary of a snapshot.

use std::fmt::Write;
use url::Url;

use crate::models::{LinkRef, TokenRecord};
use crate::utils::truncate_chars;

const RULE: &str = "--------------------------------------------------";

/// Characters of description shown per record.
pub const DESCRIPTION_PREVIEW: usize = 100;

/// Render the numbered summary printed after a successful run.
///
/// Links are shown absolute, prefixed with the origin of `base`.
pub fn render(tokens: &[TokenRecord], base: &Url) -> String {
    let host = base.host_str().unwrap_or(base.as_str());
    let origin = base.origin().ascii_serialization();
    let mut out = String::new();

    if tokens.is_empty() {
        writeln!(out, "\nNo tokens found on {host}.").unwrap();
        return out;
    }

    writeln!(out, "\nLatest {} tokens from {host}:", tokens.len()).unwrap();
    writeln!(out, "{RULE}").unwrap();
    for (i, token) in tokens.iter().enumerate() {
        writeln!(out, "{}. Name: {}", i + 1, token.name).unwrap();
        writeln!(out, "   Symbol: {}", token.symbol).unwrap();
        writeln!(out, "   Market Cap: {}", token.market_cap).unwrap();
        writeln!(out, "   Created: {}", token.created_time).unwrap();
        if let Some(link) = &token.profile_link {
            write_link(&mut out, "Profile", &origin, link);
        }
        if let Some(link) = &token.agent_link {
            write_link(&mut out, "Agent", &origin, link);
        }
        writeln!(
            out,
            "   Description: {}...",
            truncate_chars(&token.description, DESCRIPTION_PREVIEW)
        )
        .unwrap();
        writeln!(out, "{RULE}").unwrap();
    }
    out
}

fn write_link(out: &mut String, label: &str, origin: &str, link: &LinkRef) {
    writeln!(out, "   {label}: {origin}{}", link.href).unwrap();
    writeln!(out, "   {label} Address: {}", link.address).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://fun.virtuals.io/").unwrap()
    }

    fn token(name: &str) -> TokenRecord {
        TokenRecord {
            name: name.to_string(),
            symbol: format!("${}", name.to_uppercase()),
            market_cap: "12.3k".to_string(),
            created_time: "2h ago".to_string(),
            ..TokenRecord::default()
        }
    }

    #[test]
    fn test_render_numbers_records() {
        let out = render(&[token("alpha"), token("beta")], &base());
        assert!(out.starts_with("\nLatest 2 tokens from fun.virtuals.io:\n"));
        assert!(out.contains("1. Name: alpha\n   Symbol: $ALPHA\n   Market Cap: 12.3k\n"));
        assert!(out.contains("2. Name: beta\n"));
        assert!(!out.contains("Profile"));
        assert!(!out.contains("Agent"));
    }

    #[test]
    fn test_render_links_with_origin() {
        let mut t = token("alpha");
        t.profile_link = Some(LinkRef {
            href: "/profile/0xABC".to_string(),
            address: "0xABC".to_string(),
        });
        t.agent_link = Some(LinkRef {
            href: "/agents/0xDEF".to_string(),
            address: "0xDEF".to_string(),
        });

        let out = render(&[t], &base());
        assert!(out.contains("   Profile: https://fun.virtuals.io/profile/0xABC\n"));
        assert!(out.contains("   Profile Address: 0xABC\n"));
        assert!(out.contains("   Agent: https://fun.virtuals.io/agents/0xDEF\n"));
        assert!(out.contains("   Agent Address: 0xDEF\n"));
    }

    #[test]
    fn test_description_is_cut_to_preview() {
        let mut t = token("alpha");
        t.description = "é".repeat(150);

        let out = render(&[t], &base());
        let expected = format!("   Description: {}...\n", "é".repeat(DESCRIPTION_PREVIEW));
        assert!(out.contains(&expected));
    }

    #[test]
    fn test_empty_snapshot_message() {
        assert_eq!(render(&[], &base()), "\nNo tokens found on fun.virtuals.io.\n");
    }
}

//! # token_snapshot
//!
//! Takes a one-shot snapshot of the most recently listed tokens on
//! [fun.virtuals.io](https://fun.virtuals.io/) and writes them to
//! `latest_tokens.json`.
//!
//! The listing is rendered client-side, so the page is loaded in headless
//! Chrome, left to settle until the network goes quiet, and the resulting DOM
//! is handed to a pure extractor that reads up to 20 cards.
//!
//! ## Usage
//!
//! ```sh
//! token_snapshot
//! token_snapshot --fixture saved_page.html -o /tmp/tokens.json
//! ```
//!
//! ## Flow
//!
//! 1. **Render**: a [`scrapers::PageSource`] produces the document
//! 2. **Extract**: [`extract::extract_tokens`] maps cards to records
//! 3. **Report**: print a numbered summary, then overwrite the JSON file
//!
//! A failed run prints a fixed message and leaves the output file alone.

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod extract;
mod locators;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use locators::{CompiledLocators, Locators};
use outputs::{json, summary};
use scrapers::browser::BrowserSource;
use scrapers::fixture::FixtureSource;
use scrapers::{PageSource, fetch_latest};
use utils::ensure_writable_parent;

/// Install the global tracing subscriber. Call once, first thing in `main`.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let start_time = Instant::now();
    let args = Cli::parse();
    info!(?args, "token_snapshot starting up");

    if let Err(e) = ensure_writable_parent(&args.output).await {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output location is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let locators = match &args.locators {
        Some(path) => Locators::load(path).await?,
        None => Locators::default(),
    };
    let compiled = locators.compile()?;

    let saved = match &args.fixture {
        Some(path) => {
            let source = FixtureSource::new(path, args.url.clone());
            run_snapshot(&source, &compiled, &args).await
        }
        None => {
            let source = BrowserSource::new(args.browser_settings(), &locators);
            run_snapshot(&source, &compiled, &args).await
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        saved = saved.unwrap_or(0),
        succeeded = saved.is_some(),
        "Execution complete"
    );
    Ok(())
}

/// Take a snapshot, print it, and save it.
///
/// Returns the number of records saved, or `None` when the snapshot failed or
/// could not be written. Nothing is written on a failed snapshot.
#[instrument(level = "info", skip_all)]
async fn run_snapshot<S: PageSource>(
    source: &S,
    locators: &CompiledLocators,
    args: &Cli,
) -> Option<usize> {
    let tokens = match fetch_latest(source, locators, args.limit).await {
        Ok(tokens) => tokens,
        Err(_) => {
            println!("Failed to retrieve tokens.");
            return None;
        }
    };

    print!("{}", summary::render(&tokens, &args.url));

    match json::write_tokens(&tokens, &args.output).await {
        Ok(()) => {
            println!("\nToken data saved to {}", args.output.display());
            Some(tokens.len())
        }
        Err(e) => {
            error!(path = %args.output.display(), error = %e, "Failed to write JSON");
            println!("Failed to save token data to {}", args.output.display());
            None
        }
    }
}

//! JSON output of a snapshot.
//!
//! The file is a bare array of [`TokenRecord`] objects, pretty-printed with a
//! four-space indent and non-ASCII text left as-is. Each run overwrites it.
//!
//! ```text
//! [
//!     {
//!         "name": "Alpha Agent",
//!         "symbol": "$ALPHA",
//!         "marketCap": "12.3k",
//!         ...
//!     }
//! ]
//! ```

use crate::error::ScrapeError;
use crate::models::TokenRecord;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Default output file, relative to the working directory.
pub const DEFAULT_OUTPUT: &str = "latest_tokens.json";

/// Serialize records the way they are written to disk.
pub fn to_pretty_json(tokens: &[TokenRecord]) -> Result<Vec<u8>, ScrapeError> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    tokens.serialize(&mut ser)?;
    Ok(buf)
}

/// Write records to `path`, replacing any previous snapshot.
///
/// Missing parent directories are created first.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = tokens.len()))]
pub async fn write_tokens(tokens: &[TokenRecord], path: &Path) -> Result<(), ScrapeError> {
    let json = to_pretty_json(tokens)?;
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }
    info!(bytes = json.len(), "Writing JSON");
    fs::write(path, json).await?;
    info!("Wrote token snapshot");
    Ok(())
}

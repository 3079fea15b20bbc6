//! Output generation for a snapshot.
//!
//! # Submodules
//!
//! - [`json`]: Writes the records to `latest_tokens.json`
//! - [`summary`]: Renders the numbered console summary
//!
//! Both are only reached after a successful snapshot; a failed run leaves the
//! previous output file untouched.

pub mod json;
pub mod summary;

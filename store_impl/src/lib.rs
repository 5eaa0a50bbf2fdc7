//! # Padrón Store
//!
//! Storage backend implementations for the Padrón voter registry.
//!
//! Two structurally different stores implement the
//! [`VoterBackend`](padron_core::VoterBackend) contract:
//!
//! - [`DocumentBackend`] — an embedded document store on LMDB (via `heed`)
//!   that resolves and embeds each person's location at load time, so
//!   queries and aggregations never join.
//! - [`RelationalBackend`] — SQLite (via `rusqlite`) with a normalized
//!   foreign-key schema; aggregations are filtered counts joining people to
//!   locations.
//!
//! Both must return identical results for every shared operation — the
//! cross-backend equivalence suite in `tests/backend_equivalence.rs` holds
//! them to that.
//!
//! [`open_backend`] is the backend selector: it turns the `[storage]`
//! configuration section into a boxed trait object, once per process
//! lifetime.

pub mod document;
pub mod relational;

pub use document::DocumentBackend;
pub use relational::RelationalBackend;

use anyhow::Result;
use padron_config::{StorageConfig, BACKEND_DOCUMENT, BACKEND_RELATIONAL};
use padron_core::VoterBackend;

/// Create the backend named by the configuration.
///
/// Fails fast on an unknown backend name; `PadronConfig::validate` rejects
/// the same values, so reaching the error here means the config was built
/// without validation.
pub fn open_backend(config: &StorageConfig) -> Result<Box<dyn VoterBackend>> {
    match config.backend.as_str() {
        BACKEND_DOCUMENT => Ok(Box::new(DocumentBackend::open(&config.document)?)),
        BACKEND_RELATIONAL => Ok(Box::new(RelationalBackend::open(&config.relational)?)),
        other => anyhow::bail!(
            "Unknown storage backend '{}': expected '{}' or '{}'",
            other,
            BACKEND_DOCUMENT,
            BACKEND_RELATIONAL
        ),
    }
}

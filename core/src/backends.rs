//! # Pluggable Backend Trait
//!
//! Defines the [`VoterBackend`] trait that decouples the ingestion pipeline
//! and the serving layer from the concrete store. Two structurally different
//! implementations exist in the `padron_store` crate:
//!
//! - `DocumentBackend` — embedded document store (LMDB) that denormalizes
//!   location data into each person document at load time and aggregates by
//!   scanning embedded fields.
//! - `RelationalBackend` — SQLite with a normalized foreign-key schema and
//!   joined filtered-count aggregation.
//!
//! The [`BackendRegistry`] holds the selected backend as a boxed trait
//! object, providing a single entry point for all storage operations. The
//! factory function in `padron_store` creates the backend from
//! configuration; the choice is made once per process lifetime.
//!
//! # Consistency invariant
//!
//! Every operation must behave identically across implementations. In
//! particular [`VoterBackend::get_voter_statistics`] must return the same
//! ten counts for the same dataset regardless of which backend computed
//! them.

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::types::{
    LoadStats, Location, NewVoter, PersonRecord, Voter, VoterStatistics, VoterSummary,
};

/// Storage backend for the voter registry.
///
/// Implementations must be safe to call from multiple ingestion workers
/// concurrently; a backend whose underlying connection is not itself
/// thread-safe serializes its writes internally while callers keep parsing
/// in parallel.
pub trait VoterBackend: Send + Sync {
    /// Idempotent bulk insert of locations. A location whose electoral code
    /// is already present is skipped, never overwritten.
    fn load_locations(&self, batch: &[Location]) -> anyhow::Result<LoadStats>;

    /// Idempotent bulk insert of people. A person whose location reference
    /// does not resolve is dropped (counted in
    /// [`LoadStats::dropped`](crate::types::LoadStats)); a duplicate
    /// identification is skipped.
    fn load_people(&self, batch: &[PersonRecord]) -> anyhow::Result<LoadStats>;

    /// Fuzzy search. A non-empty `identification` filters by identification
    /// substring; otherwise a non-empty `name` filters by substring of the
    /// upper-cased full name; otherwise the result is empty. Exactly one
    /// filter is ever applied.
    fn search_voters(&self, identification: &str, name: &str)
        -> anyhow::Result<Vec<VoterSummary>>;

    /// Exact lookup with the voter's location resolved. A miss is `Ok(None)`,
    /// not an error.
    fn get_voter(&self, identification: &str) -> anyhow::Result<Option<Voter>>;

    /// Manual add-voter flow: resolve the location triple (failing with
    /// [`StoreError::LocationNotResolved`] if it matches nothing), normalize
    /// the derived fields, insert, and return the identification. A
    /// duplicate identification is a no-op (first write wins).
    fn add_voter(&self, voter: &NewVoter) -> Result<String, StoreError>;

    /// Remove a voter if present; absence is a successful no-op.
    fn delete_voter(&self, identification: &str) -> anyhow::Result<()>;

    /// The fixed-order aggregate counts for the given expiration date and
    /// location scope. Zero-match aggregations return zeros.
    fn get_voter_statistics(
        &self,
        expiration: NaiveDate,
        location: &Location,
    ) -> anyhow::Result<VoterStatistics>;

    /// Exact location lookup by electoral code.
    fn get_location(&self, elec_code: &str) -> anyhow::Result<Option<Location>>;

    /// Resolve a province/canton/district triple to its stored location.
    fn find_location(
        &self,
        province: &str,
        canton: &str,
        district: &str,
    ) -> anyhow::Result<Option<Location>>;
}

/// Holds the backend selected at startup.
///
/// The registry is the single entry point for all storage operations: the
/// ingestion pipeline and the serving layer each receive a reference to it
/// instead of reaching for process-global state.
///
/// # Example
///
/// ```ignore
/// let registry = BackendRegistry::new(Box::new(document_backend));
/// registry.store().get_voter("102340567")?;
/// ```
pub struct BackendRegistry {
    store: Box<dyn VoterBackend>,
}

impl BackendRegistry {
    /// Wrap the selected backend.
    pub fn new(store: Box<dyn VoterBackend>) -> Self {
        Self { store }
    }

    /// Access the active backend.
    pub fn store(&self) -> &dyn VoterBackend {
        self.store.as_ref()
    }
}

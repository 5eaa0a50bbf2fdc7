//! Error taxonomy shared by the parsers, the ingestion pipeline, and the
//! storage backends.
//!
//! Lookup misses are *not* errors: `get_voter` returns `Ok(None)` and
//! `search_voters` returns an empty vec. Errors here mark malformed input
//! (skipped and logged by the pipeline), an unresolvable location triple in
//! the manual add flow, or a backend/query failure.

/// A registry line that cannot be turned into a record.
///
/// The ingestion pipeline skips the offending line, logs it, and continues
/// with the rest of the batch.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// Wrong number of comma-separated fields.
    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A field that must be numeric was not.
    #[error("non-numeric value in field '{field}': {value:?}")]
    NonNumeric { field: &'static str, value: String },

    /// An 8-digit date string naming no valid calendar date.
    #[error("invalid expiration date {value:?}")]
    InvalidDate { value: String },
}

/// Failures raised by storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The province/canton/district triple handed to `add_voter` matched no
    /// stored location. Distinct from a lookup miss so callers can report
    /// it as a rejected input rather than an empty result.
    #[error("no location matches {province}/{canton}/{district}")]
    LocationNotResolved {
        province: String,
        canton: String,
        district: String,
    },

    /// Connection or query failure in the underlying store.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

//! # Padrón Core
//!
//! Core types, traits, and pure functions for the Padrón voter registry.
//!
//! This crate defines the shared abstractions that storage backend
//! implementations must conform to, the domain data model (locations and
//! people with derived fields), the positional line parsers for the two
//! registry file formats, and the file partitioner used by the ingestion
//! pipeline.
//!
//! # Backend Trait
//!
//! The [`backends`] module defines the pluggable
//! [`VoterBackend`](backends::VoterBackend) trait that decouples the
//! ingestion pipeline and the serving layer from the concrete store,
//! enabling backend selection via configuration.

pub mod backends;
pub mod error;
pub mod partition;
pub mod record;
pub mod types;

pub use backends::{BackendRegistry, VoterBackend};
pub use error::{ParseError, StoreError};
pub use partition::partition;
pub use record::{derive_gender, parse_expiration_date, parse_location_line, parse_person_line};
pub use types::{
    normalize, Gender, LoadStats, Location, NewVoter, PersonRecord, Voter, VoterStatistics,
    VoterSummary, VOTING_BOARD_SENTINEL,
};

//! # Padrón Ingest
//!
//! Concurrent decoding and bulk-load pipeline for the two registry files.
//!
//! The pipeline reads the electoral-location roster and the citizen roster
//! (legacy single-byte encoded, comma-delimited, one record per line),
//! partitions each into fixed-size chunks, parses the chunks on bounded
//! worker pools, and hands each parsed batch to the configured storage
//! backend as one bulk-load call.
//!
//! The location phase always completes before the person phase starts:
//! person records resolve their location reference at load time.

pub mod decode;
pub mod pipeline;

pub use decode::read_legacy_lines;
pub use pipeline::{IngestReport, IngestionPipeline};

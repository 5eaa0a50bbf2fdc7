//! # Padrón Config
//!
//! Configuration system for the Padrón voter registry.
//!
//! Provides TOML-based configuration parsing and validation for logging, the
//! storage backend selection, and the ingestion pipeline tuning parameters.
//!
//! # Configuration Schema
//!
//! The configuration file (`padron.toml`) supports the following sections:
//! - `log_level` — tracing filter directive (default: "info")
//! - `[storage]` — backend selection and per-backend settings
//! - `[ingest]` — worker pool sizes and chunk sizes for the two phases
//!
//! # Environment Variable Overrides
//!
//! Config fields can be overridden via environment variables using the
//! `PADRON_` prefix and `_` as section separator:
//! - `PADRON_LOG_LEVEL` → `log_level`
//! - `PADRON_STORAGE_BACKEND` → `storage.backend`
//! - `PADRON_STORAGE_DOCUMENT_DATA_DIR` → `storage.document.data_dir`
//! - `PADRON_STORAGE_RELATIONAL_DB_PATH` → `storage.relational.db_path`
//! - `PADRON_INGEST_LOCATION_WORKERS` → `ingest.location_workers`
//! - `PADRON_INGEST_PERSON_WORKERS` → `ingest.person_workers`
//! - `PADRON_INGEST_LOCATION_CHUNK_LINES` → `ingest.location_chunk_lines`
//! - `PADRON_INGEST_PERSON_CHUNK_LINES` → `ingest.person_chunk_lines`

use serde::{Deserialize, Serialize};

/// Name of the embedded document store backend.
pub const BACKEND_DOCUMENT: &str = "document";
/// Name of the relational (SQLite) backend.
pub const BACKEND_RELATIONAL: &str = "relational";

/// Top-level Padrón configuration.
///
/// Parsed from `padron.toml` or constructed programmatically. Environment
/// variables with the `PADRON_` prefix override TOML values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PadronConfig {
    /// Tracing filter directive (default: "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Ingestion pipeline tuning.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Default for PadronConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend selection and per-backend settings.
///
/// The backend is chosen once at process start; there is no runtime
/// switching. An unknown `backend` value fails validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Active backend: "document" (default) or "relational".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Embedded document store settings.
    #[serde(default)]
    pub document: DocumentBackendConfig,
    /// Relational store settings.
    #[serde(default)]
    pub relational: RelationalBackendConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            document: DocumentBackendConfig::default(),
            relational: RelationalBackendConfig::default(),
        }
    }
}

fn default_backend() -> String {
    BACKEND_DOCUMENT.to_string()
}

/// Settings for the embedded document store (LMDB).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBackendConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_document_data_dir")]
    pub data_dir: String,
    /// Maximum database size in bytes (LMDB map_size).
    #[serde(default = "default_max_db_size")]
    pub max_db_size: u64,
}

impl Default for DocumentBackendConfig {
    fn default() -> Self {
        Self {
            data_dir: default_document_data_dir(),
            max_db_size: default_max_db_size(),
        }
    }
}

fn default_document_data_dir() -> String {
    "data/padron".to_string()
}

fn default_max_db_size() -> u64 {
    // 4 GiB — the full national roster with embedded locations fits well
    // within this.
    4 * 1024 * 1024 * 1024
}

/// Settings for the relational store (SQLite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalBackendConfig {
    /// Path of the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for RelationalBackendConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "data/padron.db".to_string()
}

/// Worker pool sizes and chunk sizes for the two ingestion phases.
///
/// Person parsing is the bottleneck (eight fields plus date parsing per
/// line), which justifies a wider pool and larger chunks than the location
/// phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Worker threads for the location phase (default: 2).
    #[serde(default = "default_location_workers")]
    pub location_workers: usize,
    /// Worker threads for the person phase (default: 8).
    #[serde(default = "default_person_workers")]
    pub person_workers: usize,
    /// Lines per chunk for the location roster (default: 1072).
    #[serde(default = "default_location_chunk_lines")]
    pub location_chunk_lines: usize,
    /// Lines per chunk for the citizen roster (default: 8324).
    #[serde(default = "default_person_chunk_lines")]
    pub person_chunk_lines: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            location_workers: default_location_workers(),
            person_workers: default_person_workers(),
            location_chunk_lines: default_location_chunk_lines(),
            person_chunk_lines: default_person_chunk_lines(),
        }
    }
}

fn default_location_workers() -> usize {
    2
}
fn default_person_workers() -> usize {
    8
}
fn default_location_chunk_lines() -> usize {
    1072
}
fn default_person_chunk_lines() -> usize {
    8324
}

impl PadronConfig {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides and validate.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse_toml(&contents)
    }

    /// Parse configuration from a TOML string, apply env overrides, then
    /// validate.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let mut config: PadronConfig = toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PADRON_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("PADRON_STORAGE_BACKEND") {
            self.storage.backend = v;
        }
        if let Ok(v) = std::env::var("PADRON_STORAGE_DOCUMENT_DATA_DIR") {
            self.storage.document.data_dir = v;
        }
        if let Ok(v) = std::env::var("PADRON_STORAGE_DOCUMENT_MAX_DB_SIZE") {
            if let Ok(size) = v.parse::<u64>() {
                self.storage.document.max_db_size = size;
            }
        }
        if let Ok(v) = std::env::var("PADRON_STORAGE_RELATIONAL_DB_PATH") {
            self.storage.relational.db_path = v;
        }
        if let Ok(v) = std::env::var("PADRON_INGEST_LOCATION_WORKERS") {
            if let Ok(n) = v.parse::<usize>() {
                self.ingest.location_workers = n;
            }
        }
        if let Ok(v) = std::env::var("PADRON_INGEST_PERSON_WORKERS") {
            if let Ok(n) = v.parse::<usize>() {
                self.ingest.person_workers = n;
            }
        }
        if let Ok(v) = std::env::var("PADRON_INGEST_LOCATION_CHUNK_LINES") {
            if let Ok(n) = v.parse::<usize>() {
                self.ingest.location_chunk_lines = n;
            }
        }
        if let Ok(v) = std::env::var("PADRON_INGEST_PERSON_CHUNK_LINES") {
            if let Ok(n) = v.parse::<usize>() {
                self.ingest.person_chunk_lines = n;
            }
        }
    }

    /// Validate the configuration, failing fast on values that would leave
    /// the process partially operational.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.storage.backend.as_str() {
            BACKEND_DOCUMENT | BACKEND_RELATIONAL => {}
            other => anyhow::bail!(
                "Unknown storage backend '{}': expected '{}' or '{}'",
                other,
                BACKEND_DOCUMENT,
                BACKEND_RELATIONAL
            ),
        }
        if self.storage.document.max_db_size == 0 {
            anyhow::bail!("storage.document.max_db_size must be positive");
        }
        if self.ingest.location_workers == 0 || self.ingest.person_workers == 0 {
            anyhow::bail!("ingest worker pool sizes must be positive");
        }
        if self.ingest.location_chunk_lines == 0 || self.ingest.person_chunk_lines == 0 {
            anyhow::bail!("ingest chunk sizes must be positive");
        }
        Ok(())
    }

    /// An example `padron.toml` with inline documentation, printed by
    /// `padron init-config`.
    pub fn example_toml_commented() -> String {
        r#"# Padrón voter registry configuration.
# Every value can be overridden with a PADRON_* environment variable,
# e.g. PADRON_STORAGE_BACKEND=relational.

# Tracing filter directive: error, warn, info, debug, trace.
log_level = "info"

[storage]
# Active backend: "document" (embedded LMDB document store) or
# "relational" (SQLite with foreign-key joins). Chosen once at startup.
backend = "document"

[storage.document]
# Directory for the LMDB environment.
data_dir = "data/padron"
# Maximum database size in bytes (LMDB map_size).
max_db_size = 4294967296

[storage.relational]
# SQLite database file.
db_path = "data/padron.db"

[ingest]
# Worker threads per phase. Person parsing is the bottleneck, so its pool
# is wider.
location_workers = 2
person_workers = 8
# Lines per chunk per roster. Tuning parameters, not business logic.
location_chunk_lines = 1072
person_chunk_lines = 8324
"#
        .to_string()
    }
}

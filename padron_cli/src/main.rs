//! # Padrón CLI
//!
//! Command-line interface for the Padrón voter registry: bulk ingestion of
//! the two roster files plus point lookups, search, manual edits, and
//! aggregate statistics over the selected storage backend.
//!
//! # Configuration
//!
//! Set `PADRON_CONFIG` to a TOML config file path, or use defaults. Every
//! setting can also be overridden via `PADRON_*` env vars.
//!
//! # Usage
//!
//! ```bash
//! # Generate an example padron.toml with inline documentation
//! padron --init-config > padron.toml
//!
//! # Load both roster files (locations first, always)
//! padron ingest --locations Distelec.txt --people PADRON_COMPLETO.txt
//!
//! # Point lookup and search
//! padron get 102340567
//! padron search --name "PEREZ LOPEZ"
//!
//! # Statistics scoped to one voter's location and expiration date
//! padron stats 102340567
//!
//! # Run against the relational backend instead of the document store
//! PADRON_STORAGE_BACKEND=relational padron get 102340567
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use padron_config::PadronConfig;
use padron_core::{BackendRegistry, NewVoter};
use padron_ingest::IngestionPipeline;

/// Padrón voter registry.
#[derive(Parser, Debug)]
#[command(name = "padron")]
#[command(about = "Padrón voter registry — bulk ingestion and lookups over pluggable storage")]
#[command(version)]
struct Cli {
    /// Path to padron.toml config file.
    /// Can also be set via PADRON_CONFIG env var.
    #[arg(short, long, env = "PADRON_CONFIG", global = true)]
    config: Option<String>,

    /// Generate an example padron.toml config file with documentation and exit.
    #[arg(long)]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the electoral-location roster and the citizen roster.
    /// Locations are always loaded to completion before any person.
    Ingest {
        /// Path to the electoral-location roster (Distelec.txt).
        #[arg(long)]
        locations: PathBuf,

        /// Path to the citizen roster (PADRON_COMPLETO.txt).
        #[arg(long)]
        people: PathBuf,
    },

    /// Look up one voter by exact identification, location included.
    Get {
        /// National identification number.
        identification: String,
    },

    /// Search voters by identification or name substring.
    Search {
        /// Substring of the identification number.
        #[arg(long = "id", default_value = "")]
        identification: String,

        /// Substring of the full name (matched case-insensitively).
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Aggregate statistics scoped to one voter's location and expiration
    /// date.
    Stats {
        /// National identification number of the reference voter.
        identification: String,
    },

    /// Register a single voter manually. The location is chosen by its
    /// province/canton/district names.
    Add {
        /// National identification number.
        identification: String,

        #[arg(long)]
        province: String,

        #[arg(long)]
        canton: String,

        #[arg(long)]
        district: String,

        /// Full name; stored upper-cased.
        #[arg(long)]
        name: String,

        /// Identification expiration date (YYYY-MM-DD).
        #[arg(long)]
        expiration: NaiveDate,
    },

    /// Remove one voter by exact identification.
    Delete {
        /// National identification number.
        identification: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init-config: print example config and exit.
    if cli.init_config {
        print!("{}", PadronConfig::example_toml_commented());
        return Ok(());
    }

    // Load configuration from file or defaults, then apply env var overrides.
    let config = if let Some(path) = &cli.config {
        PadronConfig::from_file(path)?
    } else {
        let mut cfg = PadronConfig::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        cfg
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(command) = cli.command else {
        bail!("No command given; run with --help for usage");
    };

    tracing::info!(backend = %config.storage.backend, "opening storage backend");
    let registry = BackendRegistry::new(padron_store::open_backend(&config.storage)?);
    let store = registry.store();

    match command {
        Commands::Ingest { locations, people } => {
            let pipeline = IngestionPipeline::new(store, config.ingest.clone());
            let report = pipeline.process(&locations, &people)?;
            println!(
                "locations: {} inserted, {} skipped, {} malformed lines",
                report.locations.inserted, report.locations.skipped, report.location_parse_errors
            );
            println!(
                "people:    {} inserted, {} skipped, {} dropped, {} malformed lines",
                report.people.inserted,
                report.people.skipped,
                report.people.dropped,
                report.person_parse_errors
            );
            println!("elapsed:   {:.2?}", report.elapsed);
        }
        Commands::Get { identification } => match store.get_voter(&identification)? {
            Some(voter) => println!("{}", serde_json::to_string_pretty(&voter)?),
            None => bail!("No voter with identification '{}'", identification),
        },
        Commands::Search {
            identification,
            name,
        } => {
            if identification.is_empty() && name.is_empty() {
                bail!("Pass --id or --name to search");
            }
            let results = store.search_voters(&identification, &name)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            tracing::info!(matches = results.len(), "search finished");
        }
        Commands::Stats { identification } => {
            let voter = store
                .get_voter(&identification)?
                .with_context(|| format!("No voter with identification '{}'", identification))?;
            let stats = store.get_voter_statistics(voter.id_expiration_date, &voter.location)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Add {
            identification,
            province,
            canton,
            district,
            name,
            expiration,
        } => {
            let assigned = store.add_voter(&NewVoter {
                identification,
                province,
                canton,
                district,
                full_name: name,
                id_expiration_date: expiration,
            })?;
            println!("registered {}", assigned);
        }
        Commands::Delete { identification } => {
            store.delete_voter(&identification)?;
            println!("deleted {}", identification);
        }
    }

    Ok(())
}

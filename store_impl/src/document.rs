//! Embedded document store backend on LMDB via `heed`.
//!
//! Two named databases hold the registry:
//!
//! | Database    | Key              | Value       | Description                      |
//! |-------------|------------------|-------------|----------------------------------|
//! | `locations` | `String` (code)  | `Location`  | Electoral locations              |
//! | `people`    | `String` (id)    | `PersonDoc` | Voters with embedded location    |
//!
//! Location data is denormalized into each person document at load time, so
//! lookups and aggregations never join: statistics are one grouped scan over
//! the embedded fields. Each bulk-load call is one write transaction;
//! duplicate keys are detected inside the transaction and skipped, never
//! overwritten. LMDB serializes write transactions internally, so concurrent
//! ingestion workers stay safe while their parsing runs in parallel.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use heed::types::SerdeBincode;
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use padron_config::DocumentBackendConfig;
use padron_core::{
    Gender, LoadStats, Location, NewVoter, PersonRecord, StoreError, Voter, VoterBackend,
    VoterStatistics, VoterSummary,
};

/// A voter document with its location embedded at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersonDoc {
    identification: String,
    voting_board: String,
    full_name: String,
    gender: Gender,
    id_expiration_date: NaiveDate,
    location: Location,
}

impl PersonDoc {
    fn into_voter(self) -> Voter {
        Voter {
            identification: self.identification,
            voting_board: self.voting_board,
            full_name: self.full_name,
            gender: self.gender,
            id_expiration_date: self.id_expiration_date,
            location: self.location,
        }
    }
}

/// Document store backend backed by LMDB via Heed.
pub struct DocumentBackend {
    env: Env,
    /// elec_code → Location
    locations_db: Database<SerdeBincode<String>, SerdeBincode<Location>>,
    /// identification → PersonDoc (location embedded)
    people_db: Database<SerdeBincode<String>, SerdeBincode<PersonDoc>>,
}

impl DocumentBackend {
    /// Open (or create) the LMDB environment and its named databases.
    pub fn open(config: &DocumentBackendConfig) -> Result<Self> {
        let path = Path::new(&config.data_dir);
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", config.data_dir))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.max_db_size as usize)
                .max_dbs(2)
                .open(path)
                .with_context(|| {
                    format!("Failed to open LMDB environment at {}", config.data_dir)
                })?
        };

        let mut wtxn = env.write_txn()?;
        let locations_db = env.create_database(&mut wtxn, Some("locations"))?;
        let people_db = env.create_database(&mut wtxn, Some("people"))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            locations_db,
            people_db,
        })
    }

    /// Resolve a location triple to its stored document, scanning the
    /// locations database.
    fn scan_location(
        &self,
        province: &str,
        canton: &str,
        district: &str,
    ) -> Result<Option<Location>> {
        let rtxn = self.env.read_txn()?;
        for entry in self.locations_db.iter(&rtxn)? {
            let (_, location) = entry?;
            if location.province == province
                && location.canton == canton
                && location.district == district
            {
                return Ok(Some(location));
            }
        }
        Ok(None)
    }

    /// Insert one already-normalized person, embedding the given location.
    /// Returns false when the identification already existed.
    fn insert_person(&self, record: &PersonRecord, location: Location) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        if self.people_db.get(&wtxn, &record.identification)?.is_some() {
            return Ok(false);
        }
        let doc = PersonDoc {
            identification: record.identification.clone(),
            voting_board: record.voting_board.clone(),
            full_name: record.full_name.clone(),
            gender: record.gender,
            id_expiration_date: record.id_expiration_date,
            location,
        };
        self.people_db.put(&mut wtxn, &record.identification, &doc)?;
        wtxn.commit()?;
        Ok(true)
    }
}

impl VoterBackend for DocumentBackend {
    fn load_locations(&self, batch: &[Location]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        let mut wtxn = self.env.write_txn()?;
        for location in batch {
            if self
                .locations_db
                .get(&wtxn, &location.elec_code)?
                .is_some()
            {
                stats.skipped += 1;
                continue;
            }
            self.locations_db
                .put(&mut wtxn, &location.elec_code, location)?;
            stats.inserted += 1;
        }
        wtxn.commit()?;
        Ok(stats)
    }

    fn load_people(&self, batch: &[PersonRecord]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        let mut wtxn = self.env.write_txn()?;
        for record in batch {
            // Resolve the reference inside the same transaction so the
            // embedded copy matches what was stored at load time.
            let Some(location) = self.locations_db.get(&wtxn, &record.elec_code)? else {
                debug!(
                    identification = %record.identification,
                    elec_code = %record.elec_code,
                    "dropping person with unresolved location reference"
                );
                stats.dropped += 1;
                continue;
            };
            if self.people_db.get(&wtxn, &record.identification)?.is_some() {
                stats.skipped += 1;
                continue;
            }
            let doc = PersonDoc {
                identification: record.identification.clone(),
                voting_board: record.voting_board.clone(),
                full_name: record.full_name.clone(),
                gender: record.gender,
                id_expiration_date: record.id_expiration_date,
                location,
            };
            self.people_db.put(&mut wtxn, &record.identification, &doc)?;
            stats.inserted += 1;
        }
        wtxn.commit()?;
        Ok(stats)
    }

    fn search_voters(&self, identification: &str, name: &str) -> Result<Vec<VoterSummary>> {
        enum Filter<'a> {
            ById(&'a str),
            ByName(String),
        }
        let filter = if !identification.is_empty() {
            Filter::ById(identification)
        } else if !name.is_empty() {
            Filter::ByName(name.to_uppercase())
        } else {
            return Ok(Vec::new());
        };

        let rtxn = self.env.read_txn()?;
        let mut results = Vec::new();
        for entry in self.people_db.iter(&rtxn)? {
            let (_, doc) = entry?;
            let matched = match &filter {
                Filter::ById(needle) => doc.identification.contains(needle),
                Filter::ByName(needle) => doc.full_name.contains(needle.as_str()),
            };
            if matched {
                results.push(VoterSummary {
                    identification: doc.identification,
                    full_name: doc.full_name,
                });
            }
        }
        // LMDB iterates in bincode-key order; sort so both backends return
        // the same ordering.
        results.sort_by(|a, b| a.identification.cmp(&b.identification));
        Ok(results)
    }

    fn get_voter(&self, identification: &str) -> Result<Option<Voter>> {
        let rtxn = self.env.read_txn()?;
        let doc = self.people_db.get(&rtxn, &identification.to_string())?;
        Ok(doc.map(PersonDoc::into_voter))
    }

    fn add_voter(&self, voter: &NewVoter) -> Result<String, StoreError> {
        let location = self
            .scan_location(&voter.province, &voter.canton, &voter.district)?
            .ok_or_else(|| StoreError::LocationNotResolved {
                province: voter.province.clone(),
                canton: voter.canton.clone(),
                district: voter.district.clone(),
            })?;

        // Normalization happens in the constructor: gender and board are
        // derived here, never taken from the caller.
        let record = PersonRecord::new(
            voter.identification.clone(),
            location.elec_code.clone(),
            voter.full_name.clone(),
            voter.id_expiration_date,
        );
        let inserted = self.insert_person(&record, location)?;
        if !inserted {
            debug!(
                identification = %record.identification,
                "add_voter: identification already present; keeping first write"
            );
        }
        Ok(record.identification)
    }

    fn delete_voter(&self, identification: &str) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        // delete() reports whether the key existed; absence is a no-op.
        self.people_db.delete(&mut wtxn, &identification.to_string())?;
        wtxn.commit()?;
        Ok(())
    }

    fn get_voter_statistics(
        &self,
        expiration: NaiveDate,
        location: &Location,
    ) -> Result<VoterStatistics> {
        let rtxn = self.env.read_txn()?;
        let mut stats = VoterStatistics::default();
        for entry in self.people_db.iter(&rtxn)? {
            let (_, doc) = entry?;
            stats.accumulate(
                doc.gender,
                &doc.location.province,
                &doc.location.canton,
                &doc.location.district,
                doc.id_expiration_date,
                location,
                expiration,
            );
        }
        stats.finish_totals();
        Ok(stats)
    }

    fn get_location(&self, elec_code: &str) -> Result<Option<Location>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.locations_db.get(&rtxn, &elec_code.to_string())?)
    }

    fn find_location(
        &self,
        province: &str,
        canton: &str,
        district: &str,
    ) -> Result<Option<Location>> {
        self.scan_location(province, canton, district)
    }
}

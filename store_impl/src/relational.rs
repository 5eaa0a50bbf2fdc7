//! Relational backend on SQLite via `rusqlite`.
//!
//! Keeps the registry normalized: `people` references `locations` by
//! electoral code and every query that needs location fields joins. Bulk
//! loads are one transaction of `INSERT OR IGNORE` statements, so duplicate
//! primary keys are per-row no-ops and never abort the batch. Statistics are
//! a single statement of filtered counts over the join.
//!
//! `rusqlite::Connection` is `Send` but not `Sync`; the connection sits
//! behind a `Mutex` so the backend satisfies the trait's concurrency
//! contract by serializing its own writes while ingestion workers keep
//! parsing in parallel.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use tracing::debug;

use padron_config::RelationalBackendConfig;
use padron_core::{
    Gender, LoadStats, Location, NewVoter, PersonRecord, StoreError, Voter, VoterBackend,
    VoterStatistics, VoterSummary,
};

/// SQLite-backed store with a normalized foreign-key schema.
pub struct RelationalBackend {
    conn: Mutex<Connection>,
}

impl RelationalBackend {
    /// Open (or create) the database file and initialize the schema.
    pub fn open(config: &RelationalBackendConfig) -> Result<Self> {
        let path = Path::new(&config.db_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", config.db_path))?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set journal_mode")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                elec_code TEXT PRIMARY KEY,
                province  TEXT NOT NULL,
                canton    TEXT NOT NULL,
                district  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS people (
                identification     TEXT PRIMARY KEY,
                voting_board       TEXT NOT NULL,
                full_name          TEXT NOT NULL,
                gender             TEXT NOT NULL,
                id_expiration_date TEXT NOT NULL,
                elec_code          TEXT NOT NULL REFERENCES locations(elec_code)
            );

            CREATE INDEX IF NOT EXISTS idx_people_full_name ON people(full_name);
            CREATE INDEX IF NOT EXISTS idx_people_expiration ON people(id_expiration_date);
            CREATE INDEX IF NOT EXISTS idx_people_elec_code ON people(elec_code);
            "#,
        )
        .context("Failed to initialize schema")?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("connection mutex poisoned"))
    }

    fn row_to_voter(row: &rusqlite::Row<'_>) -> rusqlite::Result<Voter> {
        let gender: String = row.get(3)?;
        let expiration: String = row.get(4)?;
        Ok(Voter {
            identification: row.get(0)?,
            voting_board: row.get(1)?,
            full_name: row.get(2)?,
            gender: Gender::parse(&gender).unwrap_or(Gender::Desconocido),
            id_expiration_date: parse_iso_date(&expiration).unwrap_or_default(),
            location: Location {
                elec_code: row.get(5)?,
                province: row.get(6)?,
                canton: row.get(7)?,
                district: row.get(8)?,
            },
        })
    }

    fn find_location_code(
        conn: &Connection,
        province: &str,
        canton: &str,
        district: &str,
    ) -> Result<Option<Location>> {
        let mut stmt = conn.prepare_cached(
            "SELECT elec_code, province, canton, district FROM locations \
             WHERE province = ?1 AND canton = ?2 AND district = ?3",
        )?;
        let mut rows = stmt.query(params![province, canton, district])?;
        match rows.next()? {
            Some(row) => Ok(Some(Location {
                elec_code: row.get(0)?,
                province: row.get(1)?,
                canton: row.get(2)?,
                district: row.get(3)?,
            })),
            None => Ok(None),
        }
    }

    fn insert_person(conn: &Connection, record: &PersonRecord) -> Result<bool> {
        let mut stmt = conn.prepare_cached(
            "INSERT OR IGNORE INTO people \
             (identification, voting_board, full_name, gender, id_expiration_date, elec_code) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let changed = stmt.execute(params![
            record.identification,
            record.voting_board,
            record.full_name,
            record.gender.as_str(),
            format_iso_date(record.id_expiration_date),
            record.elec_code,
        ])?;
        Ok(changed == 1)
    }
}

/// Dates are stored as ISO `YYYY-MM-DD` text, which compares and sorts
/// correctly as a string.
fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

impl VoterBackend for RelationalBackend {
    fn load_locations(&self, batch: &[Location]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO locations (elec_code, province, canton, district) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for location in batch {
                let changed = stmt.execute(params![
                    location.elec_code,
                    location.province,
                    location.canton,
                    location.district,
                ])?;
                if changed == 1 {
                    stats.inserted += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }
        tx.commit()?;
        Ok(stats)
    }

    fn load_people(&self, batch: &[PersonRecord]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            // Filter unresolved references up front so a missing location is
            // a counted drop, not an FK violation that aborts the batch.
            let mut exists = tx.prepare_cached("SELECT 1 FROM locations WHERE elec_code = ?1")?;
            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO people \
                 (identification, voting_board, full_name, gender, id_expiration_date, elec_code) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in batch {
                let resolved = exists.exists(params![record.elec_code])?;
                if !resolved {
                    debug!(
                        identification = %record.identification,
                        elec_code = %record.elec_code,
                        "dropping person with unresolved location reference"
                    );
                    stats.dropped += 1;
                    continue;
                }
                let changed = insert.execute(params![
                    record.identification,
                    record.voting_board,
                    record.full_name,
                    record.gender.as_str(),
                    format_iso_date(record.id_expiration_date),
                    record.elec_code,
                ])?;
                if changed == 1 {
                    stats.inserted += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }
        tx.commit()?;
        Ok(stats)
    }

    fn search_voters(&self, identification: &str, name: &str) -> Result<Vec<VoterSummary>> {
        let (sql, needle) = if !identification.is_empty() {
            (
                "SELECT identification, full_name FROM people \
                 WHERE identification LIKE ?1 ORDER BY identification",
                format!("%{}%", identification),
            )
        } else if !name.is_empty() {
            (
                "SELECT identification, full_name FROM people \
                 WHERE full_name LIKE ?1 ORDER BY identification",
                format!("%{}%", name.to_uppercase()),
            )
        } else {
            return Ok(Vec::new());
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![needle], |row| {
            Ok(VoterSummary {
                identification: row.get(0)?,
                full_name: row.get(1)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn get_voter(&self, identification: &str) -> Result<Option<Voter>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT p.identification, p.voting_board, p.full_name, p.gender, \
                    p.id_expiration_date, l.elec_code, l.province, l.canton, l.district \
             FROM people p JOIN locations l ON p.elec_code = l.elec_code \
             WHERE p.identification = ?1",
        )?;
        let mut rows = stmt.query(params![identification])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_voter(row)?)),
            None => Ok(None),
        }
    }

    fn add_voter(&self, voter: &NewVoter) -> Result<String, StoreError> {
        let conn = self.lock()?;
        let location =
            Self::find_location_code(&conn, &voter.province, &voter.canton, &voter.district)?
                .ok_or_else(|| StoreError::LocationNotResolved {
                    province: voter.province.clone(),
                    canton: voter.canton.clone(),
                    district: voter.district.clone(),
                })?;

        let record = PersonRecord::new(
            voter.identification.clone(),
            location.elec_code,
            voter.full_name.clone(),
            voter.id_expiration_date,
        );
        let inserted = Self::insert_person(&conn, &record)?;
        if !inserted {
            debug!(
                identification = %record.identification,
                "add_voter: identification already present; keeping first write"
            );
        }
        Ok(record.identification)
    }

    fn delete_voter(&self, identification: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM people WHERE identification = ?1",
            params![identification],
        )?;
        Ok(())
    }

    fn get_voter_statistics(
        &self,
        expiration: NaiveDate,
        location: &Location,
    ) -> Result<VoterStatistics> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT \
                COUNT(CASE WHEN p.gender = 'Hombre' AND l.district = ?1 THEN 1 END), \
                COUNT(CASE WHEN p.gender = 'Hombre' AND l.canton   = ?2 THEN 1 END), \
                COUNT(CASE WHEN p.gender = 'Hombre' AND l.province = ?3 THEN 1 END), \
                COUNT(CASE WHEN p.gender = 'Mujer'  AND l.district = ?1 THEN 1 END), \
                COUNT(CASE WHEN p.gender = 'Mujer'  AND l.canton   = ?2 THEN 1 END), \
                COUNT(CASE WHEN p.gender = 'Mujer'  AND l.province = ?3 THEN 1 END), \
                COUNT(CASE WHEN p.id_expiration_date = ?4 THEN 1 END) \
             FROM people p JOIN locations l ON p.elec_code = l.elec_code",
        )?;
        let row = stmt.query_row(
            params![
                location.district,
                location.canton,
                location.province,
                format_iso_date(expiration),
            ],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, u64>(3)?,
                    row.get::<_, u64>(4)?,
                    row.get::<_, u64>(5)?,
                    row.get::<_, u64>(6)?,
                ))
            },
        )?;

        let mut stats = VoterStatistics {
            men_by_district: row.0,
            men_by_canton: row.1,
            men_by_province: row.2,
            women_by_district: row.3,
            women_by_canton: row.4,
            women_by_province: row.5,
            same_expiration: row.6,
            ..Default::default()
        };
        stats.finish_totals();
        Ok(stats)
    }

    fn get_location(&self, elec_code: &str) -> Result<Option<Location>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT elec_code, province, canton, district FROM locations WHERE elec_code = ?1",
        )?;
        let mut rows = stmt.query(params![elec_code])?;
        match rows.next()? {
            Some(row) => Ok(Some(Location {
                elec_code: row.get(0)?,
                province: row.get(1)?,
                canton: row.get(2)?,
                district: row.get(3)?,
            })),
            None => Ok(None),
        }
    }

    fn find_location(
        &self,
        province: &str,
        canton: &str,
        district: &str,
    ) -> Result<Option<Location>> {
        let conn = self.lock()?;
        Self::find_location_code(&conn, province, canton, district)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carmen() -> Location {
        Location {
            elec_code: "10101".into(),
            province: "SAN JOSE".into(),
            canton: "SAN JOSE".into(),
            district: "CARMEN".into(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_date_round_trip() {
        let d = date(2030, 12, 31);
        assert_eq!(format_iso_date(d), "2030-12-31");
        assert_eq!(parse_iso_date("2030-12-31"), Some(d));
        assert_eq!(parse_iso_date("garbage"), None);
    }

    #[test]
    fn load_locations_is_idempotent() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        let batch = vec![carmen()];
        let first = backend.load_locations(&batch).unwrap();
        assert_eq!(first.inserted, 1);
        let second = backend.load_locations(&batch).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.inserted, 0);
    }

    #[test]
    fn load_people_joins_and_drops_unresolved() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        backend.load_locations(&[carmen()]).unwrap();
        let people = vec![
            PersonRecord::new("102340567", "10101", "JUAN PEREZ LOPEZ", date(2030, 12, 31)),
            PersonRecord::new("209990123", "99999", "NADIE NADA NUNCA", date(2030, 12, 31)),
        ];
        let stats = backend.load_people(&people).unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.dropped, 1);

        let voter = backend.get_voter("102340567").unwrap().unwrap();
        assert_eq!(voter.location.district, "CARMEN");
        assert_eq!(voter.gender, Gender::Mujer);
        assert_eq!(voter.id_expiration_date, date(2030, 12, 31));
    }

    #[test]
    fn duplicate_person_first_write_wins() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        backend.load_locations(&[carmen()]).unwrap();
        let first = PersonRecord::new("102340567", "10101", "PRIMERA CARGA X", date(2030, 1, 1));
        let second = PersonRecord::new("102340567", "10101", "SEGUNDA CARGA Y", date(2031, 1, 1));
        backend.load_people(&[first]).unwrap();
        let stats = backend.load_people(&[second]).unwrap();
        assert_eq!(stats.skipped, 1);
        let voter = backend.get_voter("102340567").unwrap().unwrap();
        assert_eq!(voter.full_name, "PRIMERA CARGA X");
    }

    #[test]
    fn add_voter_resolves_triple_or_fails() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        backend.load_locations(&[carmen()]).unwrap();

        let bad = NewVoter {
            identification: "102340567".into(),
            province: "SAN JOSE".into(),
            canton: "SAN JOSE".into(),
            district: "NO EXISTE".into(),
            full_name: "juan perez lopez".into(),
            id_expiration_date: date(2030, 12, 31),
        };
        let err = backend.add_voter(&bad).unwrap_err();
        assert!(matches!(err, StoreError::LocationNotResolved { .. }));
        assert!(backend.get_voter("102340567").unwrap().is_none());

        let good = NewVoter {
            district: "CARMEN".into(),
            ..bad
        };
        assert_eq!(backend.add_voter(&good).unwrap(), "102340567");
        let voter = backend.get_voter("102340567").unwrap().unwrap();
        assert_eq!(voter.full_name, "JUAN PEREZ LOPEZ");
        assert_eq!(voter.voting_board, "00000");
        assert_eq!(voter.gender, Gender::Mujer);
    }

    #[test]
    fn delete_missing_voter_is_noop() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        backend.delete_voter("000000000").unwrap();
    }

    #[test]
    fn search_filters_and_priority() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        backend.load_locations(&[carmen()]).unwrap();
        let people = vec![
            PersonRecord::new("102340567", "10101", "JUAN PEREZ LOPEZ", date(2030, 12, 31)),
            PersonRecord::new("304560789", "10101", "ANA MORA PEREZ", date(2031, 6, 1)),
        ];
        backend.load_people(&people).unwrap();

        assert_eq!(backend.search_voters("1023", "").unwrap().len(), 1);
        assert_eq!(backend.search_voters("", "perez").unwrap().len(), 2);
        let both = backend.search_voters("3045", "JUAN").unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].identification, "304560789");
        assert!(backend.search_voters("", "").unwrap().is_empty());
    }

    #[test]
    fn statistics_join_and_zero_match() {
        let backend = RelationalBackend::open_in_memory().unwrap();
        let other = Location {
            elec_code: "20201".into(),
            province: "ALAJUELA".into(),
            canton: "GRECIA".into(),
            district: "CARMEN".into(),
        };
        backend.load_locations(&[carmen(), other]).unwrap();
        let day = date(2030, 12, 31);
        let people = vec![
            PersonRecord::new("102340567", "10101", "A A A", day),
            PersonRecord::new("102440567", "10101", "B B B", day),
            PersonRecord::new("507340567", "20201", "C C C", date(2031, 1, 1)),
        ];
        backend.load_people(&people).unwrap();

        let stats = backend.get_voter_statistics(day, &carmen()).unwrap();
        assert_eq!(stats.to_array(), [3, 2, 2, 1, 1, 1, 2, 1, 1, 2]);

        let nowhere = Location {
            elec_code: "x".into(),
            province: "X".into(),
            canton: "X".into(),
            district: "X".into(),
        };
        let stats = backend.get_voter_statistics(date(1999, 1, 1), &nowhere).unwrap();
        assert_eq!(stats.to_array(), [0; 10]);
    }
}

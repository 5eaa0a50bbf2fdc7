//! Domain data model for the Padrón voter registry.
//!
//! Defines the two record kinds held by every storage backend (locations and
//! people), the lightweight query result types, and the single
//! invariant-enforcement step ([`normalize`]) that derives every computed
//! field. Derived fields are never taken from input: gender is a pure
//! function of the identification, the full name is always upper-cased, and
//! the voting board is always the sentinel value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::derive_gender;

/// Voting-board code assigned to every record loaded through this system.
/// Real board assignment happens outside the registry pipeline.
pub const VOTING_BOARD_SENTINEL: &str = "00000";

/// Gender derived from the identification number.
///
/// `Desconocido` marks identifications too short to carry a gender digit
/// (length ≤ 3). It is stored explicitly rather than left unset so that the
/// derivation rule holds for every stored record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    /// Even digit at position 3 of the identification.
    Hombre,
    /// Odd digit at position 3 of the identification.
    Mujer,
    /// No gender digit available.
    Desconocido,
}

impl Gender {
    /// Stable string form used by both storage backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Hombre => "Hombre",
            Gender::Mujer => "Mujer",
            Gender::Desconocido => "Desconocido",
        }
    }

    /// Parse the stored string form back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Hombre" => Some(Gender::Hombre),
            "Mujer" => Some(Gender::Mujer),
            "Desconocido" => Some(Gender::Desconocido),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An electoral location: the smallest administrative unit a voter is
/// registered to.
///
/// The electoral code is assigned once and never mutated; re-ingesting a
/// location with a known code is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// Unique electoral code (primary key).
    pub elec_code: String,
    pub province: String,
    pub canton: String,
    pub district: String,
}

/// A voter record as produced by parsing and normalization, referencing its
/// location by electoral code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonRecord {
    /// National identification number (primary key).
    pub identification: String,
    /// Electoral code of the voter's location.
    pub elec_code: String,
    /// Always [`VOTING_BOARD_SENTINEL`] after normalization.
    pub voting_board: String,
    /// Upper-cased full name.
    pub full_name: String,
    /// Derived from the identification, never input.
    pub gender: Gender,
    /// Expiration date of the identification document.
    pub id_expiration_date: NaiveDate,
}

impl PersonRecord {
    /// Build a normalized record from raw fields.
    ///
    /// The voting board, name casing, and gender are overwritten by
    /// [`normalize`] regardless of what the caller supplies.
    pub fn new(
        identification: impl Into<String>,
        elec_code: impl Into<String>,
        full_name: impl Into<String>,
        id_expiration_date: NaiveDate,
    ) -> Self {
        let mut record = Self {
            identification: identification.into(),
            elec_code: elec_code.into(),
            voting_board: String::new(),
            full_name: full_name.into(),
            gender: Gender::Desconocido,
            id_expiration_date,
        };
        normalize(&mut record);
        record
    }
}

/// A voter with its location resolved, as returned by point lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voter {
    pub identification: String,
    pub voting_board: String,
    pub full_name: String,
    pub gender: Gender,
    pub id_expiration_date: NaiveDate,
    pub location: Location,
}

/// Lightweight search result entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoterSummary {
    pub identification: String,
    pub full_name: String,
}

/// Input for the manual add-voter flow. The location is chosen by its
/// province/canton/district triple and resolved to a code by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoter {
    pub identification: String,
    pub province: String,
    pub canton: String,
    pub district: String,
    pub full_name: String,
    pub id_expiration_date: NaiveDate,
}

/// Counters returned by a bulk-load call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadStats {
    /// Records written.
    pub inserted: usize,
    /// Records skipped because the primary key already existed.
    pub skipped: usize,
    /// Person records dropped because their location reference did not
    /// resolve. Always 0 for location loads.
    pub dropped: usize,
}

impl LoadStats {
    /// Accumulate another batch's counters into this one.
    pub fn merge(&mut self, other: LoadStats) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.dropped += other.dropped;
    }
}

/// The fixed-order aggregate statistics for one voter's location and
/// identification expiration date.
///
/// Every count is scoped to the corresponding field *value* of the resolved
/// location (a person counts toward `total_by_canton` when their own
/// location's canton equals the queried canton). Totals are men plus women;
/// `Desconocido` genders contribute to neither. Both backends must produce
/// the same ten numbers for the same dataset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoterStatistics {
    pub total_by_district: u64,
    pub total_by_canton: u64,
    pub total_by_province: u64,
    pub men_by_district: u64,
    pub men_by_canton: u64,
    pub men_by_province: u64,
    pub women_by_district: u64,
    pub women_by_canton: u64,
    pub women_by_province: u64,
    pub same_expiration: u64,
}

impl VoterStatistics {
    /// The ten counts in their fixed presentation order.
    pub fn to_array(&self) -> [u64; 10] {
        [
            self.total_by_district,
            self.total_by_canton,
            self.total_by_province,
            self.men_by_district,
            self.men_by_canton,
            self.men_by_province,
            self.women_by_district,
            self.women_by_canton,
            self.women_by_province,
            self.same_expiration,
        ]
    }

    /// Fold one person's embedded location fields into the counters.
    ///
    /// Used by backends that aggregate by scanning records; the relational
    /// backend produces the same numbers in SQL.
    pub fn accumulate(
        &mut self,
        gender: Gender,
        province: &str,
        canton: &str,
        district: &str,
        expiration: NaiveDate,
        scope: &Location,
        queried_expiration: NaiveDate,
    ) {
        let (district_slot, canton_slot, province_slot) = match gender {
            Gender::Hombre => (
                &mut self.men_by_district,
                &mut self.men_by_canton,
                &mut self.men_by_province,
            ),
            Gender::Mujer => (
                &mut self.women_by_district,
                &mut self.women_by_canton,
                &mut self.women_by_province,
            ),
            Gender::Desconocido => {
                if expiration == queried_expiration {
                    self.same_expiration += 1;
                }
                return;
            }
        };
        if district == scope.district {
            *district_slot += 1;
        }
        if canton == scope.canton {
            *canton_slot += 1;
        }
        if province == scope.province {
            *province_slot += 1;
        }
        if expiration == queried_expiration {
            self.same_expiration += 1;
        }
    }

    /// Derive the three totals from the per-gender counters.
    pub fn finish_totals(&mut self) {
        self.total_by_district = self.men_by_district + self.women_by_district;
        self.total_by_canton = self.men_by_canton + self.women_by_canton;
        self.total_by_province = self.men_by_province + self.women_by_province;
    }
}

/// Enforce every derived-field invariant on a person record.
///
/// Called at every record-construction site (bulk parsing and the manual
/// add-voter flow), so the invariants hold regardless of entry point:
/// - the voting board is forced to [`VOTING_BOARD_SENTINEL`];
/// - the full name is whitespace-collapsed and upper-cased;
/// - the gender is recomputed from the identification.
pub fn normalize(record: &mut PersonRecord) {
    record.voting_board = VOTING_BOARD_SENTINEL.to_string();
    record.full_name = collapse_spaces(&record.full_name).to_uppercase();
    record.gender = derive_gender(&record.identification);
}

/// Join whitespace-separated words with single spaces, dropping empty
/// fragments.
fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

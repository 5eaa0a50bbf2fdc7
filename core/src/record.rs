//! Positional line parsers for the two registry file formats.
//!
//! Both files are comma-delimited with fixed column positions and no header
//! row. One line is one record. Parsing is pure: the same line always yields
//! the same record or the same error.
//!
//! Person line layout (the citizen roster):
//!
//! | idx | field                         |
//! |-----|-------------------------------|
//! | 0   | identification                |
//! | 1   | electoral code                |
//! | 2   | (unused)                      |
//! | 3   | expiration date (`YYYYMMDD`)  |
//! | 4   | voting board (overwritten)    |
//! | 5–7 | name fragments                |
//!
//! Location line layout (the electoral-location roster):
//!
//! | idx | field           |
//! |-----|-----------------|
//! | 0   | electoral code  |
//! | 1   | province        |
//! | 2   | canton          |
//! | 3   | district        |

use chrono::NaiveDate;

use crate::error::ParseError;
use crate::types::{Gender, Location, PersonRecord};

const LOCATION_FIELDS: usize = 4;
const PERSON_FIELDS: usize = 8;

/// Derive gender from the digit at position 3 of the identification.
///
/// Pure: even digit → `Hombre`, odd digit → `Mujer`. Identifications with
/// no ASCII digit at position 3 (including any of length ≤ 3) yield
/// `Desconocido`.
pub fn derive_gender(identification: &str) -> Gender {
    match identification.as_bytes().get(3) {
        Some(b) if b.is_ascii_digit() => {
            if (b - b'0') % 2 == 0 {
                Gender::Hombre
            } else {
                Gender::Mujer
            }
        }
        _ => Gender::Desconocido,
    }
}

/// Parse a compact 8-digit `YYYYMMDD` string into a date.
pub fn parse_expiration_date(value: &str) -> Result<NaiveDate, ParseError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::NonNumeric {
            field: "id_expiration_date",
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| ParseError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parse one line of the electoral-location roster.
pub fn parse_location_line(line: &str) -> Result<Location, ParseError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < LOCATION_FIELDS {
        return Err(ParseError::FieldCount {
            expected: LOCATION_FIELDS,
            found: fields.len(),
        });
    }
    Ok(Location {
        elec_code: fields[0].trim().to_string(),
        province: fields[1].trim().to_string(),
        canton: fields[2].trim().to_string(),
        district: fields[3].trim().to_string(),
    })
}

/// Parse one line of the citizen roster into a normalized person record.
///
/// The three name fragments are trimmed and joined with single spaces; the
/// gender, voting board, and name casing come from
/// [`normalize`](crate::types::normalize) via [`PersonRecord::new`], never
/// from the input columns.
pub fn parse_person_line(line: &str) -> Result<PersonRecord, ParseError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < PERSON_FIELDS {
        return Err(ParseError::FieldCount {
            expected: PERSON_FIELDS,
            found: fields.len(),
        });
    }

    let identification = fields[0].trim();
    if identification.is_empty() || !identification.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::NonNumeric {
            field: "identification",
            value: fields[0].to_string(),
        });
    }

    let expiration = parse_expiration_date(fields[3].trim())?;
    let full_name = format!(
        "{} {} {}",
        fields[5].trim(),
        fields[6].trim(),
        fields[7].trim()
    );

    Ok(PersonRecord::new(
        identification,
        fields[1].trim(),
        full_name,
        expiration,
    ))
}

//! End-to-end ingestion against real storage backends.
//!
//! Fixture files are written as raw ISO-8859-1 bytes, including accented
//! characters outside ASCII, to exercise the legacy decoding path the way
//! the real roster files do.

use chrono::NaiveDate;
use padron_config::{DocumentBackendConfig, IngestConfig, RelationalBackendConfig};
use padron_core::{Gender, VoterBackend, VOTING_BOARD_SENTINEL};
use padron_ingest::IngestionPipeline;
use padron_store::{DocumentBackend, RelationalBackend};

/// "10305,SAN JOSÉ,DESAMPARADOS,SAN RAFAEL ARRIBA" with É as 0xC9.
const LOCATION_LINES: &[u8] = b"10101,SAN JOSE,SAN JOSE,CARMEN\n\
    10305,SAN JOS\xC9,DESAMPARADOS,SAN RAFAEL ARRIBA\n\
    20201,ALAJUELA,SAN RAMON,SANTIAGO\n";

/// One name carries Ñ as 0xD1; one line references a location that is not
/// in the roster and must be dropped; one line is malformed.
const PERSON_LINES: &[u8] = b"102340567,10101,1,20301231,00123,JUAN,PEREZ,LOPEZ\n\
    304560789,10305,1,20310601,00456,ANA,PE\xD1A,MORA\n\
    507890122,20201,1,20320115,00789,LUIS,SOTO,DIAZ\n\
    609990001,99999,1,20330101,00012,RITA,BLANCO,ROJAS\n\
    bad line without enough fields\n";

fn write_fixtures(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let locations = dir.path().join("distelec.txt");
    let people = dir.path().join("padron_completo.txt");
    std::fs::write(&locations, LOCATION_LINES).unwrap();
    std::fs::write(&people, PERSON_LINES).unwrap();
    (locations, people)
}

fn ingest_config() -> IngestConfig {
    IngestConfig {
        location_workers: 2,
        person_workers: 3,
        location_chunk_lines: 2,
        person_chunk_lines: 2,
    }
}

fn assert_ingested(backend: &dyn VoterBackend, locations: &std::path::Path, people: &std::path::Path) {
    let pipeline = IngestionPipeline::new(backend, ingest_config());
    let report = pipeline.process(locations, people).unwrap();

    assert_eq!(report.locations.inserted, 3);
    assert_eq!(report.people.inserted, 3);
    assert_eq!(report.people.dropped, 1, "unresolved location must be dropped");
    assert_eq!(report.person_parse_errors, 1);

    // Accented location text survived the legacy decoding.
    let location = backend.get_location("10305").unwrap().unwrap();
    assert_eq!(location.province, "SAN JOSÉ");
    assert_eq!(location.district, "SAN RAFAEL ARRIBA");

    // Accented name, derived gender, sentinel board.
    let voter = backend.get_voter("304560789").unwrap().unwrap();
    assert_eq!(voter.full_name, "ANA PEÑA MORA");
    assert_eq!(voter.gender, Gender::Mujer);
    assert_eq!(voter.voting_board, VOTING_BOARD_SENTINEL);
    assert_eq!(
        voter.id_expiration_date,
        NaiveDate::from_ymd_opt(2031, 6, 1).unwrap()
    );
    assert_eq!(voter.location.canton, "DESAMPARADOS");

    // The dropped reference never became a voter.
    assert!(backend.get_voter("609990001").unwrap().is_none());
}

#[test]
fn ingests_into_document_backend() {
    let dir = tempfile::tempdir().unwrap();
    let (locations, people) = write_fixtures(&dir);
    let backend = DocumentBackend::open(&DocumentBackendConfig {
        data_dir: dir.path().join("store").to_string_lossy().into_owned(),
        max_db_size: 64 * 1024 * 1024,
    })
    .unwrap();
    assert_ingested(&backend, &locations, &people);
}

#[test]
fn ingests_into_relational_backend() {
    let dir = tempfile::tempdir().unwrap();
    let (locations, people) = write_fixtures(&dir);
    let backend = RelationalBackend::open(&RelationalBackendConfig {
        db_path: dir.path().join("padron.db").to_string_lossy().into_owned(),
    })
    .unwrap();
    assert_ingested(&backend, &locations, &people);
}

#[test]
fn reingesting_the_same_files_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let (locations, people) = write_fixtures(&dir);
    let backend = RelationalBackend::open_in_memory().unwrap();
    let pipeline = IngestionPipeline::new(&backend, ingest_config());

    pipeline.process(&locations, &people).unwrap();
    let second = pipeline.process(&locations, &people).unwrap();

    assert_eq!(second.locations.inserted, 0);
    assert_eq!(second.locations.skipped, 3);
    assert_eq!(second.people.inserted, 0);
    assert_eq!(second.people.skipped, 3);
}

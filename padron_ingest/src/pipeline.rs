//! Two-phase bulk-load pipeline with bounded worker pools.
//!
//! Phase ordering is the one hard invariant: every location chunk is loaded
//! before any person chunk starts, because person records resolve their
//! location reference at load time. Within a phase, chunks are distributed
//! round-robin over a fixed pool of scoped threads with no cross-chunk
//! ordering guarantee.
//!
//! The unit of work is "parse one chunk fully in memory, then issue one
//! bulk-load call". Ingestion is best-effort: a malformed line is skipped
//! and logged, a failed batch is logged and abandoned, and the pipeline
//! continues with the remaining chunks either way.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use padron_config::IngestConfig;
use padron_core::{
    parse_location_line, parse_person_line, partition, LoadStats, ParseError, VoterBackend,
};

use crate::decode::read_legacy_lines;

/// Counters reported by one full pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestReport {
    pub locations: LoadStats,
    pub people: LoadStats,
    /// Malformed lines skipped in the location phase.
    pub location_parse_errors: usize,
    /// Malformed lines skipped in the person phase.
    pub person_parse_errors: usize,
    /// Total wall-clock time of the run.
    pub elapsed: Duration,
}

/// Orchestrates partitioning, parallel parsing, and bulk loading of the two
/// registry files into the selected backend.
pub struct IngestionPipeline<'a> {
    backend: &'a dyn VoterBackend,
    config: IngestConfig,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(backend: &'a dyn VoterBackend, config: IngestConfig) -> Self {
        Self { backend, config }
    }

    /// Ingest both registry files: all locations, then all people.
    pub fn process(&self, locations_path: &Path, people_path: &Path) -> Result<IngestReport> {
        let start = Instant::now();

        let location_lines = read_legacy_lines(locations_path)
            .context("Failed to read the electoral-location roster")?;
        let location_chunks = partition(&location_lines, self.config.location_chunk_lines);
        info!(
            lines = location_lines.len(),
            chunks = location_chunks.len(),
            workers = self.config.location_workers,
            "starting location phase"
        );
        let (locations, location_parse_errors) = self.run_phase(
            "locations",
            &location_chunks,
            self.config.location_workers,
            parse_location_line,
            |batch| self.backend.load_locations(batch),
        )?;

        // Barrier: the person phase may only start once every location chunk
        // has been loaded.
        let person_lines =
            read_legacy_lines(people_path).context("Failed to read the citizen roster")?;
        let person_chunks = partition(&person_lines, self.config.person_chunk_lines);
        info!(
            lines = person_lines.len(),
            chunks = person_chunks.len(),
            workers = self.config.person_workers,
            "starting person phase"
        );
        let (people, person_parse_errors) = self.run_phase(
            "people",
            &person_chunks,
            self.config.person_workers,
            parse_person_line,
            |batch| self.backend.load_people(batch),
        )?;

        let elapsed = start.elapsed();
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            locations_inserted = locations.inserted,
            locations_skipped = locations.skipped,
            people_inserted = people.inserted,
            people_skipped = people.skipped,
            people_dropped = people.dropped,
            location_parse_errors,
            person_parse_errors,
            "ingestion finished"
        );

        Ok(IngestReport {
            locations,
            people,
            location_parse_errors,
            person_parse_errors,
            elapsed,
        })
    }

    /// Run one phase: parse and load every chunk on a pool of `workers`
    /// scoped threads, distributing chunks round-robin.
    fn run_phase<T, P, L>(
        &self,
        phase: &'static str,
        chunks: &[&[String]],
        workers: usize,
        parse: P,
        load: L,
    ) -> Result<(LoadStats, usize)>
    where
        P: Fn(&str) -> Result<T, ParseError> + Sync,
        L: Fn(&[T]) -> Result<LoadStats> + Sync,
    {
        if chunks.is_empty() {
            return Ok((LoadStats::default(), 0));
        }
        let workers = workers.min(chunks.len()).max(1);

        let parse = &parse;
        let load = &load;
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for worker_idx in 0..workers {
                handles.push(scope.spawn(move || {
                    let mut stats = LoadStats::default();
                    let mut parse_errors = 0usize;
                    for chunk in chunks.iter().skip(worker_idx).step_by(workers) {
                        let mut batch = Vec::with_capacity(chunk.len());
                        for line in chunk.iter() {
                            if line.trim().is_empty() {
                                continue;
                            }
                            match parse(line) {
                                Ok(record) => batch.push(record),
                                Err(err) => {
                                    warn!(phase, error = %err, line = %line, "skipping malformed line");
                                    parse_errors += 1;
                                }
                            }
                        }
                        // One bulk-load call per chunk. A failed batch does
                        // not stop the remaining chunks.
                        match load(&batch) {
                            Ok(batch_stats) => stats.merge(batch_stats),
                            Err(err) => {
                                error!(
                                    phase,
                                    error = %err,
                                    lines = chunk.len(),
                                    "failed to load batch; continuing with remaining chunks"
                                );
                            }
                        }
                    }
                    (stats, parse_errors)
                }));
            }

            let mut total = LoadStats::default();
            let mut parse_errors = 0usize;
            for handle in handles {
                let (worker_stats, worker_errors) = handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("{} phase worker thread panicked", phase))?;
                total.merge(worker_stats);
                parse_errors += worker_errors;
            }
            Ok((total, parse_errors))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use padron_core::{Location, NewVoter, PersonRecord, StoreError, Voter, VoterStatistics, VoterSummary};
    use std::sync::Mutex;

    /// Minimal in-memory backend recording bulk-load calls, enough to test
    /// pipeline behavior without a real store.
    #[derive(Default)]
    struct RecordingBackend {
        locations: Mutex<Vec<Location>>,
        people: Mutex<Vec<PersonRecord>>,
        location_batches: Mutex<Vec<usize>>,
        fail_people: bool,
    }

    impl VoterBackend for RecordingBackend {
        fn load_locations(&self, batch: &[Location]) -> Result<LoadStats> {
            self.location_batches.lock().unwrap().push(batch.len());
            // The person phase must observe every location already loaded.
            self.locations.lock().unwrap().extend_from_slice(batch);
            Ok(LoadStats {
                inserted: batch.len(),
                ..Default::default()
            })
        }

        fn load_people(&self, batch: &[PersonRecord]) -> Result<LoadStats> {
            if self.fail_people {
                anyhow::bail!("simulated backend failure");
            }
            let known = self.locations.lock().unwrap().len();
            assert!(known > 0, "person chunk loaded before location phase finished");
            self.people.lock().unwrap().extend_from_slice(batch);
            Ok(LoadStats {
                inserted: batch.len(),
                ..Default::default()
            })
        }

        fn search_voters(&self, _: &str, _: &str) -> Result<Vec<VoterSummary>> {
            Ok(Vec::new())
        }
        fn get_voter(&self, _: &str) -> Result<Option<Voter>> {
            Ok(None)
        }
        fn add_voter(&self, voter: &NewVoter) -> Result<String, StoreError> {
            Ok(voter.identification.clone())
        }
        fn delete_voter(&self, _: &str) -> Result<()> {
            Ok(())
        }
        fn get_voter_statistics(&self, _: NaiveDate, _: &Location) -> Result<VoterStatistics> {
            Ok(VoterStatistics::default())
        }
        fn get_location(&self, _: &str) -> Result<Option<Location>> {
            Ok(None)
        }
        fn find_location(&self, _: &str, _: &str, _: &str) -> Result<Option<Location>> {
            Ok(None)
        }
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn small_config() -> IngestConfig {
        IngestConfig {
            location_workers: 2,
            person_workers: 4,
            location_chunk_lines: 2,
            person_chunk_lines: 2,
        }
    }

    #[test]
    fn processes_both_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let locations = write_file(
            &dir,
            "distelec.txt",
            b"10101,SAN JOSE,SAN JOSE,CARMEN\n10102,SAN JOSE,SAN JOSE,MERCED\n10201,SAN JOSE,ESCAZU,ESCAZU\n",
        );
        let people = write_file(
            &dir,
            "padron.txt",
            b"102340567,10101,1,20301231,00123,JUAN,PEREZ,LOPEZ\n\
              304560789,10102,1,20310601,00456,ANA,MORA,PEREZ\n\
              507890123,10201,1,20320115,00789,LUIS,SOTO,DIAZ\n",
        );

        let backend = RecordingBackend::default();
        let pipeline = IngestionPipeline::new(&backend, small_config());
        let report = pipeline.process(&locations, &people).unwrap();

        assert_eq!(report.locations.inserted, 3);
        assert_eq!(report.people.inserted, 3);
        assert_eq!(report.location_parse_errors, 0);
        assert_eq!(report.person_parse_errors, 0);
        // 3 lines at 2 per chunk → chunks of 2 and 1.
        let mut batches = backend.location_batches.lock().unwrap().clone();
        batches.sort_unstable();
        assert_eq!(batches, vec![1, 2]);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let locations = write_file(&dir, "distelec.txt", b"10101,SAN JOSE,SAN JOSE,CARMEN\n");
        let people = write_file(
            &dir,
            "padron.txt",
            b"102340567,10101,1,20301231,00123,JUAN,PEREZ,LOPEZ\n\
              not-a-record\n\
              304560789,10101,1,2031,00456,ANA,MORA,PEREZ\n\
              507890123,10101,1,20320115,00789,LUIS,SOTO,DIAZ\n",
        );

        let backend = RecordingBackend::default();
        let pipeline = IngestionPipeline::new(&backend, small_config());
        let report = pipeline.process(&locations, &people).unwrap();

        assert_eq!(report.people.inserted, 2);
        assert_eq!(report.person_parse_errors, 2);
    }

    #[test]
    fn failed_batches_do_not_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let locations = write_file(&dir, "distelec.txt", b"10101,SAN JOSE,SAN JOSE,CARMEN\n");
        let people = write_file(
            &dir,
            "padron.txt",
            b"102340567,10101,1,20301231,00123,JUAN,PEREZ,LOPEZ\n",
        );

        let backend = RecordingBackend {
            fail_people: true,
            ..Default::default()
        };
        let pipeline = IngestionPipeline::new(&backend, small_config());
        let report = pipeline.process(&locations, &people).unwrap();

        // The batch failed; nothing inserted, but the run itself succeeded.
        assert_eq!(report.people.inserted, 0);
        assert_eq!(report.locations.inserted, 1);
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let locations = write_file(&dir, "distelec.txt", b"10101,SAN JOSE,SAN JOSE,CARMEN\n");
        let backend = RecordingBackend::default();
        let pipeline = IngestionPipeline::new(&backend, small_config());
        let missing = dir.path().join("missing.txt");
        assert!(pipeline.process(&locations, &missing).is_err());
    }
}

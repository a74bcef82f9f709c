//! Concurrent ingestion
//!
//! Fans registrations out over a fixed pool of worker threads fed by a
//! bounded job channel, then folds per-identity results once every worker
//! has drained the queue.

use crate::client::{ingest, SimilarityService};
use crate::identity::Identity;
use crossbeam_channel::{bounded, unbounded};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionResult {
    /// Index of the identity in the submitted batch
    pub index: usize,
    pub succeeded: bool,
}

/// Aggregate of a whole ingestion batch
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub elapsed: Duration,
    /// Per-identity results sorted by batch index
    pub results: Vec<IngestionResult>,
}

impl IngestionReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    /// Batch indices that were acknowledged by the service
    pub fn succeeded_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.results
            .iter()
            .filter(|r| r.succeeded)
            .map(|r| r.index)
    }
}

/// Register every identity using at most `max_concurrency` workers.
///
/// Returns only after all identities were attempted. Individual failures
/// are counted, never propagated.
pub fn ingest_all<S: SimilarityService + ?Sized>(
    service: &S,
    identities: &[Identity],
    max_concurrency: usize,
) -> IngestionReport {
    let start = Instant::now();
    let workers = max_concurrency.max(1).min(identities.len());
    tracing::info!(
        count = identities.len(),
        workers,
        "adding identities to the service"
    );

    let (job_tx, job_rx) = bounded::<usize>(workers.max(1));
    let (result_tx, result_rx) = unbounded::<IngestionResult>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for index in job_rx.iter() {
                    let succeeded = ingest(service, &identities[index]);
                    if result_tx.send(IngestionResult { index, succeeded }).is_err() {
                        break;
                    }
                }
            });
        }

        for index in 0..identities.len() {
            if job_tx.send(index).is_err() {
                break;
            }
        }
        drop(job_tx);
    });
    drop(result_tx);

    let mut results: Vec<IngestionResult> = result_rx.try_iter().collect();
    results.sort_by_key(|r| r.index);
    let succeeded = results.iter().filter(|r| r.succeeded).count();
    let elapsed = start.elapsed();

    let report = IngestionReport {
        attempted: identities.len(),
        succeeded,
        elapsed,
        results,
    };
    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed(),
        elapsed_ms = elapsed.as_millis() as u64,
        "ingestion finished"
    );
    report
}

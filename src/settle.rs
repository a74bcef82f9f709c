//! Waiting for the service to index fresh writes
//!
//! A fixed delay is the default. Polling re-queries every
//! acknowledged identity until each one self-matches, bounded by a timeout.

use crate::client::SimilarityService;
use crate::identity::Identity;
use crate::verify::judge;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    Fixed { delay: Duration },
    Poll { timeout: Duration, interval: Duration },
}

/// What happened during the settle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleOutcome {
    pub waited: Duration,
    /// Polling rounds (always 0 for a fixed delay)
    pub attempts: usize,
    /// False when polling gave up with identities still unmatched
    pub converged: bool,
}

/// Block until the service is assumed to have indexed all acknowledged writes.
///
/// `acknowledged` is only used by [`SettleStrategy::Poll`]. Each round
/// re-queries the identities that have not self-matched yet.
pub fn settle<S: SimilarityService + ?Sized>(
    service: &S,
    strategy: SettleStrategy,
    acknowledged: &[&Identity],
    top_n: usize,
    threshold: f64,
) -> SettleOutcome {
    let start = Instant::now();
    let (timeout, interval) = match strategy {
        SettleStrategy::Fixed { delay } => {
            tracing::info!(delay_ms = delay.as_millis() as u64, "waiting for service to settle");
            thread::sleep(delay);
            return SettleOutcome {
                waited: start.elapsed(),
                attempts: 0,
                converged: true,
            };
        }
        SettleStrategy::Poll { timeout, interval } => (timeout, interval),
    };

    tracing::info!(
        pending = acknowledged.len(),
        timeout_ms = timeout.as_millis() as u64,
        "polling service until acknowledged identities are visible"
    );
    let deadline = start + timeout;
    let mut pending: Vec<&Identity> = acknowledged.to_vec();
    let mut attempts = 0;

    while !pending.is_empty() {
        attempts += 1;
        pending.retain(|identity| {
            let matched = service
                .query(identity.features(), top_n)
                .map(|candidates| judge(identity.name(), candidates, threshold).passed)
                .unwrap_or(false);
            !matched
        });
        if pending.is_empty() {
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                attempts,
                pending = pending.len(),
                "identities still not self-matching at settle timeout"
            );
            return SettleOutcome {
                waited: start.elapsed(),
                attempts,
                converged: false,
            };
        }
        tracing::debug!(attempts, pending = pending.len(), "service not settled yet");
        thread::sleep(interval.min(deadline - now));
    }

    tracing::info!(
        attempts,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "service settled"
    );
    SettleOutcome {
        waited: start.elapsed(),
        attempts,
        converged: true,
    }
}

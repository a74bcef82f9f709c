//! Test orchestration
//!
//! Sequences the run as a linear pipeline:
//!
//! ```text
//! Generate -> Ingest (bounded pool) -> Settle -> Sample -> Verify (sequential)
//!          -> Probe (optional) -> Summarize
//! ```

use crate::client::SimilarityService;
use crate::config::HarnessConfig;
use crate::identity::{Identity, IdentityGenerator};
use crate::ingest::{ingest_all, IngestionReport};
use crate::probes::{ProbeResult, ProbeRunner};
use crate::settle::{settle, SettleOutcome};
use crate::verify::{SelfMatchVerifier, VerificationOutcome};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Seed that reproduces the generated population and the sample
    pub seed: u64,
    pub generated: usize,
    pub ingestion: IngestionReport,
    pub settle: SettleOutcome,
    pub outcomes: Vec<VerificationOutcome>,
    /// Empty unless probes were enabled
    pub probes: Vec<ProbeResult>,
}

impl RunSummary {
    pub fn sampled(&self) -> usize {
        self.outcomes.len()
    }

    pub fn verified_passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn verified_failed(&self) -> usize {
        self.sampled() - self.verified_passed()
    }

    pub fn probes_failed(&self) -> usize {
        self.probes.iter().filter(|p| !p.passed).count()
    }

    /// Every ingestion, verification and probe succeeded
    pub fn all_passed(&self) -> bool {
        self.ingestion.failed() == 0 && self.verified_failed() == 0 && self.probes_failed() == 0
    }
}

/// Drives one verification run against a service
pub struct Harness<S: SimilarityService> {
    config: HarnessConfig,
    service: S,
}

impl<S: SimilarityService> Harness<S> {
    pub fn new(config: HarnessConfig, service: S) -> Self {
        Self { config, service }
    }

    /// Execute every stage and return the summary
    pub fn run(&self) -> RunSummary {
        let run = &self.config.run;
        let verify = &self.config.verify;

        let mut generator = match run.seed {
            Some(seed) => IdentityGenerator::new(seed, run.features_length),
            None => IdentityGenerator::from_entropy(run.features_length),
        };
        let seed = generator.seed();
        tracing::info!(count = run.population, seed, "generating random identities");
        let identities = generator.generate_population(run.population);

        let ingestion = ingest_all(&self.service, &identities, run.max_workers);

        let acknowledged: Vec<&Identity> = ingestion
            .succeeded_indices()
            .map(|i| &identities[i])
            .collect();
        let settle_outcome = settle(
            &self.service,
            self.config.settle.strategy(),
            &acknowledged,
            verify.top_n,
            verify.threshold,
        );

        let sample = sample_identities(&identities, run.sample_size, seed);
        tracing::info!(count = sample.len(), "testing similarity search");

        let verifier =
            SelfMatchVerifier::with_criteria(&self.service, verify.top_n, verify.threshold);
        let outcomes: Vec<VerificationOutcome> = sample
            .iter()
            .map(|identity| verifier.verify(identity))
            .collect();

        let probes = match (verify.probes, acknowledged.first()) {
            (true, Some(reference)) => {
                ProbeRunner::new(&self.service, verify.top_n, run.features_length)
                    .run_all(reference, ingestion.succeeded)
            }
            (true, None) => {
                tracing::warn!("skipping probes, no identity was acknowledged");
                Vec::new()
            }
            (false, _) => Vec::new(),
        };

        RunSummary {
            seed,
            generated: identities.len(),
            ingestion,
            settle: settle_outcome,
            outcomes,
            probes,
        }
    }
}

/// Choose up to `count` identities without replacement.
///
/// The sampling RNG is derived from the run seed but independent of the
/// generator stream, so changing the sample size does not change identities.
pub fn sample_identities(identities: &[Identity], count: usize, seed: u64) -> Vec<&Identity> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let count = count.min(identities.len());
    identities.choose_multiple(&mut rng, count).collect()
}

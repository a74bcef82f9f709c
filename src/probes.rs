//! Service property probes
//!
//! Optional checks run after self-match verification. Each probe exercises
//! one behavior the service is expected to have and reports pass/fail with
//! a short detail line. Probe failures are test results, not errors.

use crate::client::{ClientError, SimilarityService};
use crate::identity::Identity;
use crate::wire::MatchCandidate;

/// Extra candidates requested beyond the acknowledged population
const OVERFLOW_MARGIN: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl ProbeResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Scores are non-increasing by rank
pub fn is_rank_ordered(candidates: &[MatchCandidate]) -> bool {
    candidates
        .windows(2)
        .all(|w| w[0].similarity_score >= w[1].similarity_score)
}

/// Runs the probe suite against one service
pub struct ProbeRunner<'a, S: SimilarityService + ?Sized> {
    service: &'a S,
    top_n: usize,
    features_length: usize,
}

impl<'a, S: SimilarityService + ?Sized> ProbeRunner<'a, S> {
    pub fn new(service: &'a S, top_n: usize, features_length: usize) -> Self {
        Self {
            service,
            top_n,
            features_length,
        }
    }

    /// Run every probe. `reference` is an identity the service acknowledged;
    /// `stored` is how many identities this run got acknowledged.
    pub fn run_all(&self, reference: &Identity, stored: usize) -> Vec<ProbeResult> {
        let results = vec![
            self.idempotent_query(reference),
            self.ranking_order(reference),
            self.top_n_overflow(reference, stored),
            self.empty_features_rejected(),
            self.wrong_length_rejected(),
        ];
        for r in &results {
            if r.passed {
                tracing::info!(probe = r.name, detail = %r.detail, "probe passed");
            } else {
                tracing::warn!(probe = r.name, detail = %r.detail, "probe failed");
            }
        }
        results
    }

    /// Two identical queries in a row return identical ranked lists
    pub fn idempotent_query(&self, reference: &Identity) -> ProbeResult {
        const NAME: &str = "idempotent_query";
        let first = self.service.query(reference.features(), self.top_n);
        let second = self.service.query(reference.features(), self.top_n);
        match (first, second) {
            (Ok(a), Ok(b)) if a == b => {
                ProbeResult::pass(NAME, format!("{} candidates, identical", a.len()))
            }
            (Ok(a), Ok(b)) => ProbeResult::fail(
                NAME,
                format!("lists differ: {:?} vs {:?}", names(&a), names(&b)),
            ),
            (Err(e), _) | (_, Err(e)) => ProbeResult::fail(NAME, e.to_string()),
        }
    }

    /// Ranked scores never increase
    pub fn ranking_order(&self, reference: &Identity) -> ProbeResult {
        const NAME: &str = "ranking_order";
        match self.service.query(reference.features(), self.top_n) {
            Ok(c) if is_rank_ordered(&c) => ProbeResult::pass(NAME, "scores non-increasing"),
            Ok(c) => ProbeResult::fail(
                NAME,
                format!(
                    "scores out of order: {:?}",
                    c.iter().map(|m| m.similarity_score).collect::<Vec<_>>()
                ),
            ),
            Err(e) => ProbeResult::fail(NAME, e.to_string()),
        }
    }

    /// Asking for more candidates than exist still succeeds and returns
    /// every stored identity without exceeding the request.
    pub fn top_n_overflow(&self, reference: &Identity, stored: usize) -> ProbeResult {
        const NAME: &str = "top_n_overflow";
        let requested = stored + OVERFLOW_MARGIN;
        match self.service.query(reference.features(), requested) {
            Ok(c) if c.len() >= stored && c.len() <= requested => ProbeResult::pass(
                NAME,
                format!("requested {}, received {}", requested, c.len()),
            ),
            Ok(c) => ProbeResult::fail(
                NAME,
                format!(
                    "requested {} with {} stored, received {}",
                    requested,
                    stored,
                    c.len()
                ),
            ),
            Err(e) => ProbeResult::fail(NAME, e.to_string()),
        }
    }

    /// Registering an empty vector is refused
    pub fn empty_features_rejected(&self) -> ProbeResult {
        self.expect_rejection(
            "empty_features_rejected",
            Identity::new("probe_empty_features", Vec::new()),
        )
    }

    /// Registering a vector of the wrong length is refused
    pub fn wrong_length_rejected(&self) -> ProbeResult {
        let mut features = vec![0.0; wrong_length(self.features_length)];
        features[0] = 1.0;
        self.expect_rejection(
            "wrong_length_rejected",
            Identity::new("probe_wrong_length", features),
        )
    }

    fn expect_rejection(&self, name: &'static str, identity: Identity) -> ProbeResult {
        match self.service.register(&identity) {
            Err(ClientError::Service { status, .. }) => {
                ProbeResult::pass(name, format!("rejected with status {}", status))
            }
            Ok(()) => ProbeResult::fail(
                name,
                format!("accepted {} features", identity.features().len()),
            ),
            Err(e) => ProbeResult::fail(name, e.to_string()),
        }
    }
}

/// A vector length the service must refuse: half the expected length, or one
/// more when halving would leave nothing to send.
fn wrong_length(features_length: usize) -> usize {
    let half = features_length / 2;
    if half == 0 {
        features_length + 1
    } else {
        half
    }
}

fn names(candidates: &[MatchCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.identity_name.as_str()).collect()
}

//! Self-match verification
//!
//! Queries the service with an identity's own vector and checks that the
//! best-ranked candidate is that identity with a near-unity score.

use crate::client::SimilarityService;
use crate::identity::Identity;
use crate::wire::MatchCandidate;
use std::fmt;

/// Candidates requested per self-query
pub const DEFAULT_TOP_N: usize = 3;

/// Rank-0 score must be strictly greater than this
pub const DEFAULT_THRESHOLD: f64 = 0.999;

/// Why a self-match did not pass
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyFailure {
    /// Transport, status or parse failure on the query
    QueryFailed(String),
    /// The service returned an empty ranked list
    NoResults,
    /// Rank 0 is another identity
    WrongName { expected: String, actual: String },
    /// Rank 0 is the right identity but not similar enough
    ScoreBelowThreshold { score: f64, threshold: f64 },
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyFailure::QueryFailed(e) => write!(f, "no valid results returned: {}", e),
            VerifyFailure::NoResults => write!(f, "no persons found"),
            VerifyFailure::WrongName { expected, actual } => {
                write!(f, "most similar should be {}, but got {}", expected, actual)
            }
            VerifyFailure::ScoreBelowThreshold { score, threshold } => {
                write!(f, "similarity score {} is not above {}", score, threshold)
            }
        }
    }
}

/// Result of verifying one identity
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub queried_identity: String,
    /// Rank-0 name, when the query returned anything
    pub top_match_name: Option<String>,
    pub top_score: Option<f64>,
    pub passed: bool,
    pub failure: Option<VerifyFailure>,
    /// Ranks 1.. for diagnostics
    pub runners_up: Vec<MatchCandidate>,
}

impl VerificationOutcome {
    fn failed(queried: &str, failure: VerifyFailure) -> Self {
        Self {
            queried_identity: queried.to_string(),
            top_match_name: None,
            top_score: None,
            passed: false,
            failure: Some(failure),
            runners_up: Vec::new(),
        }
    }
}

/// Judge a ranked list against the identity that was queried
pub fn judge(queried: &str, candidates: Vec<MatchCandidate>, threshold: f64) -> VerificationOutcome {
    let mut ranked = candidates.into_iter();
    let top = match ranked.next() {
        Some(top) => top,
        None => return VerificationOutcome::failed(queried, VerifyFailure::NoResults),
    };

    let failure = if top.identity_name != queried {
        Some(VerifyFailure::WrongName {
            expected: queried.to_string(),
            actual: top.identity_name.clone(),
        })
    } else if !(top.similarity_score > threshold) {
        Some(VerifyFailure::ScoreBelowThreshold {
            score: top.similarity_score,
            threshold,
        })
    } else {
        None
    };

    VerificationOutcome {
        queried_identity: queried.to_string(),
        top_match_name: Some(top.identity_name),
        top_score: Some(top.similarity_score),
        passed: failure.is_none(),
        failure,
        runners_up: ranked.collect(),
    }
}

/// Runs self-match queries against a service
pub struct SelfMatchVerifier<'a, S: SimilarityService + ?Sized> {
    service: &'a S,
    top_n: usize,
    threshold: f64,
}

impl<'a, S: SimilarityService + ?Sized> SelfMatchVerifier<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            top_n: DEFAULT_TOP_N,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_criteria(service: &'a S, top_n: usize, threshold: f64) -> Self {
        Self {
            service,
            top_n,
            threshold,
        }
    }

    /// Verify that `identity` is its own best match
    pub fn verify(&self, identity: &Identity) -> VerificationOutcome {
        tracing::info!(name = %identity.name(), "testing search for identity");

        let outcome = match self.service.query(identity.features(), self.top_n) {
            Ok(candidates) => judge(identity.name(), candidates, self.threshold),
            Err(e) => {
                VerificationOutcome::failed(identity.name(), VerifyFailure::QueryFailed(e.to_string()))
            }
        };

        match &outcome.failure {
            None => tracing::info!(
                name = %outcome.queried_identity,
                score = outcome.top_score.unwrap_or_default(),
                "self-match passed"
            ),
            Some(reason) => tracing::warn!(
                name = %outcome.queried_identity,
                top = outcome.top_match_name.as_deref().unwrap_or("-"),
                reason = %reason,
                "self-match failed"
            ),
        }
        outcome
    }
}

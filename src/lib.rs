//! selfmatch - Self-Match Verification for Similarity-Search Services
//!
//! Verifies a remote identity similarity service end to end: synthesize
//! identities with unit-length feature vectors, register them concurrently,
//! then query the service with each identity's own vector and check that
//! the identity comes back first with a near-unity score.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ IdentityGenerator│  names + normalized N(0,1) vectors
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────────┐
//! │   ingest_all     │────▶│  SimilarityService   │  POST /add_person
//! │ (bounded pool)   │     │  (HttpService)       │  GET  /get_similar_person
//! └────────┬─────────┘     └──────────▲───────────┘
//!          │ settle                   │
//!          ▼                          │
//! ┌──────────────────┐                │
//! │ SelfMatchVerifier│────────────────┘
//! └────────┬─────────┘
//!          ▼
//!     RunSummary
//! ```
//!
//! # Example
//!
//! ```no_run
//! use selfmatch::{Harness, HarnessConfig, HttpService};
//!
//! let config = HarnessConfig::default();
//! let service = HttpService::from_config(&config.service);
//! let summary = Harness::new(config, service).run();
//! println!("{}", selfmatch::report::render(&summary));
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod harness;
pub mod identity;
pub mod ingest;
pub mod probes;
pub mod report;
pub mod settle;
pub mod verify;
pub mod wire;

pub use client::{ingest, ClientError, HttpService, SimilarityService};
pub use config::{ConfigError, ConfigResult, HarnessConfig, SettleMode};
pub use harness::{sample_identities, Harness, RunSummary};
pub use identity::{Identity, IdentityGenerator, FEATURES_LENGTH};
pub use ingest::{ingest_all, IngestionReport, IngestionResult};
pub use probes::{ProbeResult, ProbeRunner};
pub use settle::{settle, SettleOutcome, SettleStrategy};
pub use verify::{SelfMatchVerifier, VerificationOutcome, VerifyFailure};
pub use wire::MatchCandidate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

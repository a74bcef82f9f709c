//! Clients for the remote similarity service
//!
//! [`SimilarityService`] is the seam between the harness and the network.
//! [`HttpService`] speaks the reference HTTP API through a blocking `ureq`
//! agent whose timeout bounds every call.

use crate::config::ServiceConfig;
use crate::identity::Identity;
use crate::wire::{self, MatchCandidate, RegisterRequest, WireError};
use std::time::Duration;
use thiserror::Error;

/// Status code the service uses to acknowledge a request
pub const STATUS_OK: u16 = 200;

/// Failure of a single service call
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, reset, DNS failure or timeout
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a non-OK status
    #[error("service returned status {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("unparseable response: {0}")]
    Parse(#[from] WireError),
}

impl ClientError {
    pub fn is_service_failure(&self) -> bool {
        matches!(self, ClientError::Service { .. })
    }
}

/// The two operations the harness needs from a similarity service
pub trait SimilarityService: Send + Sync {
    /// Register an identity under its name
    fn register(&self, identity: &Identity) -> Result<(), ClientError>;

    /// Rank stored identities by similarity to `features`, best first
    fn query(&self, features: &[f64], top_n: usize) -> Result<Vec<MatchCandidate>, ClientError>;
}

/// Submit one identity, reporting success as a boolean.
///
/// Failures are logged and swallowed; they are data points for the run.
pub fn ingest<S: SimilarityService + ?Sized>(service: &S, identity: &Identity) -> bool {
    match service.register(identity) {
        Ok(()) => {
            tracing::debug!(name = %identity.name(), "identity registered");
            true
        }
        Err(e) => {
            tracing::warn!(name = %identity.name(), error = %e, "failed to add identity");
            false
        }
    }
}

/// HTTP client for the reference similarity API
#[derive(Clone)]
pub struct HttpService {
    agent: ureq::Agent,
    base_url: String,
    register_path: String,
    query_path: String,
}

impl HttpService {
    /// Create a client with the default endpoint paths
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self::from_config(&ServiceConfig {
            base_url: base_url.to_string(),
            timeout_secs: timeout.as_secs_f64(),
            ..ServiceConfig::default()
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            register_path: config.register_path.clone(),
            query_path: config.query_path.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl SimilarityService for HttpService {
    fn register(&self, identity: &Identity) -> Result<(), ClientError> {
        let response = self
            .agent
            .post(&self.url(&self.register_path))
            .set("content-type", "application/json")
            .send_json(RegisterRequest {
                name: identity.name(),
                features: identity.features(),
            })
            .map_err(map_ureq_error)?;

        expect_ok(response).map(|_| ())
    }

    fn query(&self, features: &[f64], top_n: usize) -> Result<Vec<MatchCandidate>, ClientError> {
        let mut request = self.agent.get(&self.url(&self.query_path));
        for value in features {
            request = request.query("features", &value.to_string());
        }
        request = request.query("top_n", &top_n.to_string());

        let response = request.call().map_err(map_ureq_error)?;
        let body = expect_ok(response)?
            .into_string()
            .map_err(|e| ClientError::Transport(format!("failed to read body: {}", e)))?;

        Ok(wire::parse_ranked_matches(&body)?)
    }
}

/// Reject any success status other than the service's OK
fn expect_ok(response: ureq::Response) -> Result<ureq::Response, ClientError> {
    let status = response.status();
    if status == STATUS_OK {
        Ok(response)
    } else {
        Err(ClientError::Service {
            status,
            body: response.into_string().unwrap_or_default(),
        })
    }
}

fn map_ureq_error(e: ureq::Error) -> ClientError {
    match e {
        ureq::Error::Status(status, resp) => ClientError::Service {
            status,
            body: resp.into_string().unwrap_or_default().trim().to_string(),
        },
        ureq::Error::Transport(t) => ClientError::Transport(t.to_string()),
    }
}

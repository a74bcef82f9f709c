//! Wire format of the remote similarity service
//!
//! Every request and response shape the service speaks is defined here.
//! The rest of the crate only sees [`MatchCandidate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key holding the ranked list in a similarity response
pub const RANKED_LIST_KEY: &str = "persons";

/// A ranked candidate returned by a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub identity_name: String,
    pub similarity_score: f64,
}

/// Registration payload
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub features: &'a [f64],
}

/// Errors decoding a similarity response
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response has no `{0}` field")]
    MissingField(&'static str),

    #[error("malformed entry in ranked list: {0}")]
    MalformedEntry(String),
}

#[derive(Debug, Deserialize)]
struct WirePerson {
    #[serde(rename = "Name", alias = "name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    #[serde(rename = "Person", alias = "person")]
    person: WirePerson,
    #[serde(rename = "Score", alias = "score")]
    score: f64,
}

/// Decode a similarity response body into rank-ordered candidates.
///
/// A `null` ranked list decodes as empty; a missing one is an error.
pub fn parse_ranked_matches(body: &str) -> Result<Vec<MatchCandidate>, WireError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| WireError::InvalidJson(e.to_string()))?;

    let list = value
        .get(RANKED_LIST_KEY)
        .ok_or(WireError::MissingField(RANKED_LIST_KEY))?;

    if list.is_null() {
        return Ok(Vec::new());
    }

    let matches: Vec<WireMatch> = serde_json::from_value(list.clone())
        .map_err(|e| WireError::MalformedEntry(e.to_string()))?;

    Ok(matches
        .into_iter()
        .map(|m| MatchCandidate {
            identity_name: m.person.name,
            similarity_score: m.score,
        })
        .collect())
}

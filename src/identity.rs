//! Synthetic identity generation
//!
//! Produces test subjects with a human-readable unique name and a
//! unit-length feature vector sampled from a standard normal distribution.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::collections::HashSet;

/// Default feature vector length accepted by the reference service
pub const FEATURES_LENGTH: usize = 256;

const FIRST_NAMES: [&str; 10] = [
    "Alice", "Bob", "Charlie", "David", "Emma", "Frank", "Grace", "Hannah", "Ian", "Julia",
];

const LAST_NAMES: [&str; 10] = [
    "Smith",
    "Johnson",
    "Williams",
    "Brown",
    "Jones",
    "Miller",
    "Davis",
    "Garcia",
    "Rodriguez",
    "Wilson",
];

/// Numeric suffix range appended to every name (inclusive bounds)
const SUFFIX_MIN: u32 = 10_000;
const SUFFIX_MAX: u32 = 99_999;

/// A synthetic test subject
///
/// Fields are private so an identity cannot be altered after generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    name: String,
    features: Vec<f64>,
}

impl Identity {
    /// Build an identity from an explicit name and vector (no normalization)
    pub fn new(name: impl Into<String>, features: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    /// Euclidean norm of the feature vector
    pub fn norm(&self) -> f64 {
        l2_norm(&self.features)
    }
}

/// Euclidean norm of a vector
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Rescale `v` to unit length in place.
///
/// A vector with norm exactly zero is left untouched.
pub fn normalize(v: &mut [f64]) {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Seedable identity generator
pub struct IdentityGenerator {
    rng: ChaCha8Rng,
    seed: u64,
    features_length: usize,
}

impl IdentityGenerator {
    /// Create a generator with a fixed seed (reproducible runs)
    pub fn new(seed: u64, features_length: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            features_length,
        }
    }

    /// Create a generator seeded from OS entropy
    pub fn from_entropy(features_length: usize) -> Self {
        let seed: u64 = rand::random();
        Self::new(seed, features_length)
    }

    /// Seed in use, for replaying a run
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate one identity
    pub fn generate(&mut self) -> Identity {
        let name = self.random_name();
        let mut features: Vec<f64> = (0..self.features_length)
            .map(|_| self.rng.sample(StandardNormal))
            .collect();
        normalize(&mut features);
        Identity { name, features }
    }

    /// Generate `count` identities with pairwise-distinct names
    pub fn generate_population(&mut self, count: usize) -> Vec<Identity> {
        let mut seen = HashSet::with_capacity(count);
        let mut population = Vec::with_capacity(count);
        while population.len() < count {
            let identity = self.generate();
            if seen.insert(identity.name.clone()) {
                population.push(identity);
            } else {
                tracing::debug!(name = %identity.name, "name collision, redrawing");
            }
        }
        population
    }

    fn random_name(&mut self) -> String {
        let first = FIRST_NAMES[self.rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.gen_range(0..LAST_NAMES.len())];
        let suffix = self.rng.gen_range(SUFFIX_MIN..=SUFFIX_MAX);
        format!("{} {}_{}", first, last, suffix)
    }
}

//! Seed Commitment
//!
//! Binds all draw inputs into one deterministic digest.
//! Published before the payout order is revealed, recomputable by anyone.

use serde::{Serialize, Deserialize};

use crate::core::hash::{sha256_hex, is_hex_digest};
use super::inputs::DrawInputs;

/// The commitment digest: lowercase hex SHA-256 of the input preimage.
///
/// Once computed and published a seed is immutable. Recomputing from the
/// same inputs always yields the same value on every platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(pub String);

impl Seed {
    /// The hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this value has the shape of a rendered digest.
    pub fn is_well_formed(&self) -> bool {
        is_hex_digest(&self.0)
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the seed commitment for an input set.
///
/// Pure function: no I/O, no randomness, no error conditions. Input
/// constraints (at least 2 distinct members, non-empty salt) are enforced
/// by the serving boundary, not here.
pub fn compute_seed(inputs: &DrawInputs) -> Seed {
    Seed(sha256_hex(&inputs.preimage()))
}

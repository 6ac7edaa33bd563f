//! Audit Trail
//!
//! Append-only record of everything that happens to a pool. Draw
//! generation entries carry the seed and a hash of the serialized
//! inputs so the trail itself is tamper-evident.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::hash::sha256_hex;
use crate::draw::{DrawInputs, Seed};
use super::state::PoolId;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Pool was created.
    PoolCreated,
    /// Members were added to the pool.
    MembersAdded,
    /// The draw was generated and persisted.
    DrawGenerated,
    /// A verification was run against the stored draw.
    DrawVerified,
}

/// One audit trail entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Pool the entry belongs to.
    pub pool_id: PoolId,
    /// What happened.
    pub action: AuditAction,
    /// Action-specific payload.
    pub details: serde_json::Value,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry with an arbitrary details payload.
    pub fn new(pool_id: PoolId, action: AuditAction, details: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            pool_id,
            action,
            details,
            created_at: Utc::now(),
        }
    }

    /// Entry for a generated draw: records the seed and a digest of the
    /// serialized inputs, so later edits to either are detectable.
    pub fn draw_generated(pool_id: PoolId, seed: &Seed, inputs: &DrawInputs) -> Self {
        let inputs_json =
            serde_json::to_string(inputs).unwrap_or_else(|_| String::new());
        Self::new(
            pool_id,
            AuditAction::DrawGenerated,
            serde_json::json!({
                "seed": seed.as_str(),
                "inputsHash": sha256_hex(&inputs_json),
            }),
        )
    }

    /// Entry for a verification run against the stored draw.
    pub fn draw_verified(pool_id: PoolId, is_valid: bool, diagnostic: &str) -> Self {
        Self::new(
            pool_id,
            AuditAction::DrawVerified,
            serde_json::json!({
                "isValid": is_valid,
                "diagnostic": diagnostic,
            }),
        )
    }
}

//! Persistence Boundary
//!
//! Stores pools, draws, and the audit trail, and guarantees the one
//! invariant the deterministic engine cannot: a draw is persisted **at
//! most once** per pool (insert-or-reject keyed on pool identity).
//!
//! Records are versioned structs validated at the storage boundary, so a
//! malformed or future-version record is rejected at load time and never
//! reaches the verifier.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use crate::core::hash::is_hex_digest;
use crate::draw::{DrawInputs, DrawRecord, RankedMember, RecordedScore, Seed};
use crate::pool::{AuditEntry, Pool, PoolId};

/// Current stored-record version.
pub const RECORD_VERSION: u8 = 1;

/// A persisted draw: the verbatim engine output plus storage metadata.
///
/// Immutable once inserted. `results` preserves the exact position order
/// the fair order generator produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDraw {
    /// Record schema version.
    pub version: u8,
    /// Draw identifier.
    pub id: uuid::Uuid,
    /// Pool the draw belongs to.
    pub pool_id: PoolId,
    /// The published commitment digest.
    pub seed: Seed,
    /// The committed inputs, verbatim.
    pub inputs: DrawInputs,
    /// The payout order, verbatim.
    pub results: Vec<RankedMember>,
    /// When the draw was persisted.
    pub created_at: DateTime<Utc>,
    /// Always true; a stored draw is never editable.
    pub is_locked: bool,
}

impl StoredDraw {
    /// Wrap engine output for persistence.
    pub fn new(
        pool_id: PoolId,
        seed: Seed,
        inputs: DrawInputs,
        results: Vec<RankedMember>,
    ) -> Self {
        Self {
            version: RECORD_VERSION,
            id: uuid::Uuid::new_v4(),
            pool_id,
            seed,
            inputs,
            results,
            created_at: Utc::now(),
            is_locked: true,
        }
    }

    /// The verifier-shaped view of this record.
    pub fn as_record(&self) -> DrawRecord {
        DrawRecord {
            seed: self.seed.clone(),
            inputs: self.inputs.clone(),
            results: self
                .results
                .iter()
                .cloned()
                .map(RecordedScore::from)
                .collect(),
        }
    }

    /// Boundary validation run on every loaded record.
    fn validate(&self) -> Result<(), StoreError> {
        if self.version != RECORD_VERSION {
            return Err(StoreError::UnsupportedVersion { found: self.version });
        }
        if !is_hex_digest(self.seed.as_str()) {
            return Err(StoreError::Corrupt(format!(
                "draw {} has a malformed seed",
                self.id
            )));
        }
        if self.results.len() != self.inputs.members.len() {
            return Err(StoreError::Corrupt(format!(
                "draw {} has {} results for {} members",
                self.id,
                self.results.len(),
                self.inputs.members.len()
            )));
        }
        Ok(())
    }
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A draw already exists for the pool; draws are generated at most once.
    #[error("Draw already exists for pool {0} and cannot be modified")]
    DrawAlreadyExists(PoolId),

    /// Pool is not in the store.
    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    /// Stored record carries a version this build does not understand.
    #[error("Unsupported record version {found} (expected {RECORD_VERSION})")]
    UnsupportedVersion {
        /// Version found in the record.
        found: u8,
    },

    /// Stored record fails shape validation.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Snapshot file I/O failed.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failed.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// On-disk snapshot shape.
#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    version: u8,
    pools: BTreeMap<PoolId, Pool>,
    draws: BTreeMap<PoolId, StoredDraw>,
    audit: Vec<AuditEntry>,
}

/// In-memory store with JSON snapshot persistence.
///
/// BTreeMap keyed by pool id for deterministic iteration. Callers share
/// it behind the server's lock; the store itself is plain data.
#[derive(Debug, Default)]
pub struct DrawStore {
    pools: BTreeMap<PoolId, Pool>,
    draws: BTreeMap<PoolId, StoredDraw>,
    audit: Vec<AuditEntry>,
}

impl DrawStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new pool.
    pub fn insert_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.id, pool);
    }

    /// Fetch a pool.
    pub fn pool(&self, id: PoolId) -> Option<&Pool> {
        self.pools.get(&id)
    }

    /// Fetch a pool mutably.
    pub fn pool_mut(&mut self, id: PoolId) -> Option<&mut Pool> {
        self.pools.get_mut(&id)
    }

    /// Number of stored pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Insert-or-reject: persist a draw for a pool that has none, and
    /// lock the pool. A second insert for the same pool is rejected,
    /// which is the system's at-most-once draw guarantee.
    pub fn insert_draw(&mut self, draw: StoredDraw) -> Result<&StoredDraw, StoreError> {
        let pool_id = draw.pool_id;
        if self.draws.contains_key(&pool_id) {
            return Err(StoreError::DrawAlreadyExists(pool_id));
        }
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(StoreError::PoolNotFound(pool_id))?;
        pool.lock();
        self.draws.insert(pool_id, draw);
        Ok(&self.draws[&pool_id])
    }

    /// Fetch the draw for a pool, if one was generated.
    pub fn draw(&self, pool_id: PoolId) -> Option<&StoredDraw> {
        self.draws.get(&pool_id)
    }

    /// Append an audit entry.
    pub fn append_audit(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }

    /// Audit entries for a pool, oldest first.
    pub fn audit_for_pool(&self, pool_id: PoolId) -> Vec<&AuditEntry> {
        self.audit.iter().filter(|e| e.pool_id == pool_id).collect()
    }

    /// Write a JSON snapshot of the whole store.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = StoreSnapshot {
            version: RECORD_VERSION,
            pools: self.pools.clone(),
            draws: self.draws.clone(),
            audit: self.audit.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        info!("Saved store snapshot: {} pools, {} draws", self.pools.len(), self.draws.len());
        Ok(())
    }

    /// Load a JSON snapshot, validating every stored draw at the
    /// boundary before it can reach any verification path.
    pub fn load_snapshot(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)?;

        if snapshot.version != RECORD_VERSION {
            return Err(StoreError::UnsupportedVersion { found: snapshot.version });
        }
        for draw in snapshot.draws.values() {
            draw.validate()?;
        }

        info!(
            "Loaded store snapshot: {} pools, {} draws",
            snapshot.pools.len(),
            snapshot.draws.len()
        );
        Ok(Self {
            pools: snapshot.pools,
            draws: snapshot.draws,
            audit: snapshot.audit,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Pool State Definitions
//!
//! Pools and their members, as managed by the serving boundary.
//! Uses BTreeMap-friendly ordered ids for deterministic iteration.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Minimum members a pool needs before a draw may be generated.
pub const MIN_DRAW_MEMBERS: usize = 2;

/// Unique pool identifier (UUID).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub uuid::Uuid);

impl PoolId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse from a UUID string.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique member identifier (UUID).
///
/// Its string form is what enters `DrawInputs.members` and therefore the
/// commitment preimage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub uuid::Uuid);

impl MemberId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse from a UUID string.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A pool member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member identifier.
    pub id: MemberId,
    /// Display name, as entered by the organizer.
    pub name: String,
}

/// Pool state errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Member id already present in the pool.
    #[error("Member {0} is already in the pool")]
    DuplicateMember(MemberId),

    /// Pool already has a persisted draw; membership is frozen.
    #[error("Pool is locked: the draw has already been generated")]
    PoolLocked,

    /// Not enough members to run a draw.
    #[error("At least {MIN_DRAW_MEMBERS} members required, pool has {0}")]
    NotEnoughMembers(usize),
}

/// A rotating-savings pool ("jam3iya").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool identifier.
    pub id: PoolId,
    /// Pool display name.
    pub name: String,
    /// Monthly contribution amount, in whole currency units.
    pub amount: u64,
    /// ISO currency code (e.g. "SAR").
    pub currency: String,
    /// First payout month.
    pub start_date: DateTime<Utc>,
    /// Members, in submission order.
    pub members: Vec<Member>,
    /// Set once a draw has been persisted; the pool is then immutable.
    pub is_locked: bool,
}

impl Pool {
    /// Create an empty pool.
    pub fn new(
        name: impl Into<String>,
        amount: u64,
        currency: impl Into<String>,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PoolId::generate(),
            name: name.into(),
            amount,
            currency: currency.into(),
            start_date,
            members: Vec::new(),
            is_locked: false,
        }
    }

    /// Add a member with a fresh id. Rejected once the pool is locked.
    pub fn add_member(&mut self, name: impl Into<String>) -> Result<MemberId, PoolError> {
        if self.is_locked {
            return Err(PoolError::PoolLocked);
        }
        let member = Member {
            id: MemberId::generate(),
            name: name.into(),
        };
        let id = member.id;
        self.members.push(member);
        Ok(id)
    }

    /// Insert an existing member, rejecting duplicate ids.
    pub fn insert_member(&mut self, member: Member) -> Result<(), PoolError> {
        if self.is_locked {
            return Err(PoolError::PoolLocked);
        }
        if self.members.iter().any(|m| m.id == member.id) {
            return Err(PoolError::DuplicateMember(member.id));
        }
        self.members.push(member);
        Ok(())
    }

    /// Remove a member by id. No-op if absent.
    pub fn remove_member(&mut self, id: MemberId) -> Result<(), PoolError> {
        if self.is_locked {
            return Err(PoolError::PoolLocked);
        }
        self.members.retain(|m| m.id != id);
        Ok(())
    }

    /// Member id strings in submission order, the form that enters
    /// `DrawInputs.members`.
    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.to_string()).collect()
    }

    /// Look up a member's display name by id string.
    pub fn member_name(&self, id: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.id.to_string() == id)
            .map(|m| m.name.as_str())
    }

    /// Check the draw precondition: enough members, not yet drawn.
    pub fn ensure_can_draw(&self) -> Result<(), PoolError> {
        if self.is_locked {
            return Err(PoolError::PoolLocked);
        }
        if self.members.len() < MIN_DRAW_MEMBERS {
            return Err(PoolError::NotEnoughMembers(self.members.len()));
        }
        Ok(())
    }

    /// Freeze the pool after its draw is persisted.
    pub fn lock(&mut self) {
        self.is_locked = true;
    }
}

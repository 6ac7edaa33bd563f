//! Pool Domain State
//!
//! Pools, members, and the append-only audit trail. All policy that the
//! deterministic engine refuses to carry (member minimums, lock-on-draw)
//! lives on these types.

pub mod state;
pub mod audit;

pub use state::{Member, MemberId, Pool, PoolError, PoolId, MIN_DRAW_MEMBERS};
pub use audit::{AuditAction, AuditEntry};

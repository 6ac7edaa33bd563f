//! Deterministic Draw Engine
//!
//! The auditable heart of the system. Three pure operations:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DRAW ENGINE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  inputs.rs  - Committed inputs + canonical preimage         │
//! │  seed.rs    - Seed commitment (one digest binds everything) │
//! │  order.rs   - Per-member scores -> total payout order       │
//! │  verify.rs  - Independent re-derivation and comparison      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is synchronous, side-effect-free and safe to call
//! concurrently: each call is isolated by its arguments. Policy (at
//! least 2 members, non-empty salt, draw-once-per-pool) lives at the
//! serving boundary, never here.

pub mod inputs;
pub mod seed;
pub mod order;
pub mod verify;

pub use inputs::DrawInputs;
pub use seed::{compute_seed, Seed};
pub use order::{generate_fair_order, member_score, RankedMember};
pub use verify::{
    verify, DrawRecord, RecordedScore, VerificationReport, VerifyFailure,
};

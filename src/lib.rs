//! # Qor3a Draw Server
//!
//! Deterministic, auditable payout draws for rotating-savings pools
//! ("jam3iya").
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     QOR3A DRAW SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── hash.rs     - SHA-256 + lowercase hex digests           │
//! │                                                              │
//! │  draw/           - Draw engine (deterministic)               │
//! │  ├── inputs.rs   - Committed inputs + canonical preimage     │
//! │  ├── seed.rs     - Seed commitment                           │
//! │  ├── order.rs    - Fair payout order from seed               │
//! │  └── verify.rs   - Independent record verification           │
//! │                                                              │
//! │  pool/           - Pool domain state                         │
//! │  ├── state.rs    - Pools, members, draw preconditions        │
//! │  └── audit.rs    - Append-only audit trail                   │
//! │                                                              │
//! │  store/          - Persistence boundary (draw-once)          │
//! │                                                              │
//! │  network/        - Serving boundary (non-deterministic)      │
//! │  ├── protocol.rs - JSON message types                        │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `draw/` modules are **100% deterministic**: pure
//! functions of their arguments, no I/O, no clocks, no randomness.
//! Given the same committed inputs, the seed, scores and payout order
//! are identical on any platform, so any party can re-derive and check
//! a published draw. The serving boundary owns every policy decision
//! (member minimums, salt requirement, draw-once-per-pool) and the
//! only wall-clock read, the one-time timestamp capture.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod draw;
pub mod pool;
pub mod store;
pub mod network;

// Re-export commonly used types
pub use draw::{
    compute_seed, generate_fair_order, verify, DrawInputs, DrawRecord, RankedMember,
    Seed, VerificationReport, VerifyFailure,
};
pub use pool::{Member, MemberId, Pool, PoolId, MIN_DRAW_MEMBERS};
pub use store::{DrawStore, StoredDraw, RECORD_VERSION};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON, tagged by `type`, so any client (browser,
//! CLI, independent verifier) can drive the draw API directly.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::draw::{DrawInputs, DrawRecord, RankedMember, Seed, VerifyFailure};
use crate::pool::Member;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a pool with its members.
    CreatePool(CreatePoolRequest),

    /// Fetch a pool with its members and draw, if any.
    GetPool {
        /// Pool identifier.
        pool_id: String,
    },

    /// Add members to an unlocked pool.
    AddMembers {
        /// Pool identifier.
        pool_id: String,
        /// Member display names to add.
        members: Vec<String>,
    },

    /// Generate the pool's draw. Fails if one already exists.
    GenerateDraw(GenerateDrawRequest),

    /// Fetch the stored draw record, verbatim.
    GetDraw {
        /// Pool identifier.
        pool_id: String,
    },

    /// Re-verify the stored draw for a pool against canonical data.
    VerifyPool {
        /// Pool identifier.
        pool_id: String,
    },

    /// Verify an arbitrary caller-supplied record without trusting
    /// the storage layer at all.
    VerifyDraw {
        /// The record to check.
        record: DrawRecord,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Pool creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    /// Pool display name.
    pub name: String,
    /// Monthly contribution amount, whole currency units.
    pub amount: u64,
    /// ISO currency code. Defaults to SAR.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// First payout month.
    pub start_date: DateTime<Utc>,
    /// Member display names.
    pub members: Vec<String>,
}

fn default_currency() -> String {
    "SAR".to_string()
}

/// Draw generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDrawRequest {
    /// Pool identifier.
    pub pool_id: String,
    /// Organizer-supplied secret. Must be non-empty.
    pub salt: String,
    /// Optional external entropy reference.
    #[serde(default)]
    pub external_event: Option<String>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pool was created.
    PoolCreated(PoolInfo),

    /// Pool state with its draw, if any.
    Pool {
        /// The pool.
        pool: PoolInfo,
        /// The draw, once generated.
        draw: Option<DrawInfo>,
    },

    /// A stored or freshly generated draw record.
    Draw(DrawInfo),

    /// Verdict of a verification run. An invalid draw is a normal
    /// result, not an error.
    VerifyResult {
        /// Did the record check out exactly?
        is_valid: bool,
        /// Human-readable verdict.
        diagnostic: String,
        /// The first divergence, when invalid.
        failure: Option<VerifyFailure>,
    },

    /// Request failed.
    Error(ServerError),

    /// Ping response.
    Pong {
        /// Client timestamp from the ping.
        timestamp: u64,
        /// Server wall-clock, milliseconds since epoch.
        server_time: u64,
    },
}

/// Pool state as sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Pool identifier.
    pub id: String,
    /// Pool display name.
    pub name: String,
    /// Monthly contribution amount.
    pub amount: u64,
    /// ISO currency code.
    pub currency: String,
    /// First payout month.
    pub start_date: DateTime<Utc>,
    /// Members in submission order.
    pub members: Vec<Member>,
    /// Whether the draw has been generated.
    pub is_locked: bool,
}

/// Draw record as sent to clients: the persisted fields, verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawInfo {
    /// Draw identifier.
    pub id: String,
    /// Pool identifier.
    pub pool_id: String,
    /// The commitment digest.
    pub seed: Seed,
    /// The committed inputs.
    pub inputs: DrawInputs,
    /// Payout order in exact position order.
    pub results: Vec<RankedMember>,
    /// When the draw was persisted.
    pub created_at: DateTime<Utc>,
    /// Always true for a persisted draw.
    pub is_locked: bool,
}

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Machine-readable reason.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

/// Machine-readable error reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request was malformed or missing fields.
    InvalidRequest,
    /// Pool id does not exist.
    PoolNotFound,
    /// Pool has no draw yet.
    DrawNotFound,
    /// Pool is locked; membership and draw are frozen.
    PoolLocked,
    /// Pool already has a draw; draws are generated at most once.
    DrawAlreadyExists,
    /// Fewer members than the draw minimum.
    NotEnoughMembers,
    /// Draws require a non-empty salt.
    SaltRequired,
    /// Unexpected server-side failure.
    InternalError,
}

impl ClientMessage {
    /// Parse from a JSON text frame.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    /// Parse from a JSON text frame.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

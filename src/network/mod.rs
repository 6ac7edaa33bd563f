//! Network Layer
//!
//! WebSocket server exposing the draw API. This layer is
//! **non-deterministic** (wall clocks, sockets); every auditable
//! computation runs through `draw/`.

pub mod protocol;
pub mod server;

pub use protocol::{
    ClientMessage, CreatePoolRequest, DrawInfo, ErrorCode, GenerateDrawRequest,
    PoolInfo, ServerError, ServerMessage,
};
pub use server::{DrawServer, DrawServerError, ServerConfig};

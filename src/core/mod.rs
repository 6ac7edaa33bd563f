//! Core deterministic primitives.
//!
//! Everything in this module is a pure function of its arguments,
//! byte-identical on every platform. The draw engine is built on top of it.

pub mod hash;

pub use hash::{hash_bytes, sha256_hex, is_hex_digest, HashBytes, DIGEST_HEX_LEN};

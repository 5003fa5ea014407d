//! Wire protocol for Stackwire.
//!
//! This crate defines what clients put on the bus:
//!
//! - **Types** ([`WireSnapshot`], [`WirePiece`], [`RoleClaim`]) — the
//!   message structures, in the JSON shape every client agrees on.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the bus (raw payloads) and the sync
//! engine (domain snapshots). It knows nothing about topics or sessions.
//!
//! ```text
//! Bus (bytes) → Protocol (WireSnapshot → Snapshot) → Sync engine
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode_snapshot, encode_snapshot, Codec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{RoleClaim, WirePiece, WireSnapshot, WireStack};

//! Replicated game sessions for Stackwire.
//!
//! Every client of a session keeps its own full [`Snapshot`](stackwire_board::Snapshot)
//! and publishes the whole thing, retained, after each local move. Clients
//! replace their snapshot with whatever arrives on the session topic. There
//! is no central authority and no merging.
//!
//! # Key types
//!
//! - [`SyncHandle`] — joins a session and drives its engine
//! - [`SyncConfig`] — bootstrap timeout, queue size, claim settings
//! - [`Phase`] — lifecycle state machine
//! - [`TurnStatus`] — what a turn wait resolved to

mod config;
mod engine;
mod error;

pub use config::{Phase, SyncConfig};
pub use engine::{SyncHandle, TurnStatus};
pub use error::SyncError;

//! Error types for the sync layer.

use stackwire_board::{Player, RuleError};
use stackwire_protocol::ProtocolError;
use stackwire_session::SessionError;
use stackwire_transport::TransportError;

/// Errors returned by [`SyncHandle`](crate::SyncHandle) operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The local action was rejected. Nothing changed and nothing was
    /// published; the player can try again.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// The bus failed while bootstrapping.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A snapshot could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Claiming the local role failed (usually: someone else has it).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The game is over.
    #[error("game over: {winner} won")]
    Terminated { winner: Player },

    /// The handle was shut down.
    #[error("sync engine is shut down")]
    Closed,
}

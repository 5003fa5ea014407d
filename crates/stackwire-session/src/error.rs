//! Error types for the session layer.

use stackwire_board::Player;
use stackwire_protocol::ProtocolError;
use stackwire_transport::TransportError;

/// Errors from establishing who we are in a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Session ids are exactly five ASCII digits.
    #[error("invalid session id {0:?}: expected 5 digits")]
    InvalidSessionId(String),

    /// Roles are entered as 1, 2 or 3 (observer).
    #[error("invalid role {0:?}: expected 1, 2 or 3")]
    InvalidRole(String),

    /// Another client already holds this player role.
    #[error("{player} is already taken by client {holder}")]
    RoleTaken { player: Player, holder: String },

    /// The claim could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The bus failed while claiming or releasing a role.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

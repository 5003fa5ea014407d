//! Unified error type for Stackwire.

use stackwire_board::RuleError;
use stackwire_protocol::ProtocolError;
use stackwire_session::SessionError;
use stackwire_sync::SyncError;
use stackwire_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StackwireError {
    /// An illegal move or a move out of turn.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// A snapshot or claim could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The bus failed (connect, subscribe, publish).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bad session id or role, or the role is taken.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The sync engine failed or was shut down.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The configuration file could not be used.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Terminal input or output failed.
    #[error("terminal i/o: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for the board layer.

use crate::{Coord, Player, Size};

/// Why a place or move was rejected.
///
/// A rejected action never changes the board, so these errors are safe to
/// report straight back to the local player and retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The coordinate is outside the 3×3 grid.
    #[error("position ({row},{col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },

    /// Piece sizes are 1 (small), 2 (medium) or 3 (large).
    #[error("piece size must be between 1 and 3, got {0}")]
    InvalidSize(u8),

    /// Players are numbered 1 and 2.
    #[error("player must be 1 or 2, got {0}")]
    InvalidPlayer(u8),

    /// The player has already placed all of their pieces of this size.
    #[error("{player} has already placed all pieces of size {size}")]
    BudgetExhausted { player: Player, size: Size },

    /// The target cell's top piece is the same size or larger.
    #[error("cannot cover the piece at {at}: it is not smaller")]
    CannotCover { at: Coord },

    /// There is nothing to move at the source cell.
    #[error("no piece to move at {0}")]
    EmptySource(Coord),

    /// The source cell's top piece belongs to the other player.
    #[error("the piece at {0} belongs to the other player")]
    NotOwner(Coord),

    /// The acting player is not the active player.
    #[error("it is {active}'s turn")]
    NotYourTurn { active: Player },

    /// Observers never act.
    #[error("observers cannot make moves")]
    Observer,

    /// The game already has a winner.
    #[error("the game is over: {winner} won")]
    GameOver { winner: Player },
}

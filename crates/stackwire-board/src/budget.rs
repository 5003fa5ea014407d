//! Per-player reserve of unplaced pieces.

use crate::{Board, Player, RuleError, Size};

/// How many pieces of each size each player may still place.
///
/// Every player starts with [`PlacementBudget::PER_SIZE`] pieces of each
/// size. Pieces never leave the board once placed (moves only relocate
/// them), so the budget is fully determined by the board:
/// `remaining = PER_SIZE - pieces of that owner and size on the board`.
/// [`PlacementBudget::from_board`] recomputes it that way, which is what
/// lets a client that joins mid-game (and only has a snapshot) know the
/// correct reserves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementBudget {
    /// `remaining[player][size]`.
    remaining: [[u8; 3]; 2],
}

impl PlacementBudget {
    /// Pieces of each size per player.
    pub const PER_SIZE: u8 = 3;

    /// A fresh reserve: three of every size for both players.
    pub fn full() -> Self {
        Self {
            remaining: [[Self::PER_SIZE; 3]; 2],
        }
    }

    /// Derives the reserves from the pieces already on `board`.
    pub fn from_board(board: &Board) -> Self {
        let mut budget = Self::full();
        for player in Player::ALL {
            for size in Size::ALL {
                let used = board.count_pieces(player, size);
                let used = u8::try_from(used).unwrap_or(u8::MAX);
                if used > Self::PER_SIZE {
                    // Only reachable through a snapshot nobody could have
                    // produced with legal placements.
                    tracing::warn!(
                        %player, %size, used,
                        "board holds more pieces than a player owns"
                    );
                }
                budget.remaining[player.index()][size.index()] =
                    Self::PER_SIZE.saturating_sub(used);
            }
        }
        budget
    }

    pub fn remaining(&self, player: Player, size: Size) -> u8 {
        self.remaining[player.index()][size.index()]
    }

    /// Pieces of all sizes `player` still holds.
    pub fn total_remaining(&self, player: Player) -> u8 {
        self.remaining[player.index()].iter().sum()
    }

    /// Takes one piece of `size` from `player`'s reserve.
    pub fn consume(&mut self, player: Player, size: Size) -> Result<(), RuleError> {
        let slot = &mut self.remaining[player.index()][size.index()];
        if *slot == 0 {
            return Err(RuleError::BudgetExhausted { player, size });
        }
        *slot -= 1;
        Ok(())
    }
}

impl Default for PlacementBudget {
    fn default() -> Self {
        Self::full()
    }
}

//! The replicated game state and the single-step transition over it.

use crate::{rules, Board, Coord, PlacementBudget, Player, Role, RuleError, Size, TurnManager};

/// A local player's intended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Put a new piece from the reserve onto `at`.
    Place { at: Coord, size: Size },
    /// Move an own top piece from one cell to another.
    Move { from: Coord, to: Coord },
}

/// What a successful [`Snapshot::play`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// The player that acted.
    pub actor: Player,
    /// Set when the action completed a line.
    pub winner: Option<Player>,
    /// The active player after the action. Unchanged when the game was won.
    pub next: Player,
}

/// Board, active player and winner: the whole game, and the only thing
/// that is ever replicated. There are no deltas; receivers replace their
/// snapshot with the incoming one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    board: Board,
    turn: TurnManager,
    winner: Option<Player>,
}

impl Snapshot {
    /// The state of a new session: empty board, player one to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: TurnManager::new(),
            winner: None,
        }
    }

    /// Reassembles a snapshot from decoded parts. Nothing is re-validated.
    pub fn from_parts(board: Board, active: Player, winner: Option<Player>) -> Self {
        Self {
            board,
            turn: TurnManager::starting_with(active),
            winner,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active_player(&self) -> Player {
        self.turn.current()
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Both players' remaining reserves, derived from the board.
    pub fn budget(&self) -> PlacementBudget {
        PlacementBudget::from_board(&self.board)
    }

    /// Authorizes, validates and applies one action.
    ///
    /// Order of checks: game over, turn/role, then the board rules. The
    /// winner is recomputed afterwards and the turn flips only if nobody
    /// won. On `Err` the snapshot is untouched.
    pub fn play(&mut self, role: Role, action: Action) -> Result<Outcome, RuleError> {
        if let Some(winner) = self.winner {
            return Err(RuleError::GameOver { winner });
        }
        let actor = self.turn.authorize(role)?;

        match action {
            Action::Place { at, size } => {
                let mut budget = PlacementBudget::from_board(&self.board);
                self.board.place(at, size, actor, &mut budget)?;
            }
            Action::Move { from, to } => {
                self.board.move_piece(from, to, actor)?;
            }
        }

        self.winner = rules::check_win(&self.board);
        let next = match self.winner {
            Some(_) => self.turn.current(),
            None => self.turn.flip(),
        };
        Ok(Outcome {
            actor,
            winner: self.winner,
            next,
        })
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

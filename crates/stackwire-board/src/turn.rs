//! Whose move it is, and who is allowed to make it.

use std::fmt;

use crate::{Player, RuleError};

/// The part a local client plays in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Acts as one of the two players.
    Player(Player),
    /// Watches the game. Never acts, never publishes.
    Observer,
}

impl Role {
    /// The player this role acts as, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            Role::Player(p) => Some(p),
            Role::Observer => None,
        }
    }

    pub fn is_observer(self) -> bool {
        matches!(self, Role::Observer)
    }
}

impl From<Player> for Role {
    fn from(player: Player) -> Self {
        Role::Player(player)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player(p) => write!(f, "{p}"),
            Role::Observer => write!(f, "observer"),
        }
    }
}

/// Two-state machine: `Turn(1) ⇄ Turn(2)`.
///
/// The manager only tracks the active player. It doesn't know about
/// winners; the caller is responsible for not flipping once the game is
/// over (see [`Snapshot::play`](crate::Snapshot::play)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnManager {
    current: Player,
}

impl TurnManager {
    /// Player one moves first.
    pub fn new() -> Self {
        Self::starting_with(Player::One)
    }

    /// Resumes at a given player, e.g. from a replicated snapshot.
    pub fn starting_with(player: Player) -> Self {
        Self { current: player }
    }

    pub fn current(&self) -> Player {
        self.current
    }

    /// Hands the turn to the other player.
    pub fn flip(&mut self) -> Player {
        self.current = self.current.opponent();
        self.current
    }

    /// Checks that `role` may act right now and returns the acting player.
    ///
    /// Runs before any rule check: an observer or an out-of-turn player is
    /// turned away without the board being looked at.
    pub fn authorize(&self, role: Role) -> Result<Player, RuleError> {
        match role {
            Role::Observer => Err(RuleError::Observer),
            Role::Player(p) if p == self.current => Ok(p),
            Role::Player(_) => Err(RuleError::NotYourTurn {
                active: self.current,
            }),
        }
    }
}

impl Default for TurnManager {
    fn default() -> Self {
        Self::new()
    }
}

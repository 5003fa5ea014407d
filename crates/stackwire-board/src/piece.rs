//! Pieces, their sizes, and their owners.

use std::fmt;

use crate::RuleError;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One of the two players. On the wire these are the integers 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Both players, in turn order.
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    /// The player's wire number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    /// The other player. Turn flipping is `3 - current` in wire numbers.
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl TryFrom<u8> for Player {
    type Error = RuleError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(RuleError::InvalidPlayer(other)),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// Piece size. Declaration order is size order, so `Small < Large`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Size {
    Small,
    Medium,
    Large,
}

impl Size {
    /// All sizes, smallest first.
    pub const ALL: [Size; 3] = [Size::Small, Size::Medium, Size::Large];

    /// The size's wire value (1, 2 or 3).
    pub fn value(self) -> u8 {
        match self {
            Size::Small => 1,
            Size::Medium => 2,
            Size::Large => 3,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.value() as usize - 1
    }
}

impl TryFrom<u8> for Size {
    type Error = RuleError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Size::Small),
            2 => Ok(Size::Medium),
            3 => Ok(Size::Large),
            other => Err(RuleError::InvalidSize(other)),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// A single piece. Immutable once created: moving a piece moves the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub size: Size,
    pub owner: Player,
}

impl Piece {
    pub fn new(size: Size, owner: Player) -> Self {
        Self { size, owner }
    }
}

/// Renders as `<owner><size>`, e.g. `13` for player 1's large piece.
impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.owner.number(), self.size.value())
    }
}

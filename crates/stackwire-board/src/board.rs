//! The 3×3 grid of piece stacks.

use std::fmt;

use crate::{rules, Piece, PlacementBudget, Player, RuleError, Size};

/// Width and height of the board.
pub const BOARD_SIZE: usize = 3;

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// A bounds-checked, 0-indexed board position.
///
/// The only way to get a `Coord` is through [`Coord::new`] (or
/// [`Coord::all`]), so every `Coord` in the program is on the board and
/// indexing with it cannot panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    row: usize,
    col: usize,
}

impl Coord {
    /// Creates a coordinate, rejecting anything outside the grid.
    pub fn new(row: usize, col: usize) -> Result<Self, RuleError> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(RuleError::OutOfBounds { row, col });
        }
        Ok(Self { row, col })
    }

    pub fn row(self) -> usize {
        self.row
    }

    pub fn col(self) -> usize {
        self.col
    }

    /// Every cell in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord { row, col }))
    }

    /// Const constructor for the fixed line table in [`rules`].
    pub(crate) const fn at(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// An ordered pile of pieces, bottom first. Only the top can change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack(Vec<Piece>);

impl Stack {
    /// Builds a stack from pieces listed bottom to top.
    ///
    /// No stacking rule is checked here: this is how replicated snapshots
    /// are rebuilt, and those are trusted as-is.
    pub fn from_pieces(pieces: Vec<Piece>) -> Self {
        Self(pieces)
    }

    /// The most recently placed piece, which owns the cell.
    pub fn top(&self) -> Option<Piece> {
        self.0.last().copied()
    }

    /// All pieces, bottom first.
    pub fn pieces(&self) -> &[Piece] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn push(&mut self, piece: Piece) {
        self.0.push(piece);
    }

    fn pop(&mut self) -> Option<Piece> {
        self.0.pop()
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The fixed 3×3 grid.
///
/// `Board` has no interior mutability and is not shared: whoever holds
/// the snapshot owns its board outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Stack; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a board from its rows (used by the wire decoder).
    pub fn from_rows(cells: [[Stack; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    /// The rows, each a row of stacks.
    pub fn rows(&self) -> &[[Stack; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    pub fn stack(&self, at: Coord) -> &Stack {
        &self.cells[at.row][at.col]
    }

    pub fn top(&self, at: Coord) -> Option<Piece> {
        self.stack(at).top()
    }

    /// Every cell with its stack, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, &Stack)> {
        Coord::all().map(move |at| (at, self.stack(at)))
    }

    pub fn is_empty(&self) -> bool {
        self.cells().all(|(_, stack)| stack.is_empty())
    }

    /// Counts `owner`'s pieces of `size` anywhere on the board, buried
    /// pieces included.
    pub fn count_pieces(&self, owner: Player, size: Size) -> usize {
        self.cells()
            .flat_map(|(_, stack)| stack.pieces())
            .filter(|p| p.owner == owner && p.size == size)
            .count()
    }

    /// Places a new piece from `owner`'s reserve onto `at`.
    ///
    /// Checked in order: budget for `(owner, size)`, then the stacking
    /// rule. On success the piece is pushed and the budget consumed; on
    /// failure neither the board nor the budget changes.
    pub fn place(
        &mut self,
        at: Coord,
        size: Size,
        owner: Player,
        budget: &mut PlacementBudget,
    ) -> Result<(), RuleError> {
        if budget.remaining(owner, size) == 0 {
            return Err(RuleError::BudgetExhausted { player: owner, size });
        }
        rules::can_place(self, at, size)?;

        budget.consume(owner, size)?;
        self.cells[at.row][at.col].push(Piece::new(size, owner));
        tracing::trace!(%at, %size, %owner, "piece placed");
        Ok(())
    }

    /// Moves `acting`'s top piece from `from` onto `to`.
    ///
    /// The pop and push happen inside one `&mut self` call, so no caller
    /// can ever observe the piece missing from both cells.
    pub fn move_piece(
        &mut self,
        from: Coord,
        to: Coord,
        acting: Player,
    ) -> Result<Piece, RuleError> {
        rules::can_move(self, from, to, acting)?;

        let piece = self.cells[from.row][from.col]
            .pop()
            .ok_or(RuleError::EmptySource(from))?;
        self.cells[to.row][to.col].push(piece);
        tracing::trace!(%from, %to, %piece, "piece moved");
        Ok(piece)
    }

    /// One line per cell listing the whole stack bottom to top, e.g.
    /// `[0,0]: (2,2) (1,3)`. Complements `Display`, which only shows tops.
    pub fn describe_stacks(&self) -> String {
        let mut out = String::new();
        for (at, stack) in self.cells() {
            out.push_str(&format!("[{},{}]:", at.row, at.col));
            if stack.is_empty() {
                out.push_str(" (empty)");
            }
            for piece in stack.pieces() {
                out.push_str(&format!(
                    " ({},{})",
                    piece.owner.number(),
                    piece.size.value()
                ));
            }
            out.push('\n');
        }
        out
    }
}

/// Renders the visible tops: `<owner><size>` per cell, `.` when empty.
///
/// ```text
///  13   .    .
///  .    22   .
///  .    .    11
/// ```
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for stack in row {
                match stack.top() {
                    Some(piece) => write!(f, " {piece}  ")?,
                    None => write!(f, "  .  ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

//! Win detection and the stacking legality predicates.
//!
//! The predicates are public so that callers holding a snapshot can
//! check an action before committing to it; [`Board::place`] and
//! [`Board::move_piece`] run them too.

use crate::{Board, Coord, Piece, Player, RuleError, Size};

/// The eight winning lines, in scan order: row 0, column 0, row 1,
/// column 1, row 2, column 2, main diagonal, anti-diagonal.
pub const LINES: [[Coord; 3]; 8] = [
    [Coord::at(0, 0), Coord::at(0, 1), Coord::at(0, 2)],
    [Coord::at(0, 0), Coord::at(1, 0), Coord::at(2, 0)],
    [Coord::at(1, 0), Coord::at(1, 1), Coord::at(1, 2)],
    [Coord::at(0, 1), Coord::at(1, 1), Coord::at(2, 1)],
    [Coord::at(2, 0), Coord::at(2, 1), Coord::at(2, 2)],
    [Coord::at(0, 2), Coord::at(1, 2), Coord::at(2, 2)],
    [Coord::at(0, 0), Coord::at(1, 1), Coord::at(2, 2)],
    [Coord::at(0, 2), Coord::at(1, 1), Coord::at(2, 0)],
];

/// Returns the winner, if any.
///
/// A line belongs to a player when all three cells are occupied and all
/// three *top* pieces are theirs. Sizes and buried pieces don't matter.
pub fn check_win(board: &Board) -> Option<Player> {
    winning_line(board).map(|(player, _)| player)
}

/// Like [`check_win`], also reporting the first winning line found.
pub fn winning_line(board: &Board) -> Option<(Player, [Coord; 3])> {
    LINES.iter().find_map(|line| {
        let owner = line_owner(board, line)?;
        Some((owner, *line))
    })
}

fn line_owner(board: &Board, line: &[Coord; 3]) -> Option<Player> {
    let [a, b, c] = line.map(|at| board.top(at).map(|p| p.owner));
    match (a?, b?, c?) {
        (a, b, c) if a == b && b == c => Some(a),
        _ => None,
    }
}

/// Can a piece of `size` go on top of `at`?
pub fn can_place(board: &Board, at: Coord, size: Size) -> Result<(), RuleError> {
    match board.top(at) {
        Some(top) if top.size >= size => Err(RuleError::CannotCover { at }),
        _ => Ok(()),
    }
}

/// Can `acting` move the top piece of `from` onto `to`?
///
/// Returns the piece that would move.
pub fn can_move(
    board: &Board,
    from: Coord,
    to: Coord,
    acting: Player,
) -> Result<Piece, RuleError> {
    let piece = board.top(from).ok_or(RuleError::EmptySource(from))?;
    if piece.owner != acting {
        return Err(RuleError::NotOwner(from));
    }
    can_place(board, to, piece.size)?;
    Ok(piece)
}

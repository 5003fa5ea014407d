//! Text rendering of a snapshot for the terminal.

use std::fmt::Write;

use stackwire_board::{Player, Role, Size, Snapshot};

/// The board (visible tops only), each player's remaining pieces, and
/// whose turn it is.
///
/// ```text
///  13    .    .
///   .   22    .
///   .    .   11
/// reserve  player 1: S3 M3 L2  player 2: S2 M3 L3
/// player 1 to move (you)
/// ```
pub fn render_snapshot(snapshot: &Snapshot, role: Role) -> String {
    let mut out = snapshot.board().to_string();

    let budget = snapshot.budget();
    out.push_str("reserve");
    for player in Player::ALL {
        let _ = write!(out, "  {player}:");
        for size in Size::ALL {
            let _ = write!(out, " {}{}", size_letter(size), budget.remaining(player, size));
        }
    }
    out.push('\n');

    match snapshot.winner() {
        Some(winner) if role.player() == Some(winner) => {
            let _ = writeln!(out, "{winner} wins (you)");
        }
        Some(winner) => {
            let _ = writeln!(out, "{winner} wins");
        }
        None => {
            let active = snapshot.active_player();
            let suffix = if role.player() == Some(active) { " (you)" } else { "" };
            let _ = writeln!(out, "{active} to move{suffix}");
        }
    }
    out
}

fn size_letter(size: Size) -> char {
    match size {
        Size::Small => 'S',
        Size::Medium => 'M',
        Size::Large => 'L',
    }
}

//! Parsing of in-game terminal commands.
//!
//! ```text
//! 1 <row> <col> <size>                    place a new piece
//! 2 <from_row> <from_col> <to_row> <to_col>  move a piece you own
//! q                                       leave the game
//! ```
//!
//! Coordinates are 0-indexed; sizes are 1 (small) to 3 (large).

use stackwire_board::{Coord, RuleError, Size};

/// One line of player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Place { at: Coord, size: Size },
    Move { from: Coord, to: Coord },
    Quit,
}

/// Why a line isn't a command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}: use 1 to place, 2 to move, q to quit")]
    Unknown(String),

    #[error("expected {expected} numbers after the command, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("{0:?} is not a number")]
    NotANumber(String),

    /// Well-formed, but names a cell or size that doesn't exist.
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Parses one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or(CommandError::Empty)?;
    let args = words.collect::<Vec<_>>();

    match verb {
        "q" | "quit" if args.is_empty() => Ok(Command::Quit),
        "1" => {
            let [row, col, size] = numbers::<3>(&args)?;
            let size = u8::try_from(size)
                .map_err(|_| RuleError::InvalidSize(u8::MAX))
                .and_then(Size::try_from)?;
            Ok(Command::Place {
                at: Coord::new(row, col)?,
                size,
            })
        }
        "2" => {
            let [from_row, from_col, to_row, to_col] = numbers::<4>(&args)?;
            Ok(Command::Move {
                from: Coord::new(from_row, from_col)?,
                to: Coord::new(to_row, to_col)?,
            })
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn numbers<const N: usize>(args: &[&str]) -> Result<[usize; N], CommandError> {
    if args.len() != N {
        return Err(CommandError::Arity {
            expected: N,
            got: args.len(),
        });
    }
    let mut out = [0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| CommandError::NotANumber((*arg).to_string()))?;
    }
    Ok(out)
}

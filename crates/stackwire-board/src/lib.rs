//! Board model and game rules for Stackwire.
//!
//! This crate is the pure part of the game: no I/O, no locking, no bus.
//! Everything here can be replayed deterministically on any client.
//!
//! # Key types
//!
//! - [`Piece`], [`Size`], [`Player`] — the pieces and who owns them
//! - [`Stack`], [`Board`], [`Coord`] — the 3×3 grid of piece stacks
//! - [`PlacementBudget`] — how many pieces of each size a player may still place
//! - [`TurnManager`], [`Role`] — whose move it is and who may act
//! - [`Snapshot`] — board + turn + winner, the unit of replication
//! - [`rules`] — win detection and the legality predicates
//!
//! # How it fits in the stack
//!
//! ```text
//! Sync engine (above)     ← locks, publishes, replaces snapshots
//!     ↕
//! Board (this crate)      ← validates and applies a single action
//! ```

mod board;
mod budget;
mod error;
mod piece;
pub mod rules;
mod snapshot;
mod turn;

pub use board::{Board, Coord, Stack, BOARD_SIZE};
pub use budget::PlacementBudget;
pub use error::RuleError;
pub use piece::{Piece, Player, Size};
pub use snapshot::{Action, Outcome, Snapshot};
pub use turn::{Role, TurnManager};

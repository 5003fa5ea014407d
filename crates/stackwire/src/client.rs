//! The interactive game loop behind `stackwire play`.
//!
//! Reads commands line by line, drives a [`SyncHandle`], and redraws the
//! board whenever it changes. While it isn't the local player's turn the
//! loop waits on the engine and on input at the same time, so `q` always
//! works.

use std::future::Future;
use std::io::Write;

use stackwire_board::Player;
use stackwire_protocol::Codec;
use stackwire_sync::{SyncError, SyncHandle, TurnStatus};
use stackwire_transport::MessageBus;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{parse_command, render_snapshot, Command, StackwireError};

/// How a game loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameExit {
    /// The game has a winner.
    Finished { winner: Player },
    /// The user typed `q` or input ended.
    Quit,
    /// The interrupt future completed first (Ctrl-C in the binary).
    Interrupted,
}

/// Runs [`run_game`] until it ends or `interrupt` completes, then shuts the
/// handle down.
///
/// Shutdown runs on every path, including loop errors, so the role claim
/// is released and the seat can be taken again. A loop error wins over a
/// shutdown error.
pub async fn play_session<B, C, R, W, F>(
    handle: &SyncHandle<B, C>,
    input: R,
    out: W,
    interrupt: F,
) -> Result<GameExit, StackwireError>
where
    B: MessageBus,
    C: Codec,
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Future,
{
    let result = tokio::select! {
        result = run_game(handle, input, out) => result,
        _ = interrupt => {
            tracing::info!(session = %handle.session().id(), "interrupted, leaving the game");
            Ok(GameExit::Interrupted)
        }
    };

    let shutdown = handle.shutdown().await;
    let exit = result?;
    shutdown?;
    Ok(exit)
}

/// Runs the game until it ends or the user leaves.
///
/// Rule violations are printed and the prompt repeats. Only terminal or
/// engine failures end the loop with an error.
pub async fn run_game<B, C, R, W>(
    handle: &SyncHandle<B, C>,
    input: R,
    mut out: W,
) -> Result<GameExit, StackwireError>
where
    B: MessageBus,
    C: Codec,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let role = handle.session().role();
    let mut lines = input.lines();

    writeln!(out, "{}", render_snapshot(&handle.snapshot().await, role))?;

    let Some(player) = role.player() else {
        return watch_game(handle, &mut lines, out).await;
    };

    loop {
        if let Some(winner) = handle.outcome().await {
            return Ok(GameExit::Finished { winner });
        }

        if handle.snapshot().await.active_player() != player {
            writeln!(out, "waiting for the opponent...")?;
            out.flush()?;
            // Turn changes win over input typed while waiting.
            tokio::select! {
                biased;
                status = handle.wait_for_turn(player) => {
                    let status = status?;
                    writeln!(out, "{}", render_snapshot(&handle.snapshot().await, role))?;
                    if let TurnStatus::Finished { winner } = status {
                        return Ok(GameExit::Finished { winner });
                    }
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) if is_quit(&line) => return Ok(GameExit::Quit),
                        Some(_) => writeln!(out, "not your turn")?,
                        None => return Ok(GameExit::Quit),
                    }
                }
            }
            continue;
        }

        write!(out, "your move> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(GameExit::Quit);
        };

        let result = match parse_command(&line) {
            Ok(Command::Quit) => return Ok(GameExit::Quit),
            Ok(Command::Place { at, size }) => handle.place(at, size).await,
            Ok(Command::Move { from, to }) => handle.move_piece(from, to).await,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };

        match result {
            Ok(_) => writeln!(out, "{}", render_snapshot(&handle.snapshot().await, role))?,
            Err(SyncError::Rule(e)) => writeln!(out, "invalid move: {e}")?,
            Err(SyncError::Terminated { winner }) => return Ok(GameExit::Finished { winner }),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Observers only watch: redraw on every change until the game ends.
async fn watch_game<B, C, R, W>(
    handle: &SyncHandle<B, C>,
    lines: &mut Lines<R>,
    mut out: W,
) -> Result<GameExit, StackwireError>
where
    B: MessageBus,
    C: Codec,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let role = handle.session().role();
    let mut updates = handle.subscribe_updates();

    let winner = updates.borrow_and_update().winner();
    if let Some(winner) = winner {
        return Ok(GameExit::Finished { winner });
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                changed.map_err(|_| SyncError::Closed)?;
                let snapshot = updates.borrow_and_update().clone();
                writeln!(out, "{}", render_snapshot(&snapshot, role))?;
                if let Some(winner) = snapshot.winner() {
                    return Ok(GameExit::Finished { winner });
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) if is_quit(&line) => return Ok(GameExit::Quit),
                    Some(_) => writeln!(out, "observers can't move, q to leave")?,
                    None => return Ok(GameExit::Quit),
                }
            }
        }
    }
}

fn is_quit(line: &str) -> bool {
    matches!(parse_command(line), Ok(Command::Quit))
}

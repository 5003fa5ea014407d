//! # Stackwire
//!
//! Stacking tic-tac-toe played between peers over a retained pub/sub bus.
//!
//! Every client holds the whole game and publishes the whole game after
//! each move; there is no game server, only a broker that remembers the
//! last snapshot per session. This crate ties the layers together for the
//! `stackwire` binary: configuration, command parsing, rendering and the
//! interactive game loop.
//!
//! ```text
//! stackwire (this crate)   ← config, terminal loop
//!     ↕
//! stackwire-sync           ← bootstrap, replicate, wait for turns
//!     ↕
//! stackwire-session        ← session ids, topics, role claims
//!     ↕
//! stackwire-protocol       ← JSON wire format
//!     ↕
//! stackwire-transport      ← MemoryBus, WebSocketBus, BrokerServer
//!
//! stackwire-board          ← board, rules, turns (used by all of the above)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stackwire::prelude::*;
//!
//! # async fn demo() -> Result<(), StackwireError> {
//! let bus = MemoryBus::new();
//! let session = Session::new(SessionId::parse("12345")?, DEFAULT_NAMESPACE, resolve_role("1")?);
//! let handle = SyncHandle::start(bus, JsonCodec, session, SyncConfig::default()).await?;
//! handle.place(Coord::new(1, 1)?, Size::Large).await?;
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod command;
mod config;
mod error;
mod render;

pub use client::{play_session, run_game, GameExit};
pub use command::{parse_command, Command, CommandError};
pub use config::{ClientConfig, ConfigError};
pub use error::StackwireError;
pub use render::render_snapshot;

/// Everything a client needs in one import.
pub mod prelude {
    pub use crate::{
        parse_command, play_session, render_snapshot, run_game, ClientConfig, Command,
        GameExit, StackwireError,
    };
    pub use stackwire_board::{Coord, Player, Role, RuleError, Size, Snapshot};
    pub use stackwire_protocol::JsonCodec;
    pub use stackwire_session::{resolve_role, Session, SessionId, DEFAULT_NAMESPACE};
    pub use stackwire_sync::{Phase, SyncConfig, SyncHandle, TurnStatus};
    pub use stackwire_transport::{BrokerServer, MemoryBus, MessageBus, WebSocketBus};
}

//! Engine configuration and lifecycle phase.

use std::time::Duration;

use stackwire_session::ClaimConfig;

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Configuration for a sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long to wait for a retained snapshot before starting a new game.
    ///
    /// Default: 2 seconds.
    pub bootstrap_timeout: Duration,

    /// Capacity of the queue between the bus and the consumer task.
    /// Deliveries beyond it are dropped by the bus (and logged there).
    ///
    /// Default: 64. Minimum: 1.
    pub inbound_queue: usize,

    /// Role claim settings.
    pub claims: ClaimConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout: Duration::from_secs(2),
            inbound_queue: 64,
            claims: ClaimConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Clamps out-of-range values.
    pub fn validated(mut self) -> Self {
        if self.inbound_queue == 0 {
            tracing::warn!("inbound_queue of 0 is not usable, using 1");
            self.inbound_queue = 1;
        }
        self.claims = self.claims.validated();
        self
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The engine's lifecycle.
///
/// ```text
/// Bootstrapping → Active → Terminated
///        └──────────────────↑   (adopted snapshot already has a winner)
/// ```
///
/// - **Bootstrapping**: subscribed, waiting for a retained snapshot or
///   the timeout.
/// - **Active**: local moves are accepted and remote snapshots replace
///   the local one.
/// - **Terminated**: some snapshot carried a winner. Nothing changes
///   any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Bootstrapping,
    Active,
    Terminated,
}

impl Phase {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Bootstrapping, Self::Active)
                | (Self::Bootstrapping, Self::Terminated)
                | (Self::Active, Self::Terminated)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bootstrapping => write!(f, "Bootstrapping"),
            Self::Active => write!(f, "Active"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

//! Role claims: at most one client per player role.
//!
//! A claim is a retained [`RoleClaim`] on `<topic>/roles/<n>`. Claiming
//! runs in two listening windows:
//!
//! ```text
//! subscribe ── window 1 ──► someone else's claim retained? → RoleTaken
//!                │
//!                └─► publish own claim ── window 2 ──► smallest client id
//!                                                      among claims seen wins
//! ```
//!
//! Two clients that both pass window 1 see each other's claims in window
//! 2 and reach the same verdict independently. The winner publishes its
//! claim once more so the retained message names it.

use std::collections::BTreeSet;
use std::time::Duration;

use stackwire_board::Player;
use stackwire_protocol::{Codec, RoleClaim};
use stackwire_transport::{MessageBus, QoS, Subscription};
use tokio::time::Instant;

use crate::{role_claim_topic, SessionError};

/// Deliveries buffered while watching a claim topic.
const CLAIM_QUEUE: usize = 16;

/// Tuning for role claims.
#[derive(Debug, Clone)]
pub struct ClaimConfig {
    /// How long each listening window lasts.
    ///
    /// Default: 500 ms. Longer windows tolerate slower brokers.
    pub claim_window: Duration,

    /// When `false`, roles aren't claimed at all and two clients may play
    /// the same side (the behavior of clients without claims).
    ///
    /// Default: `true`.
    pub enforce: bool,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            claim_window: Duration::from_millis(500),
            enforce: true,
        }
    }
}

impl ClaimConfig {
    /// Clamps the window to at least 10 ms.
    pub fn validated(mut self) -> Self {
        self.claim_window = self.claim_window.max(Duration::from_millis(10));
        self
    }
}

/// A role this client successfully claimed. Release it with
/// [`HeldClaim::release`] when leaving the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldClaim {
    player: Player,
    topic: String,
    client_id: String,
}

impl HeldClaim {
    pub fn player(&self) -> Player {
        self.player
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Clears the retained claim so the role is free again.
    pub async fn release<B: MessageBus>(&self, bus: &B) -> Result<(), SessionError> {
        bus.publish(&self.topic, Vec::new(), true, QoS::AtLeastOnce)
            .await?;
        tracing::info!(player = %self.player, client_id = %self.client_id, "role released");
        Ok(())
    }
}

/// Claims `player` in the session on `session_topic` for `client_id`.
///
/// A retained claim carrying our own `client_id` counts as ours, so a
/// client restarted with a fixed id takes its role back.
///
/// # Errors
/// [`SessionError::RoleTaken`] when another client holds or wins the
/// role; [`SessionError::Transport`] when the bus fails.
pub async fn claim_role<B: MessageBus, C: Codec>(
    bus: &B,
    codec: &C,
    session_topic: &str,
    player: Player,
    client_id: &str,
    config: &ClaimConfig,
) -> Result<HeldClaim, SessionError> {
    let topic = role_claim_topic(session_topic, player);
    let mut sub = bus.subscribe(&topic, QoS::AtLeastOnce, CLAIM_QUEUE).await?;

    // Window 1: is the role already held?
    let seen = watch_claims(&mut sub, codec, config.claim_window).await;
    if let Some(holder) = seen.current.filter(|c| c.client_id != client_id) {
        tracing::info!(%player, holder = %holder.client_id, "role already claimed");
        return Err(SessionError::RoleTaken {
            player,
            holder: holder.client_id,
        });
    }

    let claim = RoleClaim::new(player, client_id);
    let payload = codec.encode(&claim)?;
    bus.publish(&topic, payload.clone(), true, QoS::AtLeastOnce)
        .await?;

    // Window 2: did anyone claim at the same time?
    let seen = watch_claims(&mut sub, codec, config.claim_window).await;
    let mut contenders = seen.claimants;
    contenders.insert(client_id.to_string());
    let winner = contenders
        .first()
        .cloned()
        .unwrap_or_else(|| client_id.to_string());

    if winner != client_id {
        tracing::info!(%player, %winner, "lost a simultaneous role claim");
        return Err(SessionError::RoleTaken {
            player,
            holder: winner,
        });
    }

    if contenders.len() > 1 || seen.current.as_ref() != Some(&claim) {
        // Make sure the retained claim is ours, not the loser's.
        bus.publish(&topic, payload, true, QoS::AtLeastOnce).await?;
    }

    tracing::info!(%player, client_id, "role claimed");
    Ok(HeldClaim {
        player,
        topic,
        client_id: client_id.to_string(),
    })
}

/// What a listening window observed on a claim topic.
#[derive(Debug, Default)]
struct ClaimsSeen {
    /// The claim standing at the end of the window (`None` if cleared or
    /// never set).
    current: Option<RoleClaim>,
    /// Every client id that claimed during the window.
    claimants: BTreeSet<String>,
}

async fn watch_claims<C: Codec>(sub: &mut Subscription, codec: &C, window: Duration) -> ClaimsSeen {
    let deadline = Instant::now() + window;
    let mut seen = ClaimsSeen::default();

    while let Ok(Some(msg)) = tokio::time::timeout_at(deadline, sub.recv()).await {
        if msg.payload.is_empty() {
            seen.current = None;
            continue;
        }
        match codec.decode::<RoleClaim>(&msg.payload) {
            Ok(claim) => {
                seen.claimants.insert(claim.client_id.clone());
                seen.current = Some(claim);
            }
            Err(e) => {
                tracing::warn!(topic = sub.topic(), error = %e, "ignoring malformed role claim");
            }
        }
    }
    seen
}

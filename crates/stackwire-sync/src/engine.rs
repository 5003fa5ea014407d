//! The sync engine: one local snapshot kept in step with the session topic.
//!
//! Each engine owns:
//! - The local [`Snapshot`] behind a Tokio mutex, shared by local actions
//!   and the consumer task
//! - A consumer task that reads the session topic and replaces the local
//!   snapshot with every valid delivery (last writer wins)
//! - A `watch` channel that wakes anyone waiting for the board to change
//!
//! Local actions validate, mutate and publish while holding the lock, so
//! a remote replacement can never interleave with a half-applied move.
//! The engine remembers what it published and skips those payloads when
//! the bus delivers them back, so a stale echo never rolls the board back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stackwire_board::{Action, Coord, Outcome, PlacementBudget, Player, Role, Size, Snapshot};
use stackwire_protocol::{decode_snapshot, encode_snapshot, Codec};
use stackwire_session::{claim_role, HeldClaim, Session};
use stackwire_transport::{MessageBus, QoS, Subscription, TransportError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{Phase, SyncConfig, SyncError};

/// Snapshots are published at least once; duplicates are harmless.
const SNAPSHOT_QOS: QoS = QoS::AtLeastOnce;

/// Own publishes remembered until the bus echoes them back.
const MAX_PENDING_ECHOES: usize = 32;

/// What [`SyncHandle::wait_for_turn`] woke up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The awaited player is now active.
    Yours,
    /// The game ended before that happened (or had already ended).
    Finished { winner: Player },
}

struct EngineState {
    snapshot: Snapshot,
    phase: Phase,
    claim: Option<HeldClaim>,
    /// Payloads this engine published whose echo hasn't come back yet,
    /// oldest first.
    pending_echoes: VecDeque<Vec<u8>>,
}

impl EngineState {
    fn enter(&mut self, target: Phase, topic: &str) {
        if self.phase.can_transition_to(target) {
            tracing::info!(topic, from = %self.phase, to = %target, "phase changed");
            self.phase = target;
        }
    }

    /// Moves to `Terminated` if the current snapshot carries a winner.
    fn settle_phase(&mut self, topic: &str) {
        if self.snapshot.is_finished() {
            self.enter(Phase::Terminated, topic);
        }
    }

    fn record_publish(&mut self, payload: Vec<u8>) {
        if self.pending_echoes.len() == MAX_PENDING_ECHOES {
            self.pending_echoes.pop_front();
        }
        self.pending_echoes.push_back(payload);
    }

    /// Returns `true` if `payload` is one of our own publishes coming back.
    ///
    /// The bus delivers a topic in publish order, so older pending
    /// payloads were dropped on the way and are forgotten too.
    fn take_echo(&mut self, payload: &[u8]) -> bool {
        match self.pending_echoes.iter().position(|p| p.as_slice() == payload) {
            Some(index) => {
                self.pending_echoes.drain(..=index);
                true
            }
            None => false,
        }
    }
}

struct Shared<B, C> {
    bus: B,
    codec: C,
    session: Session,
    state: Mutex<EngineState>,
    updates: watch::Sender<Snapshot>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<B: MessageBus, C: Codec> Shared<B, C> {
    /// Replaces the local snapshot with a delivered one, unless the
    /// delivery is our own publish echoed back.
    async fn apply_delivery(&self, payload: &[u8]) {
        let topic = self.session.topic();
        let mut state = self.state.lock().await;

        if state.take_echo(payload) {
            tracing::trace!(topic, "own snapshot echoed back");
            return;
        }
        let incoming = match decode_snapshot(&self.codec, payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    topic,
                    bytes = payload.len(),
                    error = %e,
                    "dropping undecodable snapshot"
                );
                return;
            }
        };

        if state.phase == Phase::Terminated {
            tracing::debug!(topic = self.session.topic(), "game over, ignoring snapshot");
            return;
        }
        if state.snapshot == incoming {
            tracing::trace!(topic = self.session.topic(), "snapshot unchanged");
            return;
        }

        state.snapshot = incoming;
        state.settle_phase(topic);
        if let Some(winner) = state.snapshot.winner() {
            tracing::info!(topic = self.session.topic(), %winner, "game over");
        }
        tracing::debug!(
            topic = self.session.topic(),
            active = %state.snapshot.active_player(),
            "applied remote snapshot"
        );
        self.updates.send_replace(state.snapshot.clone());
    }
}

/// A running sync engine.
///
/// Cheap to clone. Every clone drives the same engine; call
/// [`shutdown`](Self::shutdown) once when leaving the session.
pub struct SyncHandle<B, C> {
    shared: Arc<Shared<B, C>>,
}

impl<B, C> Clone for SyncHandle<B, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: MessageBus, C: Codec> SyncHandle<B, C> {
    /// Joins the session: subscribes to its topic, claims the local role,
    /// then adopts the retained snapshot or starts a new game.
    ///
    /// # Errors
    /// - [`SyncError::Transport`] if subscribing or the first publish fails
    /// - [`SyncError::Session`] if the role is held by another client
    /// - [`SyncError::Protocol`] if the new game can't be encoded
    pub async fn start(
        bus: B,
        codec: C,
        session: Session,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        let config = config.validated();
        let topic = session.topic().to_string();
        tracing::info!(session_id = %session.id(), %topic, role = %session.role(), "joining session");

        let mut sub = bus
            .subscribe(&topic, SNAPSHOT_QOS, config.inbound_queue)
            .await?;

        let claim = match session.role() {
            Role::Player(player) if config.claims.enforce => Some(
                claim_role(
                    &bus,
                    &codec,
                    &topic,
                    player,
                    session.client_id(),
                    &config.claims,
                )
                .await?,
            ),
            _ => None,
        };

        let mut pending_echoes = VecDeque::new();
        let snapshot = match bootstrap(&mut sub, &codec, &config).await? {
            Some(snapshot) => {
                tracing::info!(
                    %topic,
                    active = %snapshot.active_player(),
                    winner = ?snapshot.winner(),
                    "adopted retained snapshot"
                );
                snapshot
            }
            None => {
                tracing::info!(
                    %topic,
                    timeout_ms = config.bootstrap_timeout.as_millis() as u64,
                    "no retained snapshot, starting a new game"
                );
                let fresh = Snapshot::new();
                let payload = encode_snapshot(&codec, &fresh)?;
                bus.publish(&topic, payload.clone(), true, SNAPSHOT_QOS)
                    .await?;
                pending_echoes.push_back(payload);
                fresh
            }
        };

        let mut state = EngineState {
            snapshot: snapshot.clone(),
            phase: Phase::Bootstrapping,
            claim,
            pending_echoes,
        };
        let target = if snapshot.is_finished() {
            Phase::Terminated
        } else {
            Phase::Active
        };
        state.enter(target, &topic);

        let (updates, _) = watch::channel(snapshot);
        let shared = Arc::new(Shared {
            bus,
            codec,
            session,
            state: Mutex::new(state),
            updates,
            consumer: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let task = tokio::spawn(consume(Arc::clone(&shared), sub));
        *shared.consumer.lock().await = Some(task);

        Ok(Self { shared })
    }

    /// Places a new piece of `size` at `at` for the local player.
    pub async fn place(&self, at: Coord, size: Size) -> Result<Outcome, SyncError> {
        self.act(Action::Place { at, size }).await
    }

    /// Moves the local player's top piece from `from` to `to`.
    pub async fn move_piece(&self, from: Coord, to: Coord) -> Result<Outcome, SyncError> {
        self.act(Action::Move { from, to }).await
    }

    /// Validates and applies a local action, then publishes the result.
    ///
    /// A rejected action changes nothing and publishes nothing. A failed
    /// publish is logged and the local change stands; peers catch up on
    /// the next successful publish.
    async fn act(&self, action: Action) -> Result<Outcome, SyncError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(SyncError::Closed);
        }

        let mut state = self.shared.state.lock().await;
        if !state.phase.is_active() {
            return Err(match state.snapshot.winner() {
                Some(winner) => SyncError::Terminated { winner },
                None => SyncError::Closed,
            });
        }

        let role = self.shared.session.role();
        let outcome = state.snapshot.play(role, action).inspect_err(|e| {
            tracing::debug!(%role, ?action, error = %e, "action rejected");
        })?;

        let topic = self.shared.session.topic();
        match encode_snapshot(&self.shared.codec, &state.snapshot) {
            Ok(payload) => {
                match self
                    .shared
                    .bus
                    .publish(topic, payload.clone(), true, SNAPSHOT_QOS)
                    .await
                {
                    Ok(()) => state.record_publish(payload),
                    Err(e) => tracing::warn!(topic, error = %e, "failed to publish snapshot"),
                }
            }
            Err(e) => tracing::warn!(topic, error = %e, "failed to encode snapshot"),
        }

        state.settle_phase(topic);
        match outcome.winner {
            Some(winner) => tracing::info!(topic, %winner, "game over"),
            None => tracing::debug!(topic, actor = %outcome.actor, next = %outcome.next, "action applied"),
        }
        self.shared.updates.send_replace(state.snapshot.clone());
        Ok(outcome)
    }

    /// Resolves once `player` is the active player or the game is over.
    ///
    /// # Errors
    /// [`SyncError::Closed`] if the handle is shut down while waiting.
    pub async fn wait_for_turn(&self, player: Player) -> Result<TurnStatus, SyncError> {
        let mut rx = self.shared.updates.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if self.shared.closed.load(Ordering::Acquire) {
                    return Err(SyncError::Closed);
                }
                if let Some(winner) = snapshot.winner() {
                    return Ok(TurnStatus::Finished { winner });
                }
                if snapshot.active_player() == player {
                    return Ok(TurnStatus::Yours);
                }
            }
            rx.changed().await.map_err(|_| SyncError::Closed)?;
        }
    }

    /// A copy of the current snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.shared.state.lock().await.snapshot.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.shared.state.lock().await.phase
    }

    /// The winner, once there is one.
    pub async fn outcome(&self) -> Option<Player> {
        self.shared.state.lock().await.snapshot.winner()
    }

    /// Pieces each player can still place, derived from the current board.
    pub async fn budget(&self) -> PlacementBudget {
        self.shared.state.lock().await.snapshot.budget()
    }

    /// A receiver that sees every snapshot the engine settles on.
    pub fn subscribe_updates(&self) -> watch::Receiver<Snapshot> {
        self.shared.updates.subscribe()
    }

    pub fn session(&self) -> &Session {
        &self.shared.session
    }

    /// Stops the consumer task and releases the local role claim.
    ///
    /// Idempotent. Later actions return [`SyncError::Closed`].
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(task) = self.shared.consumer.lock().await.take() {
            task.abort();
        }
        // Wake waiters so they observe the closed flag.
        self.shared.updates.send_modify(|_| {});

        let claim = self.shared.state.lock().await.claim.take();
        if let Some(claim) = claim {
            claim.release(&self.shared.bus).await?;
        }

        tracing::info!(topic = self.shared.session.topic(), "sync engine stopped");
        Ok(())
    }
}

/// Waits up to the bootstrap timeout for a decodable snapshot.
///
/// Returns `None` on timeout. Undecodable deliveries are skipped and the
/// wait continues.
async fn bootstrap<C: Codec>(
    sub: &mut Subscription,
    codec: &C,
    config: &SyncConfig,
) -> Result<Option<Snapshot>, SyncError> {
    let deadline = Instant::now() + config.bootstrap_timeout;
    loop {
        match tokio::time::timeout_at(deadline, sub.recv()).await {
            Ok(Some(msg)) => match decode_snapshot(codec, &msg.payload) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => {
                    tracing::warn!(topic = sub.topic(), error = %e, "ignoring undecodable snapshot during bootstrap");
                }
            },
            Ok(None) => {
                return Err(TransportError::ConnectionClosed(format!(
                    "subscription to {} ended during bootstrap",
                    sub.topic()
                ))
                .into());
            }
            Err(_) => return Ok(None),
        }
    }
}

/// Feeds deliveries into the engine until the subscription ends.
async fn consume<B: MessageBus, C: Codec>(shared: Arc<Shared<B, C>>, mut sub: Subscription) {
    tracing::debug!(topic = sub.topic(), "snapshot consumer started");

    while let Some(msg) = sub.recv().await {
        shared.apply_delivery(&msg.payload).await;
    }

    tracing::debug!(topic = sub.topic(), "snapshot consumer stopped");
}

//! Integration tests for the sync engine over the in-process bus.
//!
//! All tests run on a paused clock, so bootstrap timeouts and claim
//! windows elapse instantly once every task is idle.

use std::time::Duration;

use stackwire_board::{Action, Coord, Player, Role, RuleError, Size, Snapshot};
use stackwire_protocol::{decode_snapshot, encode_snapshot, JsonCodec};
use stackwire_session::{Session, SessionError, SessionId, DEFAULT_NAMESPACE};
use stackwire_sync::{Phase, SyncConfig, SyncError, SyncHandle, TurnStatus};
use stackwire_transport::{MemoryBus, MessageBus, QoS};

const TOPIC: &str = "gobblet/game/12345";

type Handle = SyncHandle<MemoryBus, JsonCodec>;

fn session(role: Role, client_id: &str) -> Session {
    Session::new(SessionId::parse("12345").unwrap(), DEFAULT_NAMESPACE, role)
        .with_client_id(client_id)
}

async fn try_join(bus: &MemoryBus, role: Role, client_id: &str) -> Result<Handle, SyncError> {
    SyncHandle::start(bus.clone(), JsonCodec, session(role, client_id), SyncConfig::default()).await
}

async fn join(bus: &MemoryBus, role: Role, client_id: &str) -> Handle {
    try_join(bus, role, client_id).await.unwrap()
}

fn at(row: usize, col: usize) -> Coord {
    Coord::new(row, col).unwrap()
}

/// Lets spawned tasks drain their queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn publish_raw(bus: &MemoryBus, payload: Vec<u8>) {
    bus.publish(TOPIC, payload, true, QoS::AtLeastOnce).await.unwrap();
}

async fn retained_snapshot(bus: &MemoryBus) -> Snapshot {
    let payload = bus.retained(TOPIC).await.expect("no retained snapshot");
    decode_snapshot(&JsonCodec, &payload).unwrap()
}

fn snapshot_after(actions: &[(Player, Action)]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (player, action) in actions {
        snapshot.play(Role::Player(*player), *action).unwrap();
    }
    snapshot
}

/// Player one completes row 0 while player two plays row 1.
async fn play_until_player_one_wins(a: &Handle, b: &Handle) {
    a.place(at(0, 0), Size::Large).await.unwrap();
    assert_eq!(b.wait_for_turn(Player::Two).await.unwrap(), TurnStatus::Yours);
    b.place(at(1, 0), Size::Large).await.unwrap();
    assert_eq!(a.wait_for_turn(Player::One).await.unwrap(), TurnStatus::Yours);
    a.place(at(0, 1), Size::Large).await.unwrap();
    assert_eq!(b.wait_for_turn(Player::Two).await.unwrap(), TurnStatus::Yours);
    b.place(at(1, 1), Size::Large).await.unwrap();
    assert_eq!(a.wait_for_turn(Player::One).await.unwrap(), TurnStatus::Yours);
    let outcome = a.place(at(0, 2), Size::Medium).await.unwrap();
    assert_eq!(outcome.winner, Some(Player::One));
}

// =========================================================================
// Bootstrap
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_no_retained_publishes_new_game() {
    let bus = MemoryBus::new();

    let a = join(&bus, Role::Player(Player::One), "aaaa").await;

    assert_eq!(a.snapshot().await, Snapshot::new());
    assert_eq!(a.phase().await, Phase::Active);
    assert_eq!(retained_snapshot(&bus).await, Snapshot::new());
}

#[tokio::test(start_paused = true)]
async fn test_start_adopts_retained_snapshot() {
    let bus = MemoryBus::new();
    let existing = snapshot_after(&[(
        Player::One,
        Action::Place { at: at(1, 1), size: Size::Large },
    )]);
    publish_raw(&bus, encode_snapshot(&JsonCodec, &existing).unwrap()).await;

    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    assert_eq!(b.snapshot().await, existing);
    assert_eq!(b.snapshot().await.active_player(), Player::Two);
}

#[tokio::test(start_paused = true)]
async fn test_start_undecodable_retained_starts_fresh() {
    let bus = MemoryBus::new();
    publish_raw(&bus, b"not a snapshot".to_vec()).await;

    let a = join(&bus, Role::Observer, "aaaa").await;

    assert_eq!(a.snapshot().await, Snapshot::new());
    assert_eq!(retained_snapshot(&bus).await, Snapshot::new());
}

#[tokio::test(start_paused = true)]
async fn test_start_finished_game_is_terminated() {
    let bus = MemoryBus::new();
    let finished = Snapshot::from_parts(Snapshot::new().board().clone(), Player::Two, Some(Player::Two));
    publish_raw(&bus, encode_snapshot(&JsonCodec, &finished).unwrap()).await;

    let a = join(&bus, Role::Player(Player::One), "aaaa").await;

    assert_eq!(a.phase().await, Phase::Terminated);
    assert_eq!(a.outcome().await, Some(Player::Two));
    assert!(matches!(
        a.place(at(0, 0), Size::Small).await,
        Err(SyncError::Terminated { winner: Player::Two })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_simultaneous_clients_converge_on_one_new_game() {
    let bus = MemoryBus::new();

    let (a, b) = tokio::join!(
        join(&bus, Role::Player(Player::One), "aaaa"),
        join(&bus, Role::Player(Player::Two), "bbbb"),
    );
    settle().await;

    assert_eq!(a.snapshot().await, Snapshot::new());
    assert_eq!(b.snapshot().await, Snapshot::new());
    assert_eq!(retained_snapshot(&bus).await, Snapshot::new());
}

// =========================================================================
// Replication
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_place_replicates_to_peer() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    let outcome = a.place(at(0, 0), Size::Large).await.unwrap();

    assert_eq!(outcome.next, Player::Two);
    assert_eq!(b.wait_for_turn(Player::Two).await.unwrap(), TurnStatus::Yours);
    assert_eq!(b.snapshot().await, a.snapshot().await);
    assert_eq!(retained_snapshot(&bus).await, a.snapshot().await);
}

#[tokio::test(start_paused = true)]
async fn test_move_piece_replicates_to_peer() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    a.place(at(0, 0), Size::Medium).await.unwrap();
    b.wait_for_turn(Player::Two).await.unwrap();
    b.place(at(2, 2), Size::Small).await.unwrap();
    a.wait_for_turn(Player::One).await.unwrap();
    a.move_piece(at(0, 0), at(2, 2)).await.unwrap();
    b.wait_for_turn(Player::Two).await.unwrap();

    let snapshot = b.snapshot().await;
    assert!(snapshot.board().stack(at(0, 0)).is_empty());
    assert_eq!(snapshot.board().stack(at(2, 2)).len(), 2);
    assert_eq!(snapshot, a.snapshot().await);
}

#[tokio::test(start_paused = true)]
async fn test_own_echo_after_local_move_does_not_roll_back() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let mut updates = a.subscribe_updates();

    // The echo of the new game published at start is still queued.
    a.place(at(0, 0), Size::Large).await.unwrap();
    let after_move = updates.borrow_and_update().clone();
    settle().await;

    assert!(!updates.has_changed().unwrap());
    assert_eq!(a.snapshot().await, after_move);
    assert_eq!(after_move.active_player(), Player::Two);
}

#[tokio::test(start_paused = true)]
async fn test_remote_copy_of_own_publish_still_converges() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;
    a.place(at(2, 2), Size::Small).await.unwrap();
    b.wait_for_turn(Player::Two).await.unwrap();

    // Someone republishes the game as it stood before the move.
    publish_raw(&bus, encode_snapshot(&JsonCodec, &Snapshot::new()).unwrap()).await;
    settle().await;

    assert_eq!(a.snapshot().await, Snapshot::new());
    assert_eq!(b.snapshot().await, Snapshot::new());
}

#[tokio::test(start_paused = true)]
async fn test_remote_duplicate_snapshot_is_idempotent() {
    let bus = MemoryBus::new();
    let observer = join(&bus, Role::Observer, "oooo").await;
    let remote = snapshot_after(&[(
        Player::One,
        Action::Place { at: at(2, 0), size: Size::Small },
    )]);
    let payload = encode_snapshot(&JsonCodec, &remote).unwrap();

    publish_raw(&bus, payload.clone()).await;
    settle().await;
    let once = observer.snapshot().await;
    publish_raw(&bus, payload).await;
    settle().await;

    assert_eq!(once, remote);
    assert_eq!(observer.snapshot().await, once);
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_delivery_dropped_consumer_keeps_running() {
    let bus = MemoryBus::new();
    let observer = join(&bus, Role::Observer, "oooo").await;

    publish_raw(&bus, b"{\"Board\":[]}".to_vec()).await;
    settle().await;
    assert_eq!(observer.snapshot().await, Snapshot::new());

    let remote = snapshot_after(&[(
        Player::One,
        Action::Place { at: at(1, 2), size: Size::Medium },
    )]);
    publish_raw(&bus, encode_snapshot(&JsonCodec, &remote).unwrap()).await;
    settle().await;

    assert_eq!(observer.snapshot().await, remote);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_updates_sees_remote_snapshot() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let observer = join(&bus, Role::Observer, "oooo").await;
    let mut updates = observer.subscribe_updates();

    a.place(at(1, 1), Size::Small).await.unwrap();
    updates.changed().await.unwrap();

    assert_eq!(*updates.borrow(), a.snapshot().await);
}

// =========================================================================
// Turn gating
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_place_out_of_turn_rejected_nothing_published() {
    let bus = MemoryBus::new();
    let _a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    let result = b.place(at(0, 0), Size::Small).await;

    assert!(matches!(
        result,
        Err(SyncError::Rule(RuleError::NotYourTurn { .. }))
    ));
    assert_eq!(b.snapshot().await, Snapshot::new());
    assert_eq!(retained_snapshot(&bus).await, Snapshot::new());
}

#[tokio::test(start_paused = true)]
async fn test_observer_cannot_act() {
    let bus = MemoryBus::new();
    let observer = join(&bus, Role::Observer, "oooo").await;

    let placed = observer.place(at(0, 0), Size::Small).await;
    let moved = observer.move_piece(at(0, 0), at(1, 1)).await;

    assert!(matches!(placed, Err(SyncError::Rule(RuleError::Observer))));
    assert!(matches!(moved, Err(SyncError::Rule(RuleError::Observer))));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_cover_rejected_and_turn_kept() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;
    a.place(at(1, 1), Size::Medium).await.unwrap();
    b.wait_for_turn(Player::Two).await.unwrap();

    let result = b.place(at(1, 1), Size::Small).await;

    assert!(matches!(
        result,
        Err(SyncError::Rule(RuleError::CannotCover { .. }))
    ));
    assert_eq!(b.snapshot().await.active_player(), Player::Two);
    assert!(b.place(at(1, 1), Size::Large).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_turn_wakes_on_remote_move() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    let waiter = tokio::spawn({
        let b = b.clone();
        async move { b.wait_for_turn(Player::Two).await }
    });
    settle().await;
    assert!(!waiter.is_finished());

    a.place(at(2, 2), Size::Small).await.unwrap();

    assert_eq!(waiter.await.unwrap().unwrap(), TurnStatus::Yours);
}

#[tokio::test(start_paused = true)]
async fn test_budget_tracks_placements() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;

    a.place(at(0, 0), Size::Large).await.unwrap();

    let budget = a.budget().await;
    assert_eq!(budget.remaining(Player::One, Size::Large), 2);
    assert_eq!(budget.remaining(Player::Two, Size::Large), 3);
}

// =========================================================================
// Termination
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_local_win_terminates_and_rejects_further_actions() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    play_until_player_one_wins(&a, &b).await;

    assert_eq!(a.phase().await, Phase::Terminated);
    assert_eq!(a.outcome().await, Some(Player::One));
    assert!(matches!(
        a.place(at(2, 2), Size::Small).await,
        Err(SyncError::Terminated { winner: Player::One })
    ));
    assert_eq!(retained_snapshot(&bus).await.winner(), Some(Player::One));
}

#[tokio::test(start_paused = true)]
async fn test_remote_win_terminates_peer() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;

    play_until_player_one_wins(&a, &b).await;

    assert_eq!(
        b.wait_for_turn(Player::Two).await.unwrap(),
        TurnStatus::Finished { winner: Player::One }
    );
    assert_eq!(b.phase().await, Phase::Terminated);
    assert!(matches!(
        b.place(at(2, 2), Size::Small).await,
        Err(SyncError::Terminated { winner: Player::One })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_terminated_engine_ignores_later_snapshots() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let b = join(&bus, Role::Player(Player::Two), "bbbb").await;
    play_until_player_one_wins(&a, &b).await;
    b.wait_for_turn(Player::Two).await.unwrap();

    publish_raw(&bus, encode_snapshot(&JsonCodec, &Snapshot::new()).unwrap()).await;
    settle().await;

    assert_eq!(a.outcome().await, Some(Player::One));
    assert_eq!(b.outcome().await, Some(Player::One));
}

// =========================================================================
// Roles and shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_role_held_by_other_client_fails() {
    let bus = MemoryBus::new();
    let _a = join(&bus, Role::Player(Player::One), "aaaa").await;

    let result = try_join(&bus, Role::Player(Player::One), "bbbb").await;

    assert!(matches!(
        result,
        Err(SyncError::Session(SessionError::RoleTaken { player: Player::One, .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_without_enforcement_allows_shared_role() {
    let bus = MemoryBus::new();
    let mut config = SyncConfig::default();
    config.claims.enforce = false;
    let _a = join(&bus, Role::Player(Player::One), "aaaa").await;

    let result = SyncHandle::start(
        bus.clone(),
        JsonCodec,
        session(Role::Player(Player::One), "bbbb"),
        config,
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_role_and_closes_handle() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;

    a.shutdown().await.unwrap();

    assert_eq!(bus.retained("gobblet/game/12345/roles/1").await, None);
    assert!(matches!(
        a.place(at(0, 0), Size::Small).await,
        Err(SyncError::Closed)
    ));
    assert!(a.shutdown().await.is_ok());
    assert!(try_join(&bus, Role::Player(Player::One), "bbbb").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_wakes_turn_waiters() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    let waiter = tokio::spawn({
        let a = a.clone();
        async move { a.wait_for_turn(Player::Two).await }
    });
    settle().await;

    a.shutdown().await.unwrap();

    assert!(matches!(waiter.await.unwrap(), Err(SyncError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn test_publish_failure_keeps_local_move() {
    let bus = MemoryBus::new();
    let a = join(&bus, Role::Player(Player::One), "aaaa").await;
    bus.shutdown().await;

    let outcome = a.place(at(0, 0), Size::Large).await.unwrap();

    assert_eq!(outcome.next, Player::Two);
    assert_eq!(a.snapshot().await.active_player(), Player::Two);
}

//! Result Reconciliation Engine
//!
//! Assembles one authoritative [`OutcomeRecord`] from data split across an
//! authoritative-but-amnesiac source (the contract zeroes the stake on
//! payout and never saw a reveal on the timeout path) and a best-effort
//! off-chain cache whose writes may lag the announcements that reference
//! them.
//!
//! Three triggers feed the same entry point: the committer's own reveal,
//! a peer's "game concluded" announcement, and a cold page load after
//! conclusion. Reconciliation is idempotent, so all of them can run it
//! repeatedly and converge on the same record.

use std::time::Duration;
use tracing::{debug, warn};

use crate::chain::client::{ChainClient, ChainError};
use crate::chain::snapshot::{read_snapshot, GameSnapshot, SnapshotIntegrity};
use crate::chain::types::Address;
use crate::core::clock::Clock;
use crate::core::commitment::recover_move;
use crate::core::moves::Move;
use crate::game::outcome::{OutcomeRecord, PlayerSide};
use crate::game::role::Role;
use crate::store::record::{MoveRecord, MoveStore, RecordStatus, StoreError};

/// Bounded retry: fixed attempt count, fixed inter-attempt delay.
///
/// Bounded precisely so a viewer whose counterpart's cache write never
/// arrives ends in a terminal error instead of an unbounded suspension.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total lookup attempts before giving up.
    pub max_attempts: u32,
    /// Suspension between attempts (non-blocking).
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// What reconciliation concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// The game has not concluded (or the snapshot was not trustworthy);
    /// keep polling. Never speculate past this.
    Pending,
    /// The authoritative outcome.
    Concluded(OutcomeRecord),
}

/// Terminal reconciliation failures, distinct from [`Reconciliation::Pending`].
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The game concluded but the moves could not be resolved from any
    /// source within the retry budget. Callers surface a degraded
    /// "concluded, moves unknown" state rather than spinning.
    #[error("Game concluded but moves could not be resolved after {attempts} attempts")]
    MovesUnresolved {
        /// Lookup attempts performed.
        attempts: u32,
    },

    /// Off-chain cache failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Contract read failure.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// The reconciliation engine: a clock plus a retry policy.
#[derive(Clone, Debug)]
pub struct Reconciler<K: Clock> {
    clock: K,
    policy: RetryPolicy,
}

impl<K: Clock> Reconciler<K> {
    /// Engine with the default policy (five attempts, one second apart).
    pub fn new(clock: K) -> Reconciler<K> {
        Reconciler {
            clock,
            policy: RetryPolicy::default(),
        }
    }

    /// Engine with an explicit policy.
    pub fn with_policy(clock: K, policy: RetryPolicy) -> Reconciler<K> {
        Reconciler { clock, policy }
    }

    /// Derive the outcome of the game in `snapshot` for `viewer`.
    ///
    /// * Unconcluded or implausible snapshots yield [`Reconciliation::Pending`].
    /// * A cached record marking a timeout produces a timeout outcome with
    ///   the timed-out side's move forced to unknown.
    /// * Otherwise both moves are resolved from, in order: the in-memory
    ///   move (`local_move`), the viewer's cached record (including salt
    ///   recovery against the published commitment), and the on-chain
    ///   opponent move. Cache lookups retry under the policy because the
    ///   counterpart's write may lag.
    /// * Retry exhaustion is the terminal [`ReconcileError::MovesUnresolved`].
    pub async fn reconcile<S: MoveStore>(
        &self,
        snapshot: &GameSnapshot,
        viewer: Option<Address>,
        local_move: Option<Move>,
        store: &S,
    ) -> Result<Reconciliation, ReconcileError> {
        if snapshot.integrity() == SnapshotIntegrity::Impossible {
            warn!(game = %snapshot.game.short(), "implausible snapshot, treating as pending");
            return Ok(Reconciliation::Pending);
        }
        if !snapshot.has_concluded() {
            return Ok(Reconciliation::Pending);
        }

        // Which cached records to consult. Players read their own; a
        // spectator has no record and reads both players' instead (they
        // get the absolute outcome, never a personalized projection).
        let candidates: Vec<(Address, PlayerSide)> = match (Role::of(snapshot, viewer), viewer) {
            (Role::Committer, Some(user)) => vec![(user, PlayerSide::Committer)],
            (Role::Opponent, Some(user)) => vec![(user, PlayerSide::Opponent)],
            _ => vec![
                (snapshot.committer, PlayerSide::Committer),
                (snapshot.opponent, PlayerSide::Opponent),
            ],
        };
        let is_player = Role::of(snapshot, viewer).is_player();

        let mut attempts = 0;
        loop {
            attempts += 1;
            for (user, side) in &candidates {
                let record = store.find(*user, snapshot.game).await?;
                // An in-memory move only ever describes the viewer's own
                // seat.
                let own_move = if is_player { local_move } else { None };

                if let Some(record) = record.as_ref() {
                    if record.concluded_by_timeout() {
                        return Ok(Reconciliation::Concluded(self.build_timeout(record, *side)));
                    }
                }
                if let Some(outcome) =
                    self.build_normal(snapshot, record.as_ref(), own_move, *side)
                {
                    return Ok(Reconciliation::Concluded(outcome));
                }
            }

            if attempts >= self.policy.max_attempts {
                warn!(
                    game = %snapshot.game.short(),
                    attempts,
                    "cache never produced a resolvable record"
                );
                return Err(ReconcileError::MovesUnresolved { attempts });
            }
            debug!(
                game = %snapshot.game.short(),
                attempt = attempts,
                "record not ready yet, retrying"
            );
            self.clock.sleep(self.policy.delay).await;
        }
    }

    /// Trigger-2 path: a peer announced conclusion, but the announcement is
    /// only a hint — the underlying write may not be visible yet. Re-read
    /// the snapshot under the same bounded policy until it shows
    /// conclusion, then reconcile. If the chain never catches up within the
    /// budget, the result is `Pending` and the next poll cycle tries again.
    pub async fn reconcile_after_announcement<C: ChainClient, S: MoveStore>(
        &self,
        client: &C,
        snapshot: &GameSnapshot,
        local_move: Option<Move>,
        store: &S,
    ) -> Result<Reconciliation, ReconcileError> {
        let mut current = *snapshot;
        let mut attempts = 0;
        while !current.has_concluded() {
            attempts += 1;
            if attempts >= self.policy.max_attempts {
                debug!(
                    game = %current.game.short(),
                    "chain still shows the game live after announcement"
                );
                return Ok(Reconciliation::Pending);
            }
            self.clock.sleep(self.policy.delay).await;
            current = read_snapshot(client, current.game).await?;
        }
        self.reconcile(&current, client.signer(), local_move, store).await
    }

    /// Build a timeout outcome from a cached record.
    ///
    /// The loser's move is forced unknown regardless of what the cache
    /// happens to hold: it was never proven against the commitment.
    fn build_timeout(&self, record: &MoveRecord, side: PlayerSide) -> OutcomeRecord {
        let winner = record
            .timeout_winner
            .unwrap_or_else(|| match record.status {
                // Our own record marked Timeout means we are the loser.
                RecordStatus::Timeout => side.other(),
                _ => side,
            });
        let winner_move = if winner == side {
            record.player_choice
        } else {
            record.opponent_choice
        };
        OutcomeRecord::from_timeout(winner, winner_move, record.stake_wei)
    }

    /// Try to resolve both moves for a normal (revealed) conclusion.
    fn build_normal(
        &self,
        snapshot: &GameSnapshot,
        record: Option<&MoveRecord>,
        local_move: Option<Move>,
        side: PlayerSide,
    ) -> Option<OutcomeRecord> {
        let (own, mirrored) = match record {
            Some(r) => (r.player_choice, r.opponent_choice),
            None => (None, None),
        };

        let committer_move = match side {
            PlayerSide::Committer => local_move.or(own).or_else(|| {
                // Recovery path: the move label was lost but the salt
                // survived; brute-force it against the published hash.
                record
                    .and_then(|r| r.salt)
                    .and_then(|salt| recover_move(&salt, &snapshot.commitment_hash))
            }),
            PlayerSide::Opponent => mirrored,
        };
        let opponent_move = match side {
            PlayerSide::Committer => snapshot.opponent_move.or(mirrored),
            PlayerSide::Opponent => own.or(local_move).or(snapshot.opponent_move),
        };

        // Creation-time stake from the cache; the live value is already
        // zero here and would always report zero winnings.
        let stake = record.map(|r| r.stake_wei).unwrap_or(snapshot.stake_wei);

        Some(OutcomeRecord::from_moves(committer_move?, opponent_move?, stake))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use crate::chain::client::RawGame;
    use crate::chain::types::GameId;
    use crate::core::clock::ManualClock;
    use crate::core::commitment::{commit_hash, Salt};
    use crate::game::outcome::{AbsoluteWinner, PerspectiveResult};
    use crate::store::memory::MemoryStore;
    use crate::store::record::RecordUpdate;

    fn committer() -> Address {
        Address::new([1; 20])
    }

    fn opponent() -> Address {
        Address::new([2; 20])
    }

    fn game() -> GameId {
        Address::new([0xAA; 20])
    }

    fn concluded_snapshot(opponent_move_code: u8) -> GameSnapshot {
        GameSnapshot::from_raw(
            game(),
            RawGame {
                committer: committer(),
                opponent: opponent(),
                stake_wei: 0,
                opponent_move_code,
                commitment_hash: [9; 32],
                last_action: 1_700_000_000,
            },
        )
    }

    fn live_snapshot() -> GameSnapshot {
        GameSnapshot::from_raw(
            game(),
            RawGame {
                committer: committer(),
                opponent: opponent(),
                stake_wei: 500,
                opponent_move_code: 0,
                commitment_hash: [9; 32],
                last_action: 1_700_000_000,
            },
        )
    }

    fn reconciler() -> Reconciler<ManualClock> {
        Reconciler::new(ManualClock::starting_at(0))
    }

    /// Store whose record only becomes resolvable after a few lookups,
    /// imitating the counterpart's lagging cache write.
    #[derive(Clone)]
    struct EventuallyReady {
        calls: Arc<AtomicU32>,
        ready_after: u32,
        pending: MoveRecord,
        ready: MoveRecord,
    }

    impl MoveStore for EventuallyReady {
        async fn append(&self, _user: Address, _record: MoveRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn list(&self, _user: Address) -> Result<Vec<MoveRecord>, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.ready_after {
                Ok(vec![self.ready.clone()])
            } else {
                Ok(vec![self.pending.clone()])
            }
        }

        async fn update(
            &self,
            _user: Address,
            _game: GameId,
            _update: RecordUpdate,
        ) -> Result<bool, StoreError> {
            Ok(true)
        }
    }

    fn completed_record_for_opponent() -> MoveRecord {
        let mut record = MoveRecord::pending(game(), 500, Some(committer()));
        record.player_choice = Some(Move::Scissors);
        RecordUpdate {
            status: Some(RecordStatus::Completed),
            result: Some(PerspectiveResult::Loss),
            opponent_choice: Some(Move::Rock),
            ..Default::default()
        }
        .apply(&mut record);
        record
    }

    #[tokio::test]
    async fn test_unconcluded_is_pending() {
        let store = MemoryStore::new();
        let result = reconciler()
            .reconcile(&live_snapshot(), Some(committer()), Some(Move::Rock), &store)
            .await
            .unwrap();
        assert_eq!(result, Reconciliation::Pending);
    }

    #[tokio::test]
    async fn test_impossible_snapshot_is_pending_not_crash() {
        let snap = GameSnapshot::from_raw(
            game(),
            RawGame {
                committer: Address::zero(),
                opponent: opponent(),
                stake_wei: 0,
                opponent_move_code: 3,
                commitment_hash: [9; 32],
                last_action: 0,
            },
        );
        let store = MemoryStore::new();
        let result = reconciler()
            .reconcile(&snap, Some(opponent()), None, &store)
            .await
            .unwrap();
        assert_eq!(result, Reconciliation::Pending);
    }

    #[tokio::test]
    async fn test_committer_cold_load_from_record() {
        let store = MemoryStore::new();
        let mut record = MoveRecord::pending(game(), 500, Some(opponent()));
        record.player_choice = Some(Move::Rock);
        record.status = RecordStatus::Completed;
        store.append(committer(), record).await.unwrap();

        let result = reconciler()
            .reconcile(&concluded_snapshot(3), Some(committer()), None, &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        assert_eq!(outcome.absolute_winner, AbsoluteWinner::CommitterWins);
        assert_eq!(outcome.committer_move, Some(Move::Rock));
        assert_eq!(outcome.opponent_move, Some(Move::Scissors));
        assert_eq!(outcome.stake_at_creation, 500);
        assert!(!outcome.is_timeout);
    }

    #[tokio::test]
    async fn test_opponent_reads_mirrored_move() {
        let store = MemoryStore::new();
        store
            .append(opponent(), completed_record_for_opponent())
            .await
            .unwrap();

        let result = reconciler()
            .reconcile(&concluded_snapshot(3), Some(opponent()), None, &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        assert_eq!(outcome.committer_move, Some(Move::Rock));
        assert_eq!(outcome.opponent_move, Some(Move::Scissors));
        assert_eq!(outcome.project(PlayerSide::Opponent), PerspectiveResult::Loss);
    }

    #[tokio::test]
    async fn test_retry_until_mirror_arrives() {
        let store = EventuallyReady {
            calls: Arc::new(AtomicU32::new(0)),
            ready_after: 3,
            pending: MoveRecord::pending(game(), 500, Some(committer())),
            ready: completed_record_for_opponent(),
        };
        let clock = ManualClock::starting_at(0);
        let engine = Reconciler::new(clock.clone());

        let result = engine
            .reconcile(&concluded_snapshot(3), Some(opponent()), None, &store)
            .await
            .unwrap();

        assert!(matches!(result, Reconciliation::Concluded(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        // Two suspensions of one second each before the third lookup.
        assert_eq!(clock.now_unix(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_is_terminal_error() {
        let pending = MoveRecord::pending(game(), 500, Some(committer()));
        let store = EventuallyReady {
            calls: Arc::new(AtomicU32::new(0)),
            ready_after: u32::MAX,
            pending: pending.clone(),
            ready: pending,
        };
        let engine = Reconciler::new(ManualClock::starting_at(0));

        let err = engine
            .reconcile(&concluded_snapshot(3), Some(opponent()), None, &store)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::MovesUnresolved { attempts: 5 }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_stake_falls_back_to_snapshot_without_record() {
        // Committer with the move in memory but an empty cache: resolvable,
        // but the only stake source left is the (zeroed) snapshot.
        let store = MemoryStore::new();
        let result = reconciler()
            .reconcile(&concluded_snapshot(3), Some(committer()), Some(Move::Rock), &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        assert_eq!(outcome.stake_at_creation, 0);
    }

    #[tokio::test]
    async fn test_timeout_record_forces_loser_move_unknown() {
        // Cold load by the opponent after winning a committer-timeout claim.
        let store = MemoryStore::new();
        let mut record = MoveRecord::pending(game(), 500, Some(committer()));
        record.player_choice = Some(Move::Paper);
        RecordUpdate {
            status: Some(RecordStatus::Completed),
            result: Some(PerspectiveResult::Win),
            timeout_winner: Some(PlayerSide::Opponent),
            ..Default::default()
        }
        .apply(&mut record);
        store.append(opponent(), record).await.unwrap();

        let result = reconciler()
            .reconcile(&concluded_snapshot(2), Some(opponent()), None, &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        assert!(outcome.is_timeout);
        assert_eq!(outcome.timeout_winner, Some(PlayerSide::Opponent));
        // Committer never revealed: move stays unknown even though the
        // chain would let us guess.
        assert_eq!(outcome.committer_move, None);
        assert_eq!(outcome.opponent_move, Some(Move::Paper));
    }

    #[tokio::test]
    async fn test_timed_out_loser_sees_own_loss() {
        // The committer's own record was marked Timeout by the opponent.
        let store = MemoryStore::new();
        let mut record = MoveRecord::pending(game(), 500, Some(opponent()));
        record.player_choice = Some(Move::Rock);
        RecordUpdate {
            status: Some(RecordStatus::Timeout),
            result: Some(PerspectiveResult::Loss),
            timeout_winner: Some(PlayerSide::Opponent),
            ..Default::default()
        }
        .apply(&mut record);
        store.append(committer(), record).await.unwrap();

        let result = reconciler()
            .reconcile(&concluded_snapshot(2), Some(committer()), None, &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        assert!(outcome.is_timeout);
        // The committer's own (unproven) move is forced unknown.
        assert_eq!(outcome.committer_move, None);
        assert_eq!(outcome.project(PlayerSide::Committer), PerspectiveResult::Loss);
    }

    #[tokio::test]
    async fn test_salt_recovery_path() {
        // The committer's record lost the move label but kept the salt.
        let salt = Salt([7; 32]);
        let hash = commit_hash(Move::Spock, &salt);
        let snap = GameSnapshot::from_raw(
            game(),
            RawGame {
                committer: committer(),
                opponent: opponent(),
                stake_wei: 0,
                opponent_move_code: 1,
                commitment_hash: hash,
                last_action: 1_700_000_000,
            },
        );

        let store = MemoryStore::new();
        let mut record = MoveRecord::pending(game(), 500, Some(opponent()));
        record.salt = Some(salt);
        record.status = RecordStatus::Completed;
        store.append(committer(), record).await.unwrap();

        let result = reconciler()
            .reconcile(&snap, Some(committer()), None, &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        // Spock beats Rock.
        assert_eq!(outcome.committer_move, Some(Move::Spock));
        assert_eq!(outcome.absolute_winner, AbsoluteWinner::CommitterWins);
    }

    #[tokio::test]
    async fn test_spectator_resolves_from_player_records() {
        let store = MemoryStore::new();
        store
            .append(opponent(), completed_record_for_opponent())
            .await
            .unwrap();

        // The viewer is neither player; the absolute record still comes
        // out of the players' cached data.
        let result = reconciler()
            .reconcile(&concluded_snapshot(3), None, None, &store)
            .await
            .unwrap();

        let Reconciliation::Concluded(outcome) = result else {
            panic!("expected concluded");
        };
        assert_eq!(outcome.absolute_winner, AbsoluteWinner::CommitterWins);
        assert_eq!(outcome.committer_move, Some(Move::Rock));
    }

    #[tokio::test]
    async fn test_spectator_with_empty_cache_exhausts() {
        let store = MemoryStore::new();
        let err = reconciler()
            .reconcile(&concluded_snapshot(3), None, None, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::MovesUnresolved { attempts: 5 }));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = MemoryStore::new();
        store
            .append(opponent(), completed_record_for_opponent())
            .await
            .unwrap();

        let engine = reconciler();
        let snap = concluded_snapshot(3);
        let first = engine.reconcile(&snap, Some(opponent()), None, &store).await.unwrap();
        let second = engine.reconcile(&snap, Some(opponent()), None, &store).await.unwrap();
        assert_eq!(first, second);
    }
}

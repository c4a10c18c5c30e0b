//! Per-Viewer Session Driver
//!
//! Ties the capability seams together for one viewer: contract handle,
//! off-chain cache, coordination channel, and clock. Every entry point
//! re-reads the snapshot and re-checks its preconditions before submitting
//! anything — the counterpart may have acted since the last view, and the
//! contract would revert anyway; checking first gives a phrasable error
//! instead of a revert string.
//!
//! Cache writes happen after the chain write succeeds, never before: a
//! failed transaction must leave no local trace.

use chrono::Utc;
use tracing::{debug, info};

use crate::chain::client::{ChainClient, ChainError};
use crate::chain::snapshot::{read_snapshot, GameSnapshot};
use crate::chain::types::{Address, GameId, Wei};
use crate::core::clock::Clock;
use crate::core::commitment::{commit_hash, recover_move, Salt};
use crate::core::moves::Move;
use crate::game::outcome::{OutcomeRecord, PerspectiveResult, PlayerSide};
use crate::game::reconcile::{ReconcileError, Reconciler, Reconciliation, RetryPolicy};
use crate::game::role::Role;
use crate::game::timeout::{evaluate_timeout, TimeoutState};
use crate::store::record::{MoveRecord, MoveStore, RecordStatus, RecordUpdate, StoreError};
use crate::sync::coordinator::{Coordinator, GameSync};
use crate::sync::protocol::ActionKind;

/// Everything a display layer needs about one game for one viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameView {
    /// The current contract state.
    pub snapshot: GameSnapshot,
    /// This viewer's seat.
    pub role: Role,
    /// The viewer's own cached record, if they have one.
    pub record: Option<MoveRecord>,
    /// Timeout eligibility for this viewer right now.
    pub timeout: TimeoutState,
}

/// Precondition and plumbing failures from session entry points.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The caller occupies the wrong seat for this action.
    #[error("This action belongs to the {expected:?} seat (you are {actual:?})")]
    WrongSeat {
        /// The seat the action belongs to.
        expected: Role,
        /// The caller's actual seat.
        actual: Role,
    },

    /// Spectators (including viewers with no signer) cannot act.
    #[error("Spectators cannot act on a game")]
    NotAPlayer,

    /// The game has already concluded.
    #[error("Game has already concluded")]
    Concluded,

    /// The second player has already played their move.
    #[error("The second player has already played")]
    AlreadyPlayed,

    /// The second player has not played yet.
    #[error("The second player has not played yet")]
    NotYetPlayed,

    /// The timeout claim is not available in the current state.
    #[error("Timeout claim is not available: {0:?}")]
    TimeoutNotEligible(TimeoutState),

    /// No cached record exists for this game.
    #[error("No saved record for this game")]
    RecordMissing,

    /// The cached record carries no salt, so the commitment cannot be
    /// opened.
    #[error("Commitment salt is not available")]
    SaltMissing,

    /// The stored salt opens none of the five moves against the published
    /// commitment.
    #[error("Stored salt does not match the published commitment")]
    MoveUnrecoverable,

    /// Contract failure.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Cache failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reconciliation failure.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// One viewer's handle on the whole game flow.
pub struct GameSession<C, S, R, K>
where
    C: ChainClient,
    S: MoveStore,
    R: Coordinator,
    K: Clock,
{
    client: C,
    store: S,
    coordinator: R,
    clock: K,
    reconciler: Reconciler<K>,
}

impl<C, S, R, K> GameSession<C, S, R, K>
where
    C: ChainClient,
    S: MoveStore,
    R: Coordinator,
    K: Clock,
{
    /// Session with the default reconciliation policy.
    pub fn new(client: C, store: S, coordinator: R, clock: K) -> GameSession<C, S, R, K> {
        let reconciler = Reconciler::new(clock.clone());
        GameSession {
            client,
            store,
            coordinator,
            clock,
            reconciler,
        }
    }

    /// Session with an explicit reconciliation retry policy.
    pub fn with_retry_policy(
        client: C,
        store: S,
        coordinator: R,
        clock: K,
        policy: RetryPolicy,
    ) -> GameSession<C, S, R, K> {
        let reconciler = Reconciler::with_policy(clock.clone(), policy);
        GameSession {
            client,
            store,
            coordinator,
            clock,
            reconciler,
        }
    }

    /// The signer identity this session acts as, if any.
    pub fn identity(&self) -> Option<Address> {
        self.client.signer()
    }

    /// Fresh view of one game for this viewer. Works for spectators too.
    pub async fn view(&self, game: GameId) -> Result<GameView, SessionError> {
        let snapshot = read_snapshot(&self.client, game).await?;
        let role = Role::of(&snapshot, self.client.signer());
        let record = match self.client.signer() {
            Some(signer) if role.is_player() => self.store.find(signer, game).await?,
            _ => None,
        };
        let timeout = evaluate_timeout(&snapshot, role, self.clock.now_unix());
        Ok(GameView {
            snapshot,
            role,
            record,
            timeout,
        })
    }

    /// Create a game: draw a fresh salt, publish the commitment with the
    /// stake, and cache the salt and move locally. The salt never leaves
    /// this process until reveal.
    pub async fn create_game(
        &self,
        opponent: Address,
        stake_wei: Wei,
        mv: Move,
    ) -> Result<GameId, SessionError> {
        let signer = self.client.signer().ok_or(SessionError::NotAPlayer)?;

        let salt = Salt::generate();
        let commitment = commit_hash(mv, &salt);
        let game = self.client.create_game(commitment, opponent, stake_wei).await?;

        let mut record = MoveRecord::pending(game, stake_wei, Some(opponent));
        record.salt = Some(salt);
        record.player_choice = Some(mv);
        self.store.append(signer, record).await?;

        info!(game = %game.short(), stake_wei, "game created");
        Ok(game)
    }

    /// Join as the second player: stake the matching amount and play `mv`
    /// openly. Joining and playing are one contract call.
    pub async fn join_with_move(&self, game: GameId, mv: Move) -> Result<(), SessionError> {
        let signer = self.client.signer().ok_or(SessionError::NotAPlayer)?;
        let snapshot = read_snapshot(&self.client, game).await?;

        let role = Role::of(&snapshot, Some(signer));
        if role != Role::Opponent {
            return Err(SessionError::WrongSeat {
                expected: Role::Opponent,
                actual: role,
            });
        }
        if snapshot.has_concluded() {
            return Err(SessionError::Concluded);
        }
        if snapshot.has_opponent_acted() {
            return Err(SessionError::AlreadyPlayed);
        }

        self.client.play(game, mv, snapshot.stake_wei).await?;

        let mut record = MoveRecord::pending(game, snapshot.stake_wei, Some(snapshot.committer));
        record.player_choice = Some(mv);
        self.store.append(signer, record).await?;

        self.coordinator.announce(game, signer, ActionKind::GameJoined).await;
        self.coordinator.announce(game, signer, ActionKind::MoveMade).await;
        info!(game = %game.short(), mv = %mv, "joined game");
        Ok(())
    }

    /// Open the commitment and settle the game. The move comes from the
    /// cached record, or failing that from salt recovery against the
    /// published commitment. On success, writes the outcome to the
    /// caller's record and mirrors it into the opponent's.
    pub async fn reveal(&self, game: GameId) -> Result<OutcomeRecord, SessionError> {
        let signer = self.client.signer().ok_or(SessionError::NotAPlayer)?;
        let snapshot = read_snapshot(&self.client, game).await?;

        let role = Role::of(&snapshot, Some(signer));
        if role != Role::Committer {
            return Err(SessionError::WrongSeat {
                expected: Role::Committer,
                actual: role,
            });
        }
        if snapshot.has_concluded() {
            return Err(SessionError::Concluded);
        }
        let opponent_move = snapshot.opponent_move.ok_or(SessionError::NotYetPlayed)?;

        let record = self
            .store
            .find(signer, game)
            .await?
            .ok_or(SessionError::RecordMissing)?;
        let salt = record.salt.ok_or(SessionError::SaltMissing)?;
        let mv = record
            .player_choice
            .or_else(|| recover_move(&salt, &snapshot.commitment_hash))
            .ok_or(SessionError::MoveUnrecoverable)?;

        self.client.reveal(game, mv, salt).await?;

        let outcome = OutcomeRecord::from_moves(mv, opponent_move, record.stake_wei);
        let concluded_at = Utc::now();
        self.store
            .update(
                signer,
                game,
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    result: Some(outcome.project(PlayerSide::Committer)),
                    player_choice: Some(mv),
                    opponent_choice: Some(opponent_move),
                    completed_at: Some(concluded_at),
                    ..Default::default()
                },
            )
            .await?;

        // Mirror into the opponent's record so their reconciliation can
        // learn the revealed move from the cache.
        let mirrored = self
            .store
            .update(
                snapshot.opponent,
                game,
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    result: Some(outcome.project(PlayerSide::Opponent)),
                    opponent_choice: Some(mv),
                    completed_at: Some(concluded_at),
                    ..Default::default()
                },
            )
            .await?;
        if !mirrored {
            debug!(game = %game.short(), "opponent has no record, mirror skipped");
        }

        self.coordinator.announce(game, signer, ActionKind::MoveRevealed).await;
        info!(game = %game.short(), mv = %mv, winner = ?outcome.absolute_winner, "revealed");
        Ok(outcome)
    }

    /// Claim the timeout against a silent counterpart. Eligibility is
    /// re-checked against a fresh snapshot first; the claim routes to the
    /// contract entry point matching the caller's seat.
    pub async fn claim_timeout(&self, game: GameId) -> Result<OutcomeRecord, SessionError> {
        let signer = self.client.signer().ok_or(SessionError::NotAPlayer)?;
        let snapshot = read_snapshot(&self.client, game).await?;

        let side = match Role::of(&snapshot, Some(signer)) {
            Role::Committer => PlayerSide::Committer,
            Role::Opponent => PlayerSide::Opponent,
            Role::Spectator => return Err(SessionError::NotAPlayer),
        };
        let role = match side {
            PlayerSide::Committer => Role::Committer,
            PlayerSide::Opponent => Role::Opponent,
        };

        let state = evaluate_timeout(&snapshot, role, self.clock.now_unix());
        if state != TimeoutState::Eligible {
            return Err(SessionError::TimeoutNotEligible(state));
        }

        match side {
            PlayerSide::Committer => self.client.opponent_timeout(game).await?,
            PlayerSide::Opponent => self.client.committer_timeout(game).await?,
        }

        let record = self.store.find(signer, game).await?;
        let stake = record
            .as_ref()
            .map(|r| r.stake_wei)
            .unwrap_or(snapshot.stake_wei);
        let my_move = match side {
            PlayerSide::Committer => record.as_ref().and_then(|r| r.player_choice),
            PlayerSide::Opponent => record
                .as_ref()
                .and_then(|r| r.player_choice)
                .or(snapshot.opponent_move),
        };
        let outcome = OutcomeRecord::from_timeout(side, my_move, stake);
        let concluded_at = Utc::now();

        self.store
            .update(
                signer,
                game,
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    result: Some(PerspectiveResult::Win),
                    timeout_winner: Some(side),
                    completed_at: Some(concluded_at),
                    ..Default::default()
                },
            )
            .await?;

        // Mark the loser's record if they have one; a counterpart who
        // never joined has nothing to mark.
        let counterpart = match side {
            PlayerSide::Committer => snapshot.opponent,
            PlayerSide::Opponent => snapshot.committer,
        };
        let marked = self
            .store
            .update(
                counterpart,
                game,
                RecordUpdate {
                    status: Some(RecordStatus::Timeout),
                    result: Some(PerspectiveResult::Loss),
                    timeout_winner: Some(side),
                    completed_at: Some(concluded_at),
                    ..Default::default()
                },
            )
            .await?;
        if !marked {
            debug!(game = %game.short(), "counterpart has no record to mark");
        }

        self.coordinator.announce(game, signer, ActionKind::Timeout).await;
        info!(game = %game.short(), winner = ?side, "timeout claimed");
        Ok(outcome)
    }

    /// Derive the outcome of a (possibly concluded) game for this viewer.
    pub async fn resolve(&self, game: GameId) -> Result<Reconciliation, SessionError> {
        let snapshot = read_snapshot(&self.client, game).await?;
        Ok(self
            .reconciler
            .reconcile(&snapshot, self.client.signer(), None, &self.store)
            .await?)
    }

    /// React to a peer announcement: re-read until the chain shows the
    /// conclusion the announcement hinted at, then reconcile.
    pub async fn resolve_after_signal(&self, game: GameId) -> Result<Reconciliation, SessionError> {
        let snapshot = read_snapshot(&self.client, game).await?;
        Ok(self
            .reconciler
            .reconcile_after_announcement(&self.client, &snapshot, None, &self.store)
            .await?)
    }

    /// Subscribe to the game's announcement channel, filtered for this
    /// viewer.
    pub async fn subscribe(&self, game: GameId) -> GameSync<K> {
        GameSync::new(
            self.coordinator.subscribe(game).await,
            self.client.signer(),
            self.clock.clone(),
        )
    }
}

//! Game State Snapshot
//!
//! A point-in-time read of all contract-resident facts about one game, plus
//! the boolean facts everything downstream derives from them. Snapshots are
//! immutable values: refresh cycles produce new snapshots rather than
//! mutating shared state.
//!
//! The fetch is identity-agnostic — a spectator gets the same snapshot as a
//! player. Identity only matters for derived "is this me" questions, which
//! live in [`crate::game::role`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::client::{ChainClient, ChainError, RawGame};
use crate::chain::types::{Address, GameId, Wei};
use crate::core::commitment::CommitmentHash;
use crate::core::moves::Move;

/// Point-in-time contract state for one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Which game this snapshot describes.
    pub game: GameId,
    /// The committing player (J1).
    pub committer: Address,
    /// The second player (J2).
    pub opponent: Address,
    /// Remaining stake; zero if and only if the game has concluded.
    pub stake_wei: Wei,
    /// Opponent's openly-played move, if any. The contract keeps this
    /// visible after conclusion on the reveal path.
    pub opponent_move: Option<Move>,
    /// The committer's published commitment hash; immutable for the life
    /// of the game.
    pub commitment_hash: CommitmentHash,
    /// Unix timestamp of the last state-changing contract call.
    /// Monotonically non-decreasing over a game's lifetime; zero only on
    /// an empty read.
    pub last_action: u64,
}

/// Outcome of the defensive consistency check on a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotIntegrity {
    /// The field combination is plausible.
    Plausible,
    /// The fields cannot all belong to the same chain state (torn read or
    /// an empty read of a nonexistent game). Treat as pending, never crash.
    Impossible,
}

impl GameSnapshot {
    /// Interpret a raw contract read. An out-of-range move code is treated
    /// as "not played" and logged rather than crashing the pipeline.
    pub fn from_raw(game: GameId, raw: RawGame) -> GameSnapshot {
        let opponent_move = Move::from_code(raw.opponent_move_code);
        if opponent_move.is_none() && raw.opponent_move_code != 0 {
            warn!(
                game = %game.short(),
                code = raw.opponent_move_code,
                "contract returned an out-of-range move code"
            );
        }

        GameSnapshot {
            game,
            committer: raw.committer,
            opponent: raw.opponent,
            stake_wei: raw.stake_wei,
            opponent_move,
            commitment_hash: raw.commitment_hash,
            last_action: raw.last_action,
        }
    }

    /// Has the opponent played their move yet?
    #[inline]
    pub fn has_opponent_acted(&self) -> bool {
        self.opponent_move.is_some()
    }

    /// Has the game concluded (payout issued, stake zeroed)?
    #[inline]
    pub fn has_concluded(&self) -> bool {
        self.stake_wei == 0
    }

    /// Seconds since the last state-changing call, or `None` when
    /// `last_action` is the zero sentinel. The guard matters: elapsed-time
    /// arithmetic against zero would make every timeout look eligible.
    pub fn elapsed_since(&self, now_unix: u64) -> Option<u64> {
        if self.last_action == 0 {
            None
        } else {
            Some(now_unix.saturating_sub(self.last_action))
        }
    }

    /// Defensive check for field combinations no single chain state can
    /// produce. Consumers treat `Impossible` as pending and re-read later.
    pub fn integrity(&self) -> SnapshotIntegrity {
        // An existing game always has both participants and a commitment.
        if self.committer.is_zero() || self.opponent.is_zero() {
            return SnapshotIntegrity::Impossible;
        }
        if self.commitment_hash == [0u8; 32] && self.stake_wei != 0 {
            return SnapshotIntegrity::Impossible;
        }
        // Every path to conclusion is a state-changing call, so a concluded
        // game cannot carry the zero timestamp.
        if self.has_concluded() && self.last_action == 0 {
            return SnapshotIntegrity::Impossible;
        }
        SnapshotIntegrity::Plausible
    }
}

/// Read a fresh snapshot for `game`.
///
/// Side-effect free from the caller's point of view; works identically with
/// or without a local signer.
pub async fn read_snapshot<C: ChainClient>(
    client: &C,
    game: GameId,
) -> Result<GameSnapshot, ChainError> {
    let raw = client.read_game(game).await?;
    Ok(GameSnapshot::from_raw(game, raw))
}

//! Move Records and the Cache Interface
//!
//! Each player owns one record per game in an off-chain key-value store
//! with list-append semantics. The committer's record carries the salt; the
//! opponent's record never does. On reveal, the committer also mirrors the
//! opponent's view into the opponent's record — that mirror is the
//! side-channel the opponent reads the committer's move from.
//!
//! Concurrent updates from the two roles touch disjoint logical fields, so
//! the merge policy is last-write-wins per field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chain::types::{Address, GameId, Wei};
use crate::core::commitment::Salt;
use crate::core::moves::Move;
use crate::game::outcome::{PerspectiveResult, PlayerSide};

/// Lifecycle state of a move record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Created at game creation/join; game still in progress.
    Pending,
    /// Both moves known and a judged result recorded.
    Completed,
    /// The owning player's counterpart successfully claimed a timeout
    /// against them.
    Timeout,
}

/// One player's cached view of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Store-level record id.
    pub id: Uuid,
    /// The game this record belongs to.
    pub game: GameId,
    /// Stake captured at creation time. The authoritative source for
    /// winnings display: the on-chain stake is already zero post-payout.
    pub stake_wei: Wei,
    /// Lifecycle state.
    pub status: RecordStatus,
    /// Commitment salt; present only on the committer's own record and
    /// secret until reveal.
    pub salt: Option<Salt>,
    /// Final result from this record owner's perspective.
    pub result: Option<PerspectiveResult>,
    /// The counterpart's address.
    pub opponent: Option<Address>,
    /// The owner's own move.
    pub player_choice: Option<Move>,
    /// The counterpart's move, mirrored in by whichever side learned it
    /// first (read-only from the owner's perspective).
    pub opponent_choice: Option<Move>,
    /// Set when the game concluded by timeout: which side won it.
    pub timeout_winner: Option<PlayerSide>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the game concluded, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl MoveRecord {
    /// Fresh pending record for a game entered at `stake_wei`.
    pub fn pending(game: GameId, stake_wei: Wei, opponent: Option<Address>) -> MoveRecord {
        MoveRecord {
            id: Uuid::new_v4(),
            game,
            stake_wei,
            status: RecordStatus::Pending,
            salt: None,
            result: None,
            opponent,
            player_choice: None,
            opponent_choice: None,
            timeout_winner: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Did this game conclude by timeout, from this record's point of view?
    ///
    /// True both for the timed-out loser (`status == Timeout`) and for the
    /// winner, whose record stays `Completed` but carries `timeout_winner`.
    pub fn concluded_by_timeout(&self) -> bool {
        self.status == RecordStatus::Timeout || self.timeout_winner.is_some()
    }
}

/// Partial update applied to an existing record.
///
/// `None` fields are left untouched; set fields overwrite (last-write-wins
/// per field).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    /// New lifecycle state.
    pub status: Option<RecordStatus>,
    /// Result from the record owner's perspective.
    pub result: Option<PerspectiveResult>,
    /// Owner's move.
    pub player_choice: Option<Move>,
    /// Counterpart's move.
    pub opponent_choice: Option<Move>,
    /// Timeout winner marker.
    pub timeout_winner: Option<PlayerSide>,
    /// Conclusion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Commitment salt (recovery writes only).
    pub salt: Option<Salt>,
}

impl RecordUpdate {
    /// Apply this update to a record, field by field.
    pub fn apply(&self, record: &mut MoveRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(result) = self.result {
            record.result = Some(result);
        }
        if let Some(mv) = self.player_choice {
            record.player_choice = Some(mv);
        }
        if let Some(mv) = self.opponent_choice {
            record.opponent_choice = Some(mv);
        }
        if let Some(side) = self.timeout_winner {
            record.timeout_winner = Some(side);
        }
        if let Some(at) = self.completed_at {
            record.completed_at = Some(at);
        }
        if let Some(salt) = self.salt {
            record.salt = Some(salt);
        }
    }
}

/// Store-level failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing store failed (connection, serialization, quota).
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// The off-chain cache interface: per-user append/list/update.
///
/// Lookup by game is a linear scan over the user's list — implementations
/// are not required to index, and callers must not assume they do.
#[allow(async_fn_in_trait)]
pub trait MoveStore: Send + Sync {
    /// Append a record to the user's list.
    async fn append(&self, user: Address, record: MoveRecord) -> Result<(), StoreError>;

    /// All of the user's records, oldest first.
    async fn list(&self, user: Address) -> Result<Vec<MoveRecord>, StoreError>;

    /// Update the user's record for `game`. Returns whether a record was
    /// found.
    async fn update(
        &self,
        user: Address,
        game: GameId,
        update: RecordUpdate,
    ) -> Result<bool, StoreError>;

    /// The user's record for `game`, if any (linear scan).
    async fn find(&self, user: Address, game: GameId) -> Result<Option<MoveRecord>, StoreError> {
        Ok(self.list(user).await?.into_iter().find(|r| r.game == game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameId {
        Address::new([0xAA; 20])
    }

    #[test]
    fn test_pending_record_shape() {
        let record = MoveRecord::pending(game(), 500, Some(Address::new([2; 20])));
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.stake_wei, 500);
        assert!(record.salt.is_none());
        assert!(record.completed_at.is_none());
        assert!(!record.concluded_by_timeout());
    }

    #[test]
    fn test_update_merges_per_field() {
        let mut record = MoveRecord::pending(game(), 500, None);
        record.player_choice = Some(Move::Rock);

        let update = RecordUpdate {
            status: Some(RecordStatus::Completed),
            result: Some(PerspectiveResult::Win),
            opponent_choice: Some(Move::Scissors),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        update.apply(&mut record);

        // Untouched fields survive; set fields overwrite.
        assert_eq!(record.player_choice, Some(Move::Rock));
        assert_eq!(record.status, RecordStatus::Completed);
        assert_eq!(record.result, Some(PerspectiveResult::Win));
        assert_eq!(record.opponent_choice, Some(Move::Scissors));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_timeout_detection_both_sides() {
        let mut loser = MoveRecord::pending(game(), 500, None);
        RecordUpdate {
            status: Some(RecordStatus::Timeout),
            result: Some(PerspectiveResult::Loss),
            timeout_winner: Some(PlayerSide::Committer),
            ..Default::default()
        }
        .apply(&mut loser);
        assert!(loser.concluded_by_timeout());

        let mut winner = MoveRecord::pending(game(), 500, None);
        RecordUpdate {
            status: Some(RecordStatus::Completed),
            result: Some(PerspectiveResult::Win),
            timeout_winner: Some(PlayerSide::Committer),
            ..Default::default()
        }
        .apply(&mut winner);
        assert!(winner.concluded_by_timeout());
        assert_eq!(winner.status, RecordStatus::Completed);
    }

    #[test]
    fn test_record_serde_round_trip() {
        let mut record = MoveRecord::pending(game(), 500, Some(Address::new([2; 20])));
        record.salt = Some(Salt([5; 32]));
        record.player_choice = Some(Move::Spock);

        let json = serde_json::to_string(&record).unwrap();
        let back: MoveRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}

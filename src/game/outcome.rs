//! Outcome Records and Perspective Projection
//!
//! One perspective-independent record per concluded game, produced by the
//! reconciliation engine and projected into each player's win/loss/tie
//! framing at the edge. Spectators consume the absolute record directly.

use serde::{Deserialize, Serialize};

use crate::chain::types::Wei;
use crate::core::moves::{judge, Move, RoundOutcome};

/// One of the two player seats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSide {
    /// The committing player (J1).
    Committer,
    /// The second player (J2).
    Opponent,
}

impl PlayerSide {
    /// The other seat.
    pub fn other(self) -> PlayerSide {
        match self {
            PlayerSide::Committer => PlayerSide::Opponent,
            PlayerSide::Opponent => PlayerSide::Committer,
        }
    }
}

/// Perspective-independent winner of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsoluteWinner {
    /// The committer won.
    CommitterWins,
    /// The opponent won.
    OpponentWins,
    /// Equal moves.
    Tie,
}

/// A game's result from one player's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerspectiveResult {
    /// This player won the pot.
    Win,
    /// This player lost their stake.
    Loss,
    /// Stakes returned.
    Tie,
}

/// The authoritative record of one concluded game.
///
/// `absolute_winner` and `timeout_winner` are populated independently:
/// projection reads only `timeout_winner` when `is_timeout` is set and only
/// `absolute_winner` otherwise. They are never cross-checked against each
/// other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Who won, independent of any viewer.
    pub absolute_winner: AbsoluteWinner,
    /// The committer's move, or `None` when it was never proven on-chain.
    pub committer_move: Option<Move>,
    /// The opponent's move, or `None` when they never played.
    pub opponent_move: Option<Move>,
    /// Stake captured at creation time (the on-chain value is zero by the
    /// time this record exists).
    pub stake_at_creation: Wei,
    /// Did the game conclude by timeout claim rather than reveal?
    pub is_timeout: bool,
    /// Present exactly when `is_timeout` is true.
    pub timeout_winner: Option<PlayerSide>,
}

impl OutcomeRecord {
    /// Build a normal (revealed) outcome from both moves.
    pub fn from_moves(
        committer_move: Move,
        opponent_move: Move,
        stake_at_creation: Wei,
    ) -> OutcomeRecord {
        let absolute_winner = match judge(committer_move, opponent_move) {
            RoundOutcome::FirstWins => AbsoluteWinner::CommitterWins,
            RoundOutcome::SecondWins => AbsoluteWinner::OpponentWins,
            RoundOutcome::Tie => AbsoluteWinner::Tie,
        };
        OutcomeRecord {
            absolute_winner,
            committer_move: Some(committer_move),
            opponent_move: Some(opponent_move),
            stake_at_creation,
            is_timeout: false,
            timeout_winner: None,
        }
    }

    /// Build a timeout outcome. The timed-out side's move is forced to
    /// unknown no matter what the caller knows: a move that was never
    /// proven against the commitment forfeits the right to be displayed.
    pub fn from_timeout(
        winner: PlayerSide,
        winner_move: Option<Move>,
        stake_at_creation: Wei,
    ) -> OutcomeRecord {
        let (committer_move, opponent_move) = match winner {
            PlayerSide::Committer => (winner_move, None),
            PlayerSide::Opponent => (None, winner_move),
        };
        OutcomeRecord {
            absolute_winner: match winner {
                PlayerSide::Committer => AbsoluteWinner::CommitterWins,
                PlayerSide::Opponent => AbsoluteWinner::OpponentWins,
            },
            committer_move,
            opponent_move,
            stake_at_creation,
            is_timeout: true,
            timeout_winner: Some(winner),
        }
    }

    /// Project this record into one player's win/loss/tie framing.
    ///
    /// Timeout outcomes route through `timeout_winner` alone; a timeout
    /// record with the winner field missing projects as a loss for no one
    /// and a win for no one — callers building records through the
    /// constructors never produce that shape.
    pub fn project(&self, side: PlayerSide) -> PerspectiveResult {
        if self.is_timeout {
            return match self.timeout_winner {
                Some(winner) if winner == side => PerspectiveResult::Win,
                Some(_) => PerspectiveResult::Loss,
                None => PerspectiveResult::Tie,
            };
        }
        match self.absolute_winner {
            AbsoluteWinner::Tie => PerspectiveResult::Tie,
            AbsoluteWinner::CommitterWins if side == PlayerSide::Committer => {
                PerspectiveResult::Win
            }
            AbsoluteWinner::OpponentWins if side == PlayerSide::Opponent => PerspectiveResult::Win,
            _ => PerspectiveResult::Loss,
        }
    }
}

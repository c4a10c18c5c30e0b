//! Move Codes and the RPSLS Judge
//!
//! The contract encodes moves as `uint8` values 1..=5; `0` is the "not yet
//! played" sentinel and never a move. The judge replicates the contract's
//! `win` function exactly so outcomes can be derived without a chain call.

use serde::{Deserialize, Serialize};

/// One of the five playable moves.
///
/// Discriminants match the contract's move codes. Code `0` (no move) is
/// unrepresentable; use `Option<Move>` where absence is possible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Move {
    /// Rock beats Scissors and Lizard.
    Rock = 1,
    /// Paper beats Rock and Spock.
    Paper = 2,
    /// Scissors beats Paper and Lizard.
    Scissors = 3,
    /// Lizard beats Spock and Paper.
    Lizard = 4,
    /// Spock beats Scissors and Rock.
    Spock = 5,
}

/// All five moves in contract-code order.
pub const ALL_MOVES: [Move; 5] = [
    Move::Rock,
    Move::Paper,
    Move::Scissors,
    Move::Lizard,
    Move::Spock,
];

/// What each move beats, indexed by `code - 1`.
///
/// Table-driven on purpose: the rule set must be symmetric under argument
/// order, which ad hoc comparison chains tend to break.
const BEATS: [[u8; 2]; 5] = [
    [3, 4], // Rock beats Scissors, Lizard
    [1, 5], // Paper beats Rock, Spock
    [2, 4], // Scissors beats Paper, Lizard
    [5, 2], // Lizard beats Spock, Paper
    [3, 1], // Spock beats Scissors, Rock
];

impl Move {
    /// Contract move code (1..=5).
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parse a contract move code. `0` and anything above 5 yield `None`.
    pub const fn from_code(code: u8) -> Option<Move> {
        match code {
            1 => Some(Move::Rock),
            2 => Some(Move::Paper),
            3 => Some(Move::Scissors),
            4 => Some(Move::Lizard),
            5 => Some(Move::Spock),
            _ => None,
        }
    }

    /// Parse a display label ("Rock", "Paper", ...).
    pub fn from_label(label: &str) -> Option<Move> {
        match label {
            "Rock" => Some(Move::Rock),
            "Paper" => Some(Move::Paper),
            "Scissors" => Some(Move::Scissors),
            "Lizard" => Some(Move::Lizard),
            "Spock" => Some(Move::Spock),
            _ => None,
        }
    }

    /// Display label.
    pub const fn label(self) -> &'static str {
        match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
            Move::Lizard => "Lizard",
            Move::Spock => "Spock",
        }
    }

    /// Does this move beat `other`?
    #[inline]
    pub fn beats(self, other: Move) -> bool {
        let row = BEATS[(self.code() - 1) as usize];
        row[0] == other.code() || row[1] == other.code()
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of judging one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// The first argument's move wins.
    FirstWins,
    /// The second argument's move wins.
    SecondWins,
    /// Equal moves.
    Tie,
}

/// Judge a round of RPSLS. Pure and total over the 5x5 move domain.
///
/// Mirrors the contract's `win(a, b)` accessor: `judge(a, b) == FirstWins`
/// exactly when `win(a, b)` is true on-chain.
pub fn judge(a: Move, b: Move) -> RoundOutcome {
    if a == b {
        RoundOutcome::Tie
    } else if a.beats(b) {
        RoundOutcome::FirstWins
    } else {
        RoundOutcome::SecondWins
    }
}

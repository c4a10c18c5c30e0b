//! Announcement Wire Types
//!
//! The broadcast channel carries only "something happened, re-read the
//! contract" signals. No outcome data travels this path, and delivery is
//! best-effort at most.

use serde::{Deserialize, Serialize};

use crate::chain::types::{Address, GameId};

/// The kind of action a player just performed on-chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A player submitted a move.
    MoveMade,
    /// The second player joined the game.
    GameJoined,
    /// The committer revealed; the game is decided.
    MoveRevealed,
    /// A timeout claim went through; the game is decided.
    Timeout,
}

impl ActionKind {
    /// Does this action conclude the game?
    pub fn ends_game(self) -> bool {
        matches!(self, ActionKind::MoveRevealed | ActionKind::Timeout)
    }
}

/// One action announcement on a game's channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Which game the action belongs to.
    pub game: GameId,
    /// Who performed the action. Receivers drop their own echoes.
    pub actor: Address,
    /// What happened.
    pub action: ActionKind,
    /// Sender-local unix timestamp; informational only, no ordering
    /// guarantee relative to chain visibility.
    pub timestamp: u64,
}

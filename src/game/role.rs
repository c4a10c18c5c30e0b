//! Viewer Roles
//!
//! Which seat the local identity occupies in a game. "No wallet connected"
//! and "connected but neither player" are deliberately the same role:
//! spectators get identical read behavior either way.

use serde::{Deserialize, Serialize};

use crate::chain::snapshot::GameSnapshot;
use crate::chain::types::Address;

/// The local viewer's relationship to one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The player who created the game and holds the commitment (J1).
    Committer,
    /// The second player (J2).
    Opponent,
    /// Anyone else, including viewers with no identity at all.
    Spectator,
}

impl Role {
    /// Derive the role of `identity` for the game in `snapshot`.
    pub fn of(snapshot: &GameSnapshot, identity: Option<Address>) -> Role {
        match identity {
            Some(addr) if addr == snapshot.committer => Role::Committer,
            Some(addr) if addr == snapshot.opponent => Role::Opponent,
            _ => Role::Spectator,
        }
    }

    /// Is this viewer one of the two players?
    pub fn is_player(self) -> bool {
        !matches!(self, Role::Spectator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::RawGame;

    fn snapshot() -> GameSnapshot {
        GameSnapshot::from_raw(
            Address::new([0xAA; 20]),
            RawGame {
                committer: Address::new([1; 20]),
                opponent: Address::new([2; 20]),
                stake_wei: 100,
                opponent_move_code: 0,
                commitment_hash: [9; 32],
                last_action: 1_700_000_000,
            },
        )
    }

    #[test]
    fn test_role_derivation() {
        let snap = snapshot();
        assert_eq!(Role::of(&snap, Some(Address::new([1; 20]))), Role::Committer);
        assert_eq!(Role::of(&snap, Some(Address::new([2; 20]))), Role::Opponent);
        assert_eq!(Role::of(&snap, Some(Address::new([3; 20]))), Role::Spectator);
        // No wallet at all collapses into the same role.
        assert_eq!(Role::of(&snap, None), Role::Spectator);
    }

    #[test]
    fn test_is_player() {
        assert!(Role::Committer.is_player());
        assert!(Role::Opponent.is_player());
        assert!(!Role::Spectator.is_player());
    }
}

//! Timeout Eligibility Evaluator
//!
//! Pure state machine deciding whether the local viewer may claim a timeout
//! right now. Recomputed at least once per second while displayed (it backs
//! a live countdown), so evaluation is idempotent and side-effect free.
//!
//! The claim directions are asymmetric: the committer claims while the
//! opponent has *not* played; the opponent claims once they *have* played
//! and the committer stalls on the reveal. The safety buffer keeps a claim
//! from reaching the contract before block time agrees the window elapsed,
//! which would revert.

use serde::{Deserialize, Serialize};

use crate::chain::snapshot::GameSnapshot;
use crate::game::role::Role;
use crate::{TIMEOUT_SAFETY_BUFFER_SECS, TIMEOUT_WINDOW_SECS};

/// Timeout eligibility from one viewer's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutState {
    /// No timeout claim exists for this viewer in this game state
    /// (spectator, concluded game, wrong phase, or no action recorded yet).
    NotApplicable,
    /// A claim will become available if the counterpart stays silent.
    Waiting {
        /// Seconds until the claim becomes eligible.
        remaining_secs: u64,
    },
    /// The claim can be submitted now.
    Eligible,
}

/// Full window the local client waits before offering the claim.
const CLAIM_AFTER_SECS: u64 = TIMEOUT_WINDOW_SECS + TIMEOUT_SAFETY_BUFFER_SECS;

/// Evaluate timeout eligibility for `role` at wall-clock `now_unix`.
///
/// Monotone in time: once `Eligible` for a given snapshot, later times stay
/// `Eligible` until the snapshot itself changes.
pub fn evaluate_timeout(snapshot: &GameSnapshot, role: Role, now_unix: u64) -> TimeoutState {
    if snapshot.has_concluded() {
        return TimeoutState::NotApplicable;
    }

    // Whose silence this role may claim against.
    let claim_exists = match role {
        Role::Committer => !snapshot.has_opponent_acted(),
        Role::Opponent => snapshot.has_opponent_acted(),
        Role::Spectator => false,
    };
    if !claim_exists {
        return TimeoutState::NotApplicable;
    }

    // Zero sentinel: no action recorded, nothing to measure from.
    let Some(elapsed) = snapshot.elapsed_since(now_unix) else {
        return TimeoutState::NotApplicable;
    };

    if elapsed >= CLAIM_AFTER_SECS {
        TimeoutState::Eligible
    } else {
        TimeoutState::Waiting {
            remaining_secs: CLAIM_AFTER_SECS - elapsed,
        }
    }
}

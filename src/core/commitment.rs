//! Move Commitment Codec
//!
//! The committer publishes `keccak256(abi.encodePacked(uint8 move, uint256
//! salt))` at game creation and later reveals both inputs so the contract
//! can verify the hash. Any deviation from that packed encoding breaks
//! reveal verification, so the codec is a fixed 33-byte layout: one move
//! code byte followed by the salt as a big-endian 256-bit integer.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::core::moves::{Move, ALL_MOVES};

/// A published commitment hash (keccak256 output).
pub type CommitmentHash = [u8; 32];

/// The committer's secret salt, a 256-bit value bound at commit time.
///
/// Exactly one salt exists per (game, committer) pair. It is generated once
/// from OS randomness, never rotated, and must stay secret until reveal.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    /// Generate a fresh salt from OS randomness.
    pub fn generate() -> Salt {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Salt(bytes)
    }

    /// Raw big-endian bytes (the packed `uint256` encoding).
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex string with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Salt> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Salt(arr))
    }
}

// Debug never prints salt material; a leaked salt before reveal lets the
// opponent brute-force the committed move.
impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// Compute the commitment hash binding `mv` and `salt`.
///
/// Deterministic and one-way; must match the contract's hashing scheme
/// exactly.
pub fn commit_hash(mv: Move, salt: &Salt) -> CommitmentHash {
    let mut hasher = Keccak256::new();
    hasher.update([mv.code()]);
    hasher.update(salt.as_bytes());
    hasher.finalize().into()
}

/// Recover the committed move from a salt and a published hash.
///
/// Brute-forces the five move codes, recomputing the commitment for each.
/// Returns `None` when no code matches — given keccak256, an unrelated
/// salt/hash pair cannot produce a false positive in practice.
///
/// This is a recovery path for when the local move record was lost but the
/// salt survived in a durable store, not the primary flow.
pub fn recover_move(salt: &Salt, hash: &CommitmentHash) -> Option<Move> {
    ALL_MOVES.into_iter().find(|mv| commit_hash(*mv, salt) == *hash)
}

//! Chain-Level Value Types
//!
//! Addresses identify players and game contracts; each game is its own
//! deployed contract, so a game id *is* an address.

use serde::{Deserialize, Serialize};

/// Stake amounts in wei.
pub type Wei = u128;

/// A 20-byte account or contract address.
///
/// Stored as raw bytes so equality is case-insensitive by construction;
/// mixed-case hex input normalizes to the same value. Implements `Ord` for
/// `BTreeMap` keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string, with or without `0x` prefix, any case.
    pub fn from_hex(s: &str) -> Option<Address> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Address(arr))
    }

    /// Lowercase hex string with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Abbreviated form for logs: `0x1234..abcd`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}..{}", &full[..4], &full[full.len() - 4..])
    }

    /// The all-zero address, used by contracts as an "unset" sentinel.
    pub const fn zero() -> Address {
        Address([0; 20])
    }

    /// Is this the zero sentinel?
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 20]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A game identifier: the address of the per-game contract instance.
pub type GameId = Address;

//! Off-chain move record cache: the per-(user, game) records that carry
//! what the contract forgets — salts, creation-time stakes, and the final
//! per-player result.

pub mod memory;
pub mod record;

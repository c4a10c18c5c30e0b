//! Pure primitives: move codes, the RPSLS judge, the commitment codec and
//! the injectable clock. Nothing here performs I/O or can fail for valid
//! inputs.

pub mod clock;
pub mod commitment;
pub mod moves;

//! Contract-facing interfaces: the chain client capability, game snapshots
//! and an in-process contract simulator for tests and the demo binary.

pub mod client;
pub mod sim;
pub mod snapshot;
pub mod types;

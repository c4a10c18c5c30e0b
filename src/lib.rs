//! # RPSLS Client Core
//!
//! Game-state resolution and timeout arbitration for a commit-reveal
//! Rock-Paper-Scissors-Lizard-Spock game played against an on-chain contract.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RPSLS CLIENT CORE                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure, dependency-free primitives          │
//! │  ├── moves.rs    - Move codes and the RPSLS judge            │
//! │  ├── commitment.rs - keccak256 commit/reveal codec           │
//! │  └── clock.rs    - Injectable clock/sleep capability         │
//! │                                                              │
//! │  chain/          - Contract-facing interfaces                │
//! │  ├── types.rs    - Addresses and wei amounts                 │
//! │  ├── client.rs   - ChainClient trait + write error taxonomy  │
//! │  ├── snapshot.rs - Single-pass game snapshot + derived facts │
//! │  └── sim.rs      - In-process contract simulator             │
//! │                                                              │
//! │  store/          - Off-chain move record cache               │
//! │  sync/           - Real-time action announcements            │
//! │                                                              │
//! │  game/           - Arbitration logic                         │
//! │  ├── role.rs     - Committer / opponent / spectator          │
//! │  ├── timeout.rs  - Timeout eligibility state machine         │
//! │  ├── outcome.rs  - Outcome records + perspective projection  │
//! │  ├── reconcile.rs- Result reconciliation engine              │
//! │  └── session.rs  - Per-viewer game driver                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Convergence Guarantee
//!
//! Two independent clients (committer and opponent) plus any number of
//! spectators derive the **same** outcome record from heterogeneous data
//! sources: the contract is the single source of truth for conclusion
//! (`stake == 0` is the linearization point), the off-chain store supplies
//! move data the contract forgets, and the real-time channel is only ever a
//! hint to re-read — never a carrier of outcome data. Reconciliation is
//! idempotent and safely retriable, so transient cache staleness self-heals.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod chain;
pub mod core;
pub mod game;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use chain::client::{ChainClient, ChainError};
pub use chain::sim::SimulatedChain;
pub use chain::snapshot::{read_snapshot, GameSnapshot, SnapshotIntegrity};
pub use chain::types::{Address, GameId, Wei};
pub use core::clock::{Clock, ManualClock, SystemClock};
pub use core::commitment::{commit_hash, recover_move, CommitmentHash, Salt};
pub use core::moves::{judge, Move, RoundOutcome};
pub use game::outcome::{AbsoluteWinner, OutcomeRecord, PerspectiveResult, PlayerSide};
pub use game::reconcile::{ReconcileError, Reconciliation, Reconciler, RetryPolicy};
pub use game::role::Role;
pub use game::session::{GameSession, GameView, SessionError};
pub use game::timeout::{evaluate_timeout, TimeoutState};
pub use store::memory::MemoryStore;
pub use store::record::{MoveRecord, MoveStore, RecordStatus, RecordUpdate, StoreError};
pub use sync::coordinator::{Coordinator, GameSync, LocalCoordinator};
pub use sync::protocol::{ActionKind, Announcement};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-chain inactivity window after which the stalled party forfeits (seconds).
pub const TIMEOUT_WINDOW_SECS: u64 = 5 * 60;

/// Safety buffer added on top of [`TIMEOUT_WINDOW_SECS`] before the client
/// offers a timeout claim, absorbing skew between the local clock and block
/// timestamps. A premature claim would revert on-chain.
pub const TIMEOUT_SAFETY_BUFFER_SECS: u64 = 10;

/// Delay applied between receiving an action announcement and re-reading the
/// contract, allowing the write that produced the announcement to propagate.
pub const SETTLE_DELAY_SECS: u64 = 2;

//! Chain Client Capability
//!
//! The contract is an external collaborator; this trait is the full surface
//! the core consumes. A client is bound to one signer identity (or none,
//! for read-only spectating) and is passed in explicitly — no ambient
//! global provider state.
//!
//! Write failures are never retried by the core: they surface as a
//! [`ChainError`] and the operation is abandoned with no partial local
//! mutation.

use serde::{Deserialize, Serialize};

use crate::chain::types::{Address, GameId, Wei};
use crate::core::commitment::{CommitmentHash, Salt};
use crate::core::moves::Move;

/// The five contract-resident fields of one game, as returned by a single
/// logical read.
///
/// Raw in the sense that `opponent_move_code` is the unvalidated `uint8`
/// from the contract; snapshot construction interprets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGame {
    /// The committing player (contract accessor `j1`).
    pub committer: Address,
    /// The second player (contract accessor `j2`).
    pub opponent: Address,
    /// Remaining stake in wei; zero once the game has paid out.
    pub stake_wei: Wei,
    /// Opponent's move code (`c2`); zero until the opponent plays.
    pub opponent_move_code: u8,
    /// Commitment hash published at creation (`c1Hash`).
    pub commitment_hash: CommitmentHash,
    /// Unix timestamp of the last state-changing call (`lastAction`).
    pub last_action: u64,
}

/// Errors from contract reads and writes.
///
/// Distinguishes the caller-recoverable cases the UI wants to phrase
/// differently (rejection, balance) from generic transport failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    /// No game exists at the given address.
    #[error("No game found at {0}")]
    GameNotFound(GameId),

    /// The signer rejected the transaction.
    #[error("Transaction was cancelled")]
    Rejected,

    /// Signer balance cannot cover the stake or gas.
    #[error("Insufficient funds for this transaction")]
    InsufficientFunds,

    /// The contract reverted the call (precondition not met on-chain).
    #[error("Contract rejected the call: {0}")]
    Reverted(String),

    /// No signer is attached to this client (read-only spectator handle).
    #[error("Wallet not connected")]
    NoSigner,

    /// Transport-level failure (node unreachable, timeout, bad response).
    #[error("Network error: {0}")]
    Network(String),
}

/// Capability object for contract access, bound to one signer.
///
/// `read_game` must return all five fields from the same chain state —
/// reading fields across different blocks can yield impossible
/// combinations that downstream consumers then have to reject.
#[allow(async_fn_in_trait)]
pub trait ChainClient: Send + Sync {
    /// The signer identity this handle writes as, if any.
    fn signer(&self) -> Option<Address>;

    /// Read all contract fields for one game in a single logical pass.
    async fn read_game(&self, game: GameId) -> Result<RawGame, ChainError>;

    /// Deploy a new game: publish the commitment, name the opponent, and
    /// escrow the stake. Returns the new game's contract address.
    async fn create_game(
        &self,
        commitment: CommitmentHash,
        opponent: Address,
        stake_wei: Wei,
    ) -> Result<GameId, ChainError>;

    /// Opponent's move, staking the matching amount (entry point `play`).
    async fn play(&self, game: GameId, mv: Move, stake_wei: Wei) -> Result<(), ChainError>;

    /// Committer's reveal (entry point `solve`): discloses move and salt so
    /// the contract can verify the commitment and pay out.
    async fn reveal(&self, game: GameId, mv: Move, salt: Salt) -> Result<(), ChainError>;

    /// Claim that the committer failed to reveal in time. Callable by the
    /// opponent once the opponent has played and the window elapsed.
    async fn committer_timeout(&self, game: GameId) -> Result<(), ChainError>;

    /// Claim that the opponent failed to play in time. Callable by the
    /// committer while the opponent slot is empty and the window elapsed.
    async fn opponent_timeout(&self, game: GameId) -> Result<(), ChainError>;
}

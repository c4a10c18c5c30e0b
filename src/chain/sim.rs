//! In-Process Contract Simulator
//!
//! Implements the RPS contract's semantics (play, reveal with commitment
//! verification, both timeout entry points, stake zeroing on payout) over
//! shared in-memory state. One handle per signer, all sharing the same
//! underlying chain, so multi-party scenarios run in a single test.
//!
//! All state transitions for a game happen under one lock, which makes the
//! stake-zeroing write the same linearization point the real contract
//! provides.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::chain::client::{ChainClient, ChainError, RawGame};
use crate::chain::types::{Address, GameId, Wei};
use crate::core::clock::Clock;
use crate::core::commitment::{commit_hash, CommitmentHash, Salt};
use crate::core::moves::{judge, Move, RoundOutcome};
use crate::TIMEOUT_WINDOW_SECS;

/// One game's contract storage.
#[derive(Clone, Copy, Debug)]
struct GameAccount {
    committer: Address,
    opponent: Address,
    /// Per-player stake; zeroed on payout. The contract escrows twice this
    /// once the opponent has matched.
    stake_wei: Wei,
    opponent_move_code: u8,
    commitment_hash: CommitmentHash,
    last_action: u64,
}

#[derive(Debug, Default)]
struct SimState {
    games: BTreeMap<GameId, GameAccount>,
    balances: BTreeMap<Address, Wei>,
    deployed: u64,
}

impl SimState {
    fn credit(&mut self, who: Address, amount: Wei) {
        *self.balances.entry(who).or_insert(0) += amount;
    }

    fn debit(&mut self, who: Address, amount: Wei) -> Result<(), ChainError> {
        let balance = self.balances.entry(who).or_insert(0);
        if *balance < amount {
            return Err(ChainError::InsufficientFunds);
        }
        *balance -= amount;
        Ok(())
    }
}

/// A simulated chain handle bound to one signer (or none, for spectators).
///
/// Clone-cheap; clones share the same chain state.
#[derive(Clone)]
pub struct SimulatedChain<K: Clock> {
    state: Arc<RwLock<SimState>>,
    signer: Option<Address>,
    clock: K,
}

impl<K: Clock> SimulatedChain<K> {
    /// Create a fresh chain with no games and no balances.
    pub fn new(clock: K) -> SimulatedChain<K> {
        SimulatedChain {
            state: Arc::new(RwLock::new(SimState::default())),
            signer: None,
            clock,
        }
    }

    /// A handle over the same chain that signs as `signer`.
    pub fn with_signer(&self, signer: Address) -> SimulatedChain<K> {
        SimulatedChain {
            state: Arc::clone(&self.state),
            signer: Some(signer),
            clock: self.clock.clone(),
        }
    }

    /// Credit an account (test/demo faucet).
    pub async fn fund(&self, who: Address, amount: Wei) {
        self.state.write().await.credit(who, amount);
    }

    /// Current balance of an account.
    pub async fn balance(&self, who: Address) -> Wei {
        self.state
            .read()
            .await
            .balances
            .get(&who)
            .copied()
            .unwrap_or(0)
    }

    fn require_signer(&self) -> Result<Address, ChainError> {
        self.signer.ok_or(ChainError::NoSigner)
    }
}

impl<K: Clock> ChainClient for SimulatedChain<K> {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn read_game(&self, game: GameId) -> Result<RawGame, ChainError> {
        let state = self.state.read().await;
        let account = state.games.get(&game).ok_or(ChainError::GameNotFound(game))?;
        Ok(RawGame {
            committer: account.committer,
            opponent: account.opponent,
            stake_wei: account.stake_wei,
            opponent_move_code: account.opponent_move_code,
            commitment_hash: account.commitment_hash,
            last_action: account.last_action,
        })
    }

    async fn create_game(
        &self,
        commitment: CommitmentHash,
        opponent: Address,
        stake_wei: Wei,
    ) -> Result<GameId, ChainError> {
        let sender = self.require_signer()?;
        let mut state = self.state.write().await;

        state.debit(sender, stake_wei)?;
        state.deployed += 1;

        // Deterministic pseudo-deploy addresses: 0xD0..<counter>.
        let mut bytes = [0u8; 20];
        bytes[0] = 0xD0;
        bytes[12..].copy_from_slice(&state.deployed.to_be_bytes());
        let game = Address::new(bytes);

        state.games.insert(
            game,
            GameAccount {
                committer: sender,
                opponent,
                stake_wei,
                opponent_move_code: 0,
                commitment_hash: commitment,
                last_action: self.clock.now_unix(),
            },
        );

        info!(game = %game.short(), committer = %sender.short(), stake_wei, "game deployed");
        Ok(game)
    }

    async fn play(&self, game: GameId, mv: Move, stake_wei: Wei) -> Result<(), ChainError> {
        let sender = self.require_signer()?;
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let account = *state.games.get(&game).ok_or(ChainError::GameNotFound(game))?;
        if sender != account.opponent {
            return Err(ChainError::Reverted("caller is not the second player".into()));
        }
        if account.opponent_move_code != 0 {
            return Err(ChainError::Reverted("move already played".into()));
        }
        if account.stake_wei == 0 {
            return Err(ChainError::Reverted("game already concluded".into()));
        }
        if stake_wei != account.stake_wei {
            return Err(ChainError::Reverted("stake must match the committer's".into()));
        }

        state.debit(sender, stake_wei)?;
        let entry = state.games.get_mut(&game).ok_or(ChainError::GameNotFound(game))?;
        entry.opponent_move_code = mv.code();
        entry.last_action = now;

        info!(game = %game.short(), mv = %mv, "opponent played");
        Ok(())
    }

    async fn reveal(&self, game: GameId, mv: Move, salt: Salt) -> Result<(), ChainError> {
        let sender = self.require_signer()?;
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let account = *state.games.get(&game).ok_or(ChainError::GameNotFound(game))?;
        if sender != account.committer {
            return Err(ChainError::Reverted("caller is not the committer".into()));
        }
        if account.opponent_move_code == 0 {
            return Err(ChainError::Reverted("second player has not played".into()));
        }
        if account.stake_wei == 0 {
            return Err(ChainError::Reverted("game already concluded".into()));
        }
        if commit_hash(mv, &salt) != account.commitment_hash {
            return Err(ChainError::Reverted("reveal does not match commitment".into()));
        }

        let opponent_move = Move::from_code(account.opponent_move_code)
            .ok_or_else(|| ChainError::Reverted("stored move code is invalid".into()))?;
        let pot = account.stake_wei * 2;
        match judge(mv, opponent_move) {
            RoundOutcome::FirstWins => state.credit(account.committer, pot),
            RoundOutcome::SecondWins => state.credit(account.opponent, pot),
            RoundOutcome::Tie => {
                state.credit(account.committer, account.stake_wei);
                state.credit(account.opponent, account.stake_wei);
            }
        }

        let entry = state.games.get_mut(&game).ok_or(ChainError::GameNotFound(game))?;
        entry.stake_wei = 0;
        entry.last_action = now;

        info!(game = %game.short(), mv = %mv, "committer revealed, stake paid out");
        Ok(())
    }

    async fn committer_timeout(&self, game: GameId) -> Result<(), ChainError> {
        let sender = self.require_signer()?;
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let account = *state.games.get(&game).ok_or(ChainError::GameNotFound(game))?;
        if sender != account.opponent {
            return Err(ChainError::Reverted("caller is not the second player".into()));
        }
        if account.opponent_move_code == 0 {
            return Err(ChainError::Reverted("second player has not played".into()));
        }
        if account.stake_wei == 0 {
            return Err(ChainError::Reverted("game already concluded".into()));
        }
        if now <= account.last_action + TIMEOUT_WINDOW_SECS {
            return Err(ChainError::Reverted("timeout window has not elapsed".into()));
        }

        state.credit(account.opponent, account.stake_wei * 2);
        let entry = state.games.get_mut(&game).ok_or(ChainError::GameNotFound(game))?;
        entry.stake_wei = 0;
        entry.last_action = now;

        info!(game = %game.short(), "committer timed out, opponent takes the pot");
        Ok(())
    }

    async fn opponent_timeout(&self, game: GameId) -> Result<(), ChainError> {
        let sender = self.require_signer()?;
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let account = *state.games.get(&game).ok_or(ChainError::GameNotFound(game))?;
        if sender != account.committer {
            return Err(ChainError::Reverted("caller is not the committer".into()));
        }
        if account.opponent_move_code != 0 {
            return Err(ChainError::Reverted("second player has already played".into()));
        }
        if account.stake_wei == 0 {
            return Err(ChainError::Reverted("game already concluded".into()));
        }
        if now <= account.last_action + TIMEOUT_WINDOW_SECS {
            return Err(ChainError::Reverted("timeout window has not elapsed".into()));
        }

        // Only the committer's stake was ever escrowed; refund it.
        state.credit(account.committer, account.stake_wei);
        let entry = state.games.get_mut(&game).ok_or(ChainError::GameNotFound(game))?;
        entry.stake_wei = 0;
        entry.last_action = now;

        info!(game = %game.short(), "opponent timed out, committer refunded");
        Ok(())
    }
}

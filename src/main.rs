//! RPSLS Client Core Demo
//!
//! Plays two complete games against the in-process contract simulator:
//! a commit/play/reveal game settled by the judge, and a stalled game
//! settled by a timeout claim.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rpsls::{
    Address, GameSession, ManualClock, Move, PerspectiveResult, PlayerSide, Reconciliation,
    SimulatedChain, TimeoutState, Wei, LocalCoordinator, MemoryStore,
    TIMEOUT_SAFETY_BUFFER_SECS, TIMEOUT_WINDOW_SECS, VERSION,
};

const STAKE: Wei = 1_000_000_000_000_000; // 0.001 ether

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("RPSLS Client Core v{}", VERSION);
    info!(
        "Timeout window: {}s (+{}s client-side buffer)",
        TIMEOUT_WINDOW_SECS, TIMEOUT_SAFETY_BUFFER_SECS
    );

    demo_reveal_game().await?;
    demo_timeout_game().await?;

    Ok(())
}

/// Full happy path: create, join, reveal, and both sides reconciling to
/// the same outcome.
async fn demo_reveal_game() -> Result<()> {
    info!("=== Reveal Game ===");

    let clock = ManualClock::starting_at(1_700_000_000);
    let chain = SimulatedChain::new(clock.clone());
    let store = MemoryStore::new();
    let coordinator = LocalCoordinator::new();

    let alice = Address::new([0xA1; 20]);
    let bob = Address::new([0xB0; 20]);
    chain.fund(alice, STAKE).await;
    chain.fund(bob, STAKE).await;

    let committer = GameSession::new(
        chain.with_signer(alice),
        store.clone(),
        coordinator.clone(),
        clock.clone(),
    );
    let opponent = GameSession::new(
        chain.with_signer(bob),
        store.clone(),
        coordinator.clone(),
        clock.clone(),
    );

    let game = committer.create_game(bob, STAKE, Move::Paper).await?;
    info!("{} created game {} staking {} wei", alice.short(), game.short(), STAKE);

    opponent.join_with_move(game, Move::Rock).await?;
    info!("{} joined with {}", bob.short(), Move::Rock);

    let outcome = committer.reveal(game).await?;
    info!(
        "revealed {} vs {}: {:?}",
        Move::Paper,
        Move::Rock,
        outcome.absolute_winner
    );
    info!("{} balance: {} wei", alice.short(), chain.balance(alice).await);
    info!("{} balance: {} wei", bob.short(), chain.balance(bob).await);

    // Both clients converge on the same record.
    if let Reconciliation::Concluded(theirs) = opponent.resolve(game).await? {
        info!(
            "opponent reconciled: {:?} from their side",
            theirs.project(PlayerSide::Opponent)
        );
        assert_eq!(theirs.absolute_winner, outcome.absolute_winner);
    }

    Ok(())
}

/// The stalled path: the opponent plays, the committer never reveals, and
/// the opponent claims the pot once the window (plus buffer) elapses.
async fn demo_timeout_game() -> Result<()> {
    info!("=== Timeout Game ===");

    let clock = ManualClock::starting_at(1_700_000_000);
    let chain = SimulatedChain::new(clock.clone());
    let store = MemoryStore::new();
    let coordinator = LocalCoordinator::new();

    let alice = Address::new([0xA1; 20]);
    let bob = Address::new([0xB0; 20]);
    chain.fund(alice, STAKE).await;
    chain.fund(bob, STAKE).await;

    let committer = GameSession::new(
        chain.with_signer(alice),
        store.clone(),
        coordinator.clone(),
        clock.clone(),
    );
    let opponent = GameSession::new(
        chain.with_signer(bob),
        store.clone(),
        coordinator.clone(),
        clock.clone(),
    );

    let game = committer.create_game(bob, STAKE, Move::Scissors).await?;
    opponent.join_with_move(game, Move::Lizard).await?;
    info!("{} played; waiting on the reveal that never comes", bob.short());

    let view = opponent.view(game).await?;
    if let TimeoutState::Waiting { remaining_secs } = view.timeout {
        info!("claim available in {}s", remaining_secs);
    }

    clock.advance(TIMEOUT_WINDOW_SECS + TIMEOUT_SAFETY_BUFFER_SECS + 1);
    let outcome = opponent.claim_timeout(game).await?;
    info!(
        "timeout claimed: winner {:?}, committer move {:?} (never proven)",
        outcome.timeout_winner, outcome.committer_move
    );
    info!("{} balance: {} wei", bob.short(), chain.balance(bob).await);

    // The committer's next reconciliation reports the forfeit.
    if let Reconciliation::Concluded(theirs) = committer.resolve(game).await? {
        assert_eq!(
            theirs.project(PlayerSide::Committer),
            PerspectiveResult::Loss
        );
        info!("committer reconciled the loss on their next load");
    }

    Ok(())
}

//! Coordination Client
//!
//! Per-game broadcast channels for action announcements, plus the receive
//! loop helper that enforces the two client-side rules: drop self-echoes,
//! and wait out a settle delay before re-reading the contract so the write
//! that produced the announcement has had time to propagate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::chain::types::{Address, GameId};
use crate::core::clock::Clock;
use crate::sync::protocol::{ActionKind, Announcement};
use crate::SETTLE_DELAY_SECS;

/// Per-channel buffer; late subscribers only care about recent hints.
const CHANNEL_CAPACITY: usize = 64;

/// The coordination fan-out interface.
#[allow(async_fn_in_trait)]
pub trait Coordinator: Send + Sync {
    /// Broadcast an action announcement on the game's channel.
    async fn announce(&self, game: GameId, actor: Address, action: ActionKind);

    /// Subscribe to a game's channel.
    async fn subscribe(&self, game: GameId) -> broadcast::Receiver<Announcement>;
}

/// In-process coordinator backed by tokio broadcast channels, one per game.
///
/// Clones share channels, so two sessions in the same process see each
/// other's announcements — enough for tests and the demo; a deployment
/// would put a pub/sub service behind the same trait.
#[derive(Clone, Default)]
pub struct LocalCoordinator {
    channels: Arc<RwLock<BTreeMap<GameId, broadcast::Sender<Announcement>>>>,
}

impl LocalCoordinator {
    /// Create a coordinator with no channels yet.
    pub fn new() -> LocalCoordinator {
        LocalCoordinator::default()
    }

    async fn channel(&self, game: GameId) -> broadcast::Sender<Announcement> {
        let mut channels = self.channels.write().await;
        channels
            .entry(game)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Coordinator for LocalCoordinator {
    async fn announce(&self, game: GameId, actor: Address, action: ActionKind) {
        let sender = self.channel(game).await;
        let announcement = Announcement {
            game,
            actor,
            action,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        // Best-effort: nobody listening is fine.
        let _ = sender.send(announcement);
        debug!(game = %game.short(), ?action, "announced");
    }

    async fn subscribe(&self, game: GameId) -> broadcast::Receiver<Announcement> {
        self.channel(game).await.subscribe()
    }
}

/// Receive-side helper: a subscription filtered down to the announcements
/// this viewer should react to.
pub struct GameSync<K: Clock> {
    receiver: broadcast::Receiver<Announcement>,
    local_actor: Option<Address>,
    clock: K,
}

impl<K: Clock> GameSync<K> {
    /// Wrap a subscription for a viewer identified by `local_actor`
    /// (`None` for spectators, who have no echoes to suppress).
    pub fn new(
        receiver: broadcast::Receiver<Announcement>,
        local_actor: Option<Address>,
        clock: K,
    ) -> GameSync<K> {
        GameSync {
            receiver,
            local_actor,
            clock,
        }
    }

    /// Wait for the next announcement from a *different* actor, then hold
    /// for the settle delay before returning it. The returned announcement
    /// means "re-read the snapshot now"; `ends_game()` on its action says
    /// whether reconciliation should run too.
    ///
    /// Returns `None` once the channel is closed or this receiver lagged
    /// past the buffer (callers fall back to polling either way).
    pub async fn next_signal(&mut self) -> Option<Announcement> {
        loop {
            match self.receiver.recv().await {
                Ok(announcement) => {
                    if Some(announcement.actor) == self.local_actor {
                        debug!(?announcement.action, "dropping self-echo");
                        continue;
                    }
                    self.clock.sleep(Duration::from_secs(SETTLE_DELAY_SECS)).await;
                    return Some(announcement);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "announcement receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    fn game() -> GameId {
        Address::new([0xAA; 20])
    }

    #[tokio::test]
    async fn test_announce_reaches_subscriber() {
        let coordinator = LocalCoordinator::new();
        let receiver = coordinator.subscribe(game()).await;
        let mut sync = GameSync::new(receiver, None, ManualClock::starting_at(0));

        coordinator
            .announce(game(), Address::new([1; 20]), ActionKind::MoveMade)
            .await;

        let signal = sync.next_signal().await.unwrap();
        assert_eq!(signal.action, ActionKind::MoveMade);
        assert_eq!(signal.actor, Address::new([1; 20]));
    }

    #[tokio::test]
    async fn test_self_echo_suppressed() {
        let coordinator = LocalCoordinator::new();
        let me = Address::new([1; 20]);
        let peer = Address::new([2; 20]);

        let receiver = coordinator.subscribe(game()).await;
        let mut sync = GameSync::new(receiver, Some(me), ManualClock::starting_at(0));

        coordinator.announce(game(), me, ActionKind::MoveMade).await;
        coordinator.announce(game(), peer, ActionKind::MoveRevealed).await;

        // The echo is skipped; the peer's announcement comes through.
        let signal = sync.next_signal().await.unwrap();
        assert_eq!(signal.actor, peer);
        assert!(signal.action.ends_game());
    }

    #[tokio::test]
    async fn test_settle_delay_applied() {
        let coordinator = LocalCoordinator::new();
        let clock = ManualClock::starting_at(100);

        let receiver = coordinator.subscribe(game()).await;
        let mut sync = GameSync::new(receiver, None, clock.clone());

        coordinator
            .announce(game(), Address::new([1; 20]), ActionKind::Timeout)
            .await;
        sync.next_signal().await.unwrap();

        assert_eq!(clock.now_unix(), 100 + SETTLE_DELAY_SECS);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_stream() {
        let coordinator = LocalCoordinator::new();
        let receiver = coordinator.subscribe(game()).await;
        let mut sync = GameSync::new(receiver, None, ManualClock::starting_at(0));

        // Drop the only sender.
        coordinator.channels.write().await.clear();

        assert!(sync.next_signal().await.is_none());
    }

    #[tokio::test]
    async fn test_channels_are_per_game() {
        let coordinator = LocalCoordinator::new();
        let other_game = Address::new([0xBB; 20]);

        let mut receiver = coordinator.subscribe(game()).await;
        coordinator
            .announce(other_game, Address::new([1; 20]), ActionKind::MoveMade)
            .await;

        assert!(matches!(
            receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}

//! In-Memory Move Store
//!
//! Reference [`MoveStore`] implementation over shared `RwLock`ed maps.
//! Used by the demo binary and tests; a deployment would put a remote
//! key-value store behind the same trait.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::chain::types::{Address, GameId};
use crate::store::record::{MoveRecord, MoveStore, RecordUpdate, StoreError};

/// Shared in-memory store; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<Address, Vec<MoveRecord>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl MoveStore for MemoryStore {
    async fn append(&self, user: Address, record: MoveRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.entry(user).or_default().push(record);
        Ok(())
    }

    async fn list(&self, user: Address) -> Result<Vec<MoveRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&user).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        user: Address,
        game: GameId,
        update: RecordUpdate,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let Some(list) = records.get_mut(&user) else {
            return Ok(false);
        };
        match list.iter_mut().find(|r| r.game == game) {
            Some(record) => {
                update.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outcome::PerspectiveResult;
    use crate::store::record::RecordStatus;

    fn user() -> Address {
        Address::new([1; 20])
    }

    fn game(n: u8) -> GameId {
        Address::new([n; 20])
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let store = MemoryStore::new();
        store.append(user(), MoveRecord::pending(game(10), 100, None)).await.unwrap();
        store.append(user(), MoveRecord::pending(game(11), 200, None)).await.unwrap();

        let listed = store.list(user()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].game, game(10));
        assert_eq!(listed[1].game, game(11));

        // Other users see nothing.
        assert!(store.list(Address::new([9; 20])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_scans_by_game() {
        let store = MemoryStore::new();
        store.append(user(), MoveRecord::pending(game(10), 100, None)).await.unwrap();

        let found = store.find(user(), game(10)).await.unwrap();
        assert!(found.is_some());
        assert!(store.find(user(), game(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_hits_matching_record() {
        let store = MemoryStore::new();
        store.append(user(), MoveRecord::pending(game(10), 100, None)).await.unwrap();

        let hit = store
            .update(
                user(),
                game(10),
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    result: Some(PerspectiveResult::Tie),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(hit);

        let record = store.find(user(), game(10)).await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Completed);
        assert_eq!(record.result, Some(PerspectiveResult::Tie));

        let miss = store
            .update(user(), game(99), RecordUpdate::default())
            .await
            .unwrap();
        assert!(!miss);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.append(user(), MoveRecord::pending(game(10), 100, None)).await.unwrap();
        assert_eq!(other.list(user()).await.unwrap().len(), 1);
    }
}

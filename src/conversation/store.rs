//! Keyed conversation store: one independently locked record per user.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::state::ConversationRecord;

/// Map from user id to that user's conversation record.
///
/// Holding the guard returned by [`ConversationStore::lock`] gives exclusive
/// access to one user's record; other users are never blocked by it.
#[derive(Default)]
pub struct ConversationStore {
    records: RwLock<HashMap<String, Arc<Mutex<ConversationRecord>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the record for `user_id`, creating an idle one on first use.
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<ConversationRecord> {
        let existing = self.records.read().await.get(user_id).cloned();
        let entry = match existing {
            Some(entry) => entry,
            None => {
                let mut records = self.records.write().await;
                Arc::clone(records.entry(user_id.to_string()).or_default())
            }
        };
        entry.lock_owned().await
    }

    /// Number of users with a record.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationPhase;
    use std::time::Duration;

    #[tokio::test]
    async fn records_are_created_lazily() {
        let store = ConversationStore::new();
        assert!(store.is_empty().await);
        let record = store.lock("1").await;
        assert_eq!(record.phase, ConversationPhase::Idle);
        drop(record);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn changes_persist_between_locks() {
        let store = ConversationStore::new();
        store.lock("1").await.phase = ConversationPhase::AwaitingAge;
        assert_eq!(store.lock("1").await.phase, ConversationPhase::AwaitingAge);
        assert_eq!(store.lock("2").await.phase, ConversationPhase::Idle);
    }

    #[tokio::test]
    async fn other_users_are_not_blocked() {
        let store = ConversationStore::new();
        let _held = store.lock("1").await;
        let other = tokio::time::timeout(Duration::from_millis(200), store.lock("2")).await;
        assert!(other.is_ok());
    }
}

//! Binds button taps to favorites mutations.
//!
//! Save taps refer to suggestions by position in the last suggestion set the
//! user was shown; removal taps refer to positions in the last favorites
//! listing shown with removal buttons. Both are resolved against
//! conversation-scoped data before the store is touched.

use std::sync::Arc;

use tracing::info;

use crate::conversation::ConversationManager;
use crate::error::StorageError;
use crate::favorites::FavoritesStore;

/// Which suggestion a save tap refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    /// Position in the last guided suggestion set.
    Suggestion(usize),
    /// The last random suggestion.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(String),
    AlreadyPresent(String),
    /// The referenced suggestion no longer exists.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(String),
    /// Out of range, or the list changed since it was shown.
    NotFound,
}

pub struct SelectionCoordinator {
    conversations: Arc<ConversationManager>,
    favorites: Arc<FavoritesStore>,
}

impl SelectionCoordinator {
    pub fn new(conversations: Arc<ConversationManager>, favorites: Arc<FavoritesStore>) -> Self {
        Self {
            conversations,
            favorites,
        }
    }

    pub async fn save(&self, user_id: &str, target: SaveTarget) -> Result<SaveOutcome, StorageError> {
        let text = match target {
            SaveTarget::Suggestion(index) => self.conversations.suggestion(user_id, index).await,
            SaveTarget::Random => self.conversations.random_suggestion(user_id).await,
        };
        let Some(text) = text else {
            info!(user_id, ?target, "Save target not found");
            return Ok(SaveOutcome::NotFound);
        };

        if self.favorites.add(user_id, &text).await? {
            info!(user_id, ?target, "Favorite saved");
            Ok(SaveOutcome::Saved(text))
        } else {
            Ok(SaveOutcome::AlreadyPresent(text))
        }
    }

    /// The user's favorites, remembered as the listing removal taps refer to.
    pub async fn begin_removal(&self, user_id: &str) -> Vec<String> {
        let listing = self.favorites.list(user_id).await;
        self.conversations
            .remember_removal_listing(user_id, listing.clone())
            .await;
        listing
    }

    pub async fn remove(&self, user_id: &str, index: usize) -> Result<RemoveOutcome, StorageError> {
        let Some(shown) = self.conversations.removal_listing_item(user_id, index).await else {
            return Ok(RemoveOutcome::NotFound);
        };

        match self.favorites.remove_matching(user_id, index, &shown).await? {
            Some(removed) => {
                info!(user_id, index, "Favorite removed");
                Ok(RemoveOutcome::Removed(removed))
            }
            None => Ok(RemoveOutcome::NotFound),
        }
    }

    /// The user's current favorites.
    pub async fn favorites(&self, user_id: &str) -> Vec<String> {
        self.favorites.list(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{AnswerOutcome, GenerationOutcome};
    use crate::gifts::{GiftProfile, SuggestionGenerator};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedGenerator(Vec<String>);

    #[async_trait]
    impl SuggestionGenerator for FixedGenerator {
        async fn generate(&self, _profile: &GiftProfile) -> Vec<String> {
            self.0.clone()
        }
    }

    async fn setup(ideas: &[&str]) -> (SelectionCoordinator, Arc<ConversationManager>, TempDir) {
        let dir = TempDir::new().unwrap();
        let favorites = Arc::new(FavoritesStore::open(dir.path().join("favorites.json")).await);
        let generator = Arc::new(FixedGenerator(ideas.iter().map(|s| s.to_string()).collect()));
        let conversations = Arc::new(ConversationManager::new(generator));
        let coordinator = SelectionCoordinator::new(Arc::clone(&conversations), favorites);
        (coordinator, conversations, dir)
    }

    async fn run_guided(conversations: &ConversationManager, user: &str) {
        conversations.start_guided(user).await;
        conversations.answer(user, "For a woman").await;
        conversations.answer(user, "25").await;
        conversations.answer(user, "3000").await;
        let AnswerOutcome::Generate(ticket) = conversations.answer(user, "books").await else {
            panic!("expected a generation ticket");
        };
        assert!(matches!(
            conversations.generate(ticket).await,
            GenerationOutcome::Suggestions(_)
        ));
    }

    #[tokio::test]
    async fn save_resolves_index_into_last_set() {
        let (coordinator, conversations, _dir) = setup(&["A", "B", "C"]).await;
        run_guided(&conversations, "u").await;

        assert_eq!(
            coordinator.save("u", SaveTarget::Suggestion(1)).await.unwrap(),
            SaveOutcome::Saved("B".into())
        );
        assert_eq!(
            coordinator.save("u", SaveTarget::Suggestion(1)).await.unwrap(),
            SaveOutcome::AlreadyPresent("B".into())
        );
        assert_eq!(coordinator.favorites("u").await, vec!["B"]);
    }

    #[tokio::test]
    async fn save_past_short_set_is_not_found() {
        let (coordinator, conversations, _dir) = setup(&["A", "B"]).await;
        run_guided(&conversations, "u").await;

        assert_eq!(
            coordinator.save("u", SaveTarget::Suggestion(2)).await.unwrap(),
            SaveOutcome::NotFound
        );
        assert!(coordinator.favorites("u").await.is_empty());
    }

    #[tokio::test]
    async fn save_after_reset_is_not_found() {
        let (coordinator, conversations, _dir) = setup(&["A"]).await;
        run_guided(&conversations, "u").await;
        conversations.reset("u").await;

        assert_eq!(
            coordinator.save("u", SaveTarget::Suggestion(0)).await.unwrap(),
            SaveOutcome::NotFound
        );
        assert_eq!(
            coordinator.save("u", SaveTarget::Random).await.unwrap(),
            SaveOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn double_remove_of_first_item_removes_once() {
        let (coordinator, _conversations, _dir) = setup(&[]).await;
        coordinator.favorites.add("u", "x").await.unwrap();
        coordinator.favorites.add("u", "y").await.unwrap();
        assert_eq!(coordinator.begin_removal("u").await, vec!["x", "y"]);

        let (first, second) = tokio::join!(coordinator.remove("u", 0), coordinator.remove("u", 0));
        let outcomes = [first.unwrap(), second.unwrap()];

        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == RemoveOutcome::Removed("x".into()))
                .count(),
            1
        );
        assert!(outcomes.contains(&RemoveOutcome::NotFound));
        assert_eq!(coordinator.favorites("u").await, vec!["y"]);
    }

    #[tokio::test]
    async fn remove_without_listing_is_not_found() {
        let (coordinator, _conversations, _dir) = setup(&[]).await;
        coordinator.favorites.add("u", "x").await.unwrap();

        assert_eq!(coordinator.remove("u", 0).await.unwrap(), RemoveOutcome::NotFound);
        assert_eq!(coordinator.favorites("u").await, vec!["x"]);
    }
}

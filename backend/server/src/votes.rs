//! # Votes
//!
//! One vote per user per category, switchable.
//!
//! | caller's current vote | action | status |
//! |---|---|---|
//! | none | insert | `submitted` |
//! | another item | update the matching row | `updated` |
//! | the same item | nothing | `unchanged` |
//!
//! The caller supplies its current vote, [`submit_vote`] never looks it up. A stale
//! "none" is still caught because both stores refuse a second vote in a category.
//!
//! [`submit_vote`] never fails: store errors are logged and come back as a `failed` outcome
//! carrying the vote the caller had before.
use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use bank::{CategoryId, ItemId, UserId};
use serde::Serialize;
use tracing::{error, info};

use crate::store::{NewVote, Store, StoreError, StoreResult};

pub const SUBMITTED_MESSAGE: &str = "Your vote has been submitted successfully!";
pub const UPDATED_MESSAGE: &str = "Your vote has been updated successfully!";
pub const UNCHANGED_MESSAGE: &str = "You have not changed your vote.";
pub const FAILED_MESSAGE: &str = "An error occurred while processing your vote. Please try again.";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Submitted,
    Updated,
    Unchanged,
    Failed,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub status: VoteStatus,
    pub message: String,
    /// The item the user's vote in this category points at after the call.
    pub vote_item_id: Option<ItemId>,
}

impl VoteOutcome {
    fn new(status: VoteStatus, vote_item_id: Option<&str>) -> Self {
        let message = match status {
            VoteStatus::Submitted => SUBMITTED_MESSAGE,
            VoteStatus::Updated => UPDATED_MESSAGE,
            VoteStatus::Unchanged => UNCHANGED_MESSAGE,
            VoteStatus::Failed => FAILED_MESSAGE,
        };

        Self {
            status,
            message: message.to_string(),
            vote_item_id: vote_item_id.map(str::to_string),
        }
    }
}

pub async fn submit_vote(
    store: &dyn Store,
    item_id: &str,
    user_id: &str,
    category_id: &str,
    existing_vote_item_id: Option<&str>,
) -> VoteOutcome {
    match try_submit_vote(store, item_id, user_id, category_id, existing_vote_item_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error handling vote of {user_id} in {category_id}: {e}");
            VoteOutcome::new(VoteStatus::Failed, existing_vote_item_id)
        }
    }
}

async fn try_submit_vote(
    store: &dyn Store,
    item_id: &str,
    user_id: &str,
    category_id: &str,
    existing_vote_item_id: Option<&str>,
) -> StoreResult<VoteOutcome> {
    match existing_vote_item_id {
        None => {
            store
                .insert_vote(NewVote {
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    category_id: category_id.to_string(),
                })
                .await?;

            info!("{user_id} voted for {item_id} in {category_id}");
            Ok(VoteOutcome::new(VoteStatus::Submitted, Some(item_id)))
        }
        Some(existing) if existing != item_id => {
            let updated = store.update_vote_item(user_id, existing, item_id).await?;

            match updated {
                0 => {
                    return Err(StoreError::VoteNotFound {
                        user_id: user_id.to_string(),
                        item_id: existing.to_string(),
                    });
                }
                1 => {}
                n => error!("Vote update by {user_id} from {existing} changed {n} rows"),
            }

            info!("{user_id} moved their vote in {category_id} from {existing} to {item_id}");
            Ok(VoteOutcome::new(VoteStatus::Updated, Some(item_id)))
        }
        Some(existing) => Ok(VoteOutcome::new(VoteStatus::Unchanged, Some(existing))),
    }
}

/// Votes currently being processed, keyed by (user, category).
///
/// Stands in for the disabled vote button: a double click must not race itself.
#[derive(Default)]
pub struct InFlightVotes {
    pending: Mutex<HashSet<(UserId, CategoryId)>>,
}

pub struct VoteTicket<'a> {
    votes: &'a InFlightVotes,
    key: (UserId, CategoryId),
}

impl InFlightVotes {
    /// `None` while another vote by the same user in the same category is running.
    pub fn begin(&self, user_id: &str, category_id: &str) -> Option<VoteTicket<'_>> {
        let key = (user_id.to_string(), category_id.to_string());
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        if !pending.insert(key.clone()) {
            return None;
        }

        Some(VoteTicket { votes: self, key })
    }
}

impl Drop for VoteTicket<'_> {
    fn drop(&mut self) {
        self.votes
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        memory::MemoryStore,
        store::{NewItem, VoteFilter},
        testing::FlakyStore,
    };

    async fn seeded<S: Store>(store: &S, items: usize) -> (String, Vec<String>) {
        let category = store.insert_category("Beach").await.unwrap();
        let mut ids = Vec::new();

        for n in 0..items {
            let item = store
                .insert_item(NewItem {
                    name: format!("Item {n}"),
                    image: None,
                    category_id: category.id.clone(),
                })
                .await
                .unwrap();
            ids.push(item.id);
        }

        (category.id, ids)
    }

    async fn votes_of<S: Store>(store: &S, user_id: &str, category_id: &str) -> Vec<String> {
        store
            .votes(&VoteFilter {
                user_id: Some(user_id.to_string()),
                category_id: Some(category_id.to_string()),
            })
            .await
            .unwrap()
            .into_iter()
            .map(|vote| vote.item_id)
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_update_same_row() {
        let store = MemoryStore::new();
        let (category, items) = seeded(&store, 2).await;
        let (a, b) = (&items[0], &items[1]);

        let first = submit_vote(&store, a, "u1", &category, None).await;
        assert_eq!(first.status, VoteStatus::Submitted);
        assert_eq!(first.message, SUBMITTED_MESSAGE);
        assert_eq!(first.vote_item_id.as_deref(), Some(a.as_str()));

        let second = submit_vote(&store, b, "u1", &category, Some(a)).await;
        assert_eq!(second.status, VoteStatus::Updated);
        assert_eq!(second.message, UPDATED_MESSAGE);
        assert_eq!(second.vote_item_id.as_deref(), Some(b.as_str()));

        assert_eq!(votes_of(&store, "u1", &category).await, vec![b.clone()]);
        assert_eq!(store.votes(&VoteFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_item_no_write() {
        let store = FlakyStore::default();
        let (category, items) = seeded(&store, 1).await;
        let a = &items[0];
        submit_vote(&store, a, "u1", &category, None).await;
        let writes = store.writes();

        let outcome = submit_vote(&store, a, "u1", &category, Some(a)).await;

        assert_eq!(outcome.status, VoteStatus::Unchanged);
        assert_eq!(outcome.message, UNCHANGED_MESSAGE);
        assert_eq!(outcome.vote_item_id.as_deref(), Some(a.as_str()));
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_existing() {
        let store = FlakyStore::default();
        let (category, items) = seeded(&store, 2).await;
        let (a, b) = (&items[0], &items[1]);
        submit_vote(&store, a, "u1", &category, None).await;
        store.fail_writes.store(true, Ordering::SeqCst);

        let outcome = submit_vote(&store, b, "u1", &category, Some(a)).await;
        assert_eq!(outcome.status, VoteStatus::Failed);
        assert_eq!(outcome.message, FAILED_MESSAGE);
        assert_eq!(outcome.vote_item_id.as_deref(), Some(a.as_str()));

        let outcome = submit_vote(&store, b, "u2", &category, None).await;
        assert_eq!(outcome.status, VoteStatus::Failed);
        assert_eq!(outcome.vote_item_id, None);

        store.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(votes_of(&store, "u1", &category).await, vec![a.clone()]);
    }

    #[tokio::test]
    async fn test_stale_none_rejected_by_store() {
        let store = MemoryStore::new();
        let (category, items) = seeded(&store, 2).await;
        submit_vote(&store, &items[0], "u1", &category, None).await;

        let outcome = submit_vote(&store, &items[1], "u1", &category, None).await;

        assert_eq!(outcome.status, VoteStatus::Failed);
        assert_eq!(votes_of(&store, "u1", &category).await, vec![items[0].clone()]);
    }

    #[tokio::test]
    async fn test_stale_existing_matches_nothing() {
        let store = MemoryStore::new();
        let (category, items) = seeded(&store, 2).await;

        let outcome = submit_vote(&store, &items[1], "u1", &category, Some(&items[0])).await;

        assert_eq!(outcome.status, VoteStatus::Failed);
        assert_eq!(outcome.vote_item_id.as_deref(), Some(items[0].as_str()));
        assert!(votes_of(&store, "u1", &category).await.is_empty());
    }

    #[tokio::test]
    async fn test_sequence_tracks_last_change() {
        let store = MemoryStore::new();
        let (category, items) = seeded(&store, 3).await;
        let picks = [0, 0, 2, 1, 1, 2, 0, 0];

        let mut current: Option<String> = None;
        for pick in picks {
            let outcome =
                submit_vote(&store, &items[pick], "u1", &category, current.as_deref()).await;
            assert_ne!(outcome.status, VoteStatus::Failed);
            current = outcome.vote_item_id;

            let stored = votes_of(&store, "u1", &category).await;
            assert_eq!(stored.len(), 1);
            assert_eq!(Some(&stored[0]), current.as_ref());
        }

        assert_eq!(current.as_deref(), Some(items[0].as_str()));
    }

    #[tokio::test]
    async fn test_votes_in_separate_categories() {
        let store = MemoryStore::new();
        let (beach, beach_items) = seeded(&store, 1).await;
        let (city, city_items) = seeded(&store, 1).await;

        submit_vote(&store, &beach_items[0], "u1", &beach, None).await;
        let outcome = submit_vote(&store, &city_items[0], "u1", &city, None).await;

        assert_eq!(outcome.status, VoteStatus::Submitted);
        assert_eq!(store.votes(&VoteFilter::default()).await.unwrap().len(), 2);
    }

    #[test]
    fn test_in_flight_guard() {
        let votes = InFlightVotes::default();

        let ticket = votes.begin("u1", "c1");
        assert!(ticket.is_some());
        assert!(votes.begin("u1", "c1").is_none());
        assert!(votes.begin("u1", "c2").is_some());
        assert!(votes.begin("u2", "c1").is_some());

        drop(ticket);
        assert!(votes.begin("u1", "c1").is_some());
    }

    #[test]
    fn test_outcome_json() {
        let outcome = VoteOutcome::new(VoteStatus::Unchanged, Some("i1"));
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "unchanged");
        assert_eq!(json["vote_item_id"], "i1");
    }
}

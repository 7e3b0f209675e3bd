use async_trait::async_trait;
use bank::{Category, DashboardRow, Item, User, Vote};
use tokio::sync::RwLock;

use crate::store::{NewItem, NewVote, Store, StoreError, StoreResult, VoteFilter, new_id};

/// In-process tables, insertion ordered. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    items: Vec<Item>,
    votes: Vec<Vote>,
    users: Vec<User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn users(&self) -> Vec<User> {
        self.tables.read().await.users.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn category(&self, id: &str) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;

        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn items(&self, category_id: Option<&str>) -> StoreResult<Vec<Item>> {
        let tables = self.tables.read().await;

        Ok(tables
            .items
            .iter()
            .filter(|item| category_id.is_none_or(|id| item.category_id == id))
            .cloned()
            .collect())
    }

    async fn votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.read().await;

        Ok(tables
            .votes
            .iter()
            .filter(|vote| filter.matches(vote))
            .cloned()
            .collect())
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let category = Category {
            id: new_id(),
            name: name.to_string(),
        };

        self.tables.write().await.categories.push(category.clone());

        Ok(category)
    }

    async fn insert_item(&self, item: NewItem) -> StoreResult<Item> {
        let item = Item {
            id: new_id(),
            name: item.name,
            image: item.image,
            category_id: item.category_id,
        };

        self.tables.write().await.items.push(item.clone());

        Ok(item)
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let mut tables = self.tables.write().await;

        if tables
            .votes
            .iter()
            .any(|v| v.user_id == vote.user_id && v.category_id == vote.category_id)
        {
            return Err(StoreError::DuplicateVote {
                user_id: vote.user_id,
                category_id: vote.category_id,
            });
        }

        let vote = Vote {
            id: new_id(),
            user_id: vote.user_id,
            item_id: vote.item_id,
            category_id: vote.category_id,
        };
        tables.votes.push(vote.clone());

        Ok(vote)
    }

    async fn update_vote_item(
        &self,
        user_id: &str,
        prior_item_id: &str,
        item_id: &str,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;

        for vote in tables
            .votes
            .iter_mut()
            .filter(|v| v.user_id == user_id && v.item_id == prior_item_id)
        {
            vote.item_id = item_id.to_string();
            updated += 1;
        }

        Ok(updated)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == user.id) {
            tables.users.push(user.clone());
        }

        Ok(())
    }

    async fn dashboard_rows(&self) -> StoreResult<Vec<DashboardRow>> {
        let tables = self.tables.read().await;
        let mut rows = Vec::new();

        for category in &tables.categories {
            let before = rows.len();

            for item in tables.items.iter().filter(|i| i.category_id == category.id) {
                rows.push(DashboardRow {
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    item_id: Some(item.id.clone()),
                    item_name: Some(item.name.clone()),
                    item_image: item.image.clone(),
                    vote_count: tables.votes.iter().filter(|v| v.item_id == item.id).count()
                        as u32,
                });
            }

            if rows.len() == before {
                rows.push(DashboardRow {
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    item_id: None,
                    item_name: None,
                    item_image: None,
                    vote_count: 0,
                });
            }
        }

        Ok(rows)
    }
}

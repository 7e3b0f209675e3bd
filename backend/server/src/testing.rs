//! Store fakes shared by the unit tests.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bank::{Category, DashboardRow, Item, User, Vote};

use crate::{
    memory::MemoryStore,
    store::{
        NewItem, NewVote, Store, StoreError, StoreResult, VoteFilter, parse_dashboard_rows,
    },
};

/// A [`MemoryStore`] that can be told to fail, and that counts writes.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
    /// When set, `dashboard_rows` decodes this instead of asking `inner`.
    pub dashboard_raw: Option<String>,
}

impl FlakyStore {
    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn with_dashboard_raw(raw: &str) -> Self {
        Self {
            dashboard_raw: Some(raw.to_string()),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write refused".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        self.read()?;
        self.inner.categories().await
    }

    async fn category(&self, id: &str) -> StoreResult<Option<Category>> {
        self.read()?;
        self.inner.category(id).await
    }

    async fn items(&self, category_id: Option<&str>) -> StoreResult<Vec<Item>> {
        self.read()?;
        self.inner.items(category_id).await
    }

    async fn votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>> {
        self.read()?;
        self.inner.votes(filter).await
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        self.write()?;
        self.inner.insert_category(name).await
    }

    async fn insert_item(&self, item: NewItem) -> StoreResult<Item> {
        self.write()?;
        self.inner.insert_item(item).await
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        self.write()?;
        self.inner.insert_vote(vote).await
    }

    async fn update_vote_item(
        &self,
        user_id: &str,
        prior_item_id: &str,
        item_id: &str,
    ) -> StoreResult<u64> {
        self.write()?;
        self.inner
            .update_vote_item(user_id, prior_item_id, item_id)
            .await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.write()?;
        self.inner.insert_user(user).await
    }

    async fn dashboard_rows(&self) -> StoreResult<Vec<DashboardRow>> {
        self.read()?;
        match &self.dashboard_raw {
            Some(raw) => parse_dashboard_rows(raw),
            None => self.inner.dashboard_rows().await,
        }
    }
}

/// Lets spawned background tasks run to completion on a current-thread runtime.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

//! # Store
//!
//! Everything the server reads or writes goes through [`Store`]. Two backends:
//! - [`crate::database::RedisStore`]: the deployed one
//! - [`crate::memory::MemoryStore`]: in-process, for local runs and tests
//!
//! Both keep insertion order for every table and both refuse a second vote for the same
//! (user, category) pair, on top of the vote engine's own rule.
use async_trait::async_trait;
use bank::{Category, DashboardRow, Item, User, Vote};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Stored row could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("User {user_id} already has a vote in category {category_id}")]
    DuplicateVote {
        user_id: String,
        category_id: String,
    },

    #[error("No vote by user {user_id} for item {item_id}")]
    VoteNotFound { user_id: String, item_id: String },

    #[error("Malformed aggregation response: {0}")]
    MalformedAggregation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct VoteFilter {
    pub user_id: Option<String>,
    pub category_id: Option<String>,
}

impl VoteFilter {
    pub fn matches(&self, vote: &Vote) -> bool {
        self.user_id.as_ref().is_none_or(|id| *id == vote.user_id)
            && self
                .category_id
                .as_ref()
                .is_none_or(|id| *id == vote.category_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub image: Option<String>,
    pub category_id: String,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub user_id: String,
    pub item_id: String,
    pub category_id: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn categories(&self) -> StoreResult<Vec<Category>>;

    async fn category(&self, id: &str) -> StoreResult<Option<Category>>;

    /// All items, or only those of one category. Insertion order either way.
    async fn items(&self, category_id: Option<&str>) -> StoreResult<Vec<Item>>;

    async fn votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>>;

    async fn insert_category(&self, name: &str) -> StoreResult<Category>;

    async fn insert_item(&self, item: NewItem) -> StoreResult<Item>;

    /// Fails with [`StoreError::DuplicateVote`] when the user already voted in the category.
    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote>;

    /// Points the vote matched by `(user_id, prior_item_id)` at `item_id`.
    ///
    /// Returns the number of rows changed.
    async fn update_vote_item(
        &self,
        user_id: &str,
        prior_item_id: &str,
        item_id: &str,
    ) -> StoreResult<u64>;

    /// Registering an already known user is not an error.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Store-side aggregation, one row per item plus one per empty category.
    async fn dashboard_rows(&self) -> StoreResult<Vec<DashboardRow>>;
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Decodes a raw aggregation payload, which must be a JSON array of rows.
pub fn parse_dashboard_rows(raw: &str) -> StoreResult<Vec<DashboardRow>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| StoreError::MalformedAggregation(e.to_string()))?;

    if !value.is_array() {
        return Err(StoreError::MalformedAggregation(format!(
            "expected an array of rows, got {}",
            kind(&value)
        )));
    }

    serde_json::from_value(value).map_err(|e| StoreError::MalformedAggregation(e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

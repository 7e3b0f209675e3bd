//! # Redis
//!
//! RAM database holding every table of the platform.
//!
//! ## Layout
//!
//! - One hash per table, id -> JSON row: `categories`, `items`, `votes`
//! - One list per table, ids in insertion order: `categories:ids`, `items:ids`, `votes:ids`
//! - `votes:user_category`: "user:category" -> vote id, written with HSETNX so a user can
//!   never hold two votes in one category
//! - `votes:user_item`: "user:item" -> vote id, used to find the vote an update targets
//! - `users`: set of registered user ids
//!
//! Ids are UUIDs, so ':' never appears inside one half of an index field.
//!
//! ## Writes
//!
//! Category and item inserts run as a MULTI pipeline. Vote inserts and updates touch the
//! row and both indexes, so they run as Lua scripts and are atomic from the point of view
//! of every other client.
//!
//! ## Dashboard
//!
//! [`DASHBOARD_SCRIPT`] does the grouping server side and returns the rows as JSON. cjson
//! encodes an empty table as `{}`, hence the explicit `[]`.
use std::time::Duration;

use async_trait::async_trait;
use bank::{Category, DashboardRow, Item, User, Vote};
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

use crate::store::{
    NewItem, NewVote, Store, StoreError, StoreResult, VoteFilter, new_id, parse_dashboard_rows,
};

pub const CATEGORIES: &str = "categories";
pub const CATEGORY_IDS: &str = "categories:ids";
pub const ITEMS: &str = "items";
pub const ITEM_IDS: &str = "items:ids";
pub const VOTES: &str = "votes";
pub const VOTE_IDS: &str = "votes:ids";
pub const VOTES_BY_USER_CATEGORY: &str = "votes:user_category";
pub const VOTES_BY_USER_ITEM: &str = "votes:user_item";
pub const USERS: &str = "users";

const INSERT_VOTE_SCRIPT: &str = r"
if redis.call('HSETNX', KEYS[3], ARGV[3], ARGV[1]) == 0 then
  return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
redis.call('RPUSH', KEYS[2], ARGV[1])
redis.call('HSET', KEYS[4], ARGV[4], ARGV[1])
return 1
";

const UPDATE_VOTE_SCRIPT: &str = r"
local id = redis.call('HGET', KEYS[2], ARGV[1])
if not id then
  return 0
end
local vote = cjson.decode(redis.call('HGET', KEYS[1], id))
vote['item_id'] = ARGV[3]
redis.call('HSET', KEYS[1], id, cjson.encode(vote))
redis.call('HDEL', KEYS[2], ARGV[1])
redis.call('HSET', KEYS[2], ARGV[2], id)
return 1
";

pub const DASHBOARD_SCRIPT: &str = r"
local counts = {}
for _, raw in ipairs(redis.call('HVALS', KEYS[5])) do
  local item_id = cjson.decode(raw)['item_id']
  counts[item_id] = (counts[item_id] or 0) + 1
end

local by_category = {}
for _, id in ipairs(redis.call('LRANGE', KEYS[4], 0, -1)) do
  local raw = redis.call('HGET', KEYS[3], id)
  if raw then
    local item = cjson.decode(raw)
    local list = by_category[item['category_id']]
    if not list then
      list = {}
      by_category[item['category_id']] = list
    end
    table.insert(list, item)
  end
end

local rows = {}
for _, id in ipairs(redis.call('LRANGE', KEYS[2], 0, -1)) do
  local raw = redis.call('HGET', KEYS[1], id)
  if raw then
    local category = cjson.decode(raw)
    local list = by_category[id]
    if list then
      for _, item in ipairs(list) do
        table.insert(rows, {
          category_id = id,
          category_name = category['name'],
          item_id = item['id'],
          item_name = item['name'],
          item_image = item['image'],
          vote_count = counts[item['id']] or 0,
        })
      end
    else
      table.insert(rows, { category_id = id, category_name = category['name'], vote_count = 0 })
    end
  end
end

if #rows == 0 then
  return '[]'
end
return cjson.encode(rows)
";

pub struct RedisStore {
    connection: ConnectionManager,
    insert_vote: Script,
    update_vote: Script,
    dashboard: Script,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        info!("Connected to Redis");

        Ok(Self {
            connection,
            insert_vote: Script::new(INSERT_VOTE_SCRIPT),
            update_vote: Script::new(UPDATE_VOTE_SCRIPT),
            dashboard: Script::new(DASHBOARD_SCRIPT),
        })
    }

    async fn load_ordered<T: DeserializeOwned>(
        &self,
        hash: &str,
        ids: &str,
    ) -> StoreResult<Vec<T>> {
        let mut connection = self.connection.clone();

        let ids: Vec<String> = connection.lrange(ids, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(hash)
            .arg(&ids)
            .query_async(&mut connection)
            .await?;

        rows.into_iter()
            .flatten()
            .map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .collect()
    }

    async fn insert_row<T: Serialize>(
        &self,
        hash: &str,
        ids: &str,
        id: &str,
        row: &T,
    ) -> StoreResult<()> {
        let mut connection = self.connection.clone();

        redis::pipe()
            .atomic()
            .hset(hash, id, serde_json::to_string(row)?)
            .ignore()
            .rpush(ids, id)
            .ignore()
            .query_async::<()>(&mut connection)
            .await?;

        Ok(())
    }

    async fn vote_by_user_category(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> StoreResult<Option<Vote>> {
        let mut connection = self.connection.clone();

        let id: Option<String> = connection
            .hget(VOTES_BY_USER_CATEGORY, index_field(user_id, category_id))
            .await?;
        let Some(id) = id else {
            return Ok(None);
        };

        let row: Option<String> = connection.hget(VOTES, id).await?;

        row.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }
}

fn index_field(user_id: &str, other_id: &str) -> String {
    format!("{user_id}:{other_id}")
}

#[async_trait]
impl Store for RedisStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        self.load_ordered(CATEGORIES, CATEGORY_IDS).await
    }

    async fn category(&self, id: &str) -> StoreResult<Option<Category>> {
        let mut connection = self.connection.clone();
        let row: Option<String> = connection.hget(CATEGORIES, id).await?;

        row.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    async fn items(&self, category_id: Option<&str>) -> StoreResult<Vec<Item>> {
        let mut items: Vec<Item> = self.load_ordered(ITEMS, ITEM_IDS).await?;

        if let Some(category_id) = category_id {
            items.retain(|item| item.category_id == category_id);
        }

        Ok(items)
    }

    async fn votes(&self, filter: &VoteFilter) -> StoreResult<Vec<Vote>> {
        if let (Some(user_id), Some(category_id)) = (&filter.user_id, &filter.category_id) {
            return Ok(self
                .vote_by_user_category(user_id, category_id)
                .await?
                .into_iter()
                .collect());
        }

        let mut votes: Vec<Vote> = self.load_ordered(VOTES, VOTE_IDS).await?;
        votes.retain(|vote| filter.matches(vote));

        Ok(votes)
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let category = Category {
            id: new_id(),
            name: name.to_string(),
        };

        self.insert_row(CATEGORIES, CATEGORY_IDS, &category.id, &category)
            .await?;

        Ok(category)
    }

    async fn insert_item(&self, item: NewItem) -> StoreResult<Item> {
        let item = Item {
            id: new_id(),
            name: item.name,
            image: item.image,
            category_id: item.category_id,
        };

        self.insert_row(ITEMS, ITEM_IDS, &item.id, &item).await?;

        Ok(item)
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let vote = Vote {
            id: new_id(),
            user_id: vote.user_id,
            item_id: vote.item_id,
            category_id: vote.category_id,
        };
        let mut connection = self.connection.clone();

        let inserted: i64 = self
            .insert_vote
            .key(VOTES)
            .key(VOTE_IDS)
            .key(VOTES_BY_USER_CATEGORY)
            .key(VOTES_BY_USER_ITEM)
            .arg(&vote.id)
            .arg(serde_json::to_string(&vote)?)
            .arg(index_field(&vote.user_id, &vote.category_id))
            .arg(index_field(&vote.user_id, &vote.item_id))
            .invoke_async(&mut connection)
            .await?;

        if inserted == 0 {
            return Err(StoreError::DuplicateVote {
                user_id: vote.user_id,
                category_id: vote.category_id,
            });
        }

        Ok(vote)
    }

    async fn update_vote_item(
        &self,
        user_id: &str,
        prior_item_id: &str,
        item_id: &str,
    ) -> StoreResult<u64> {
        let mut connection = self.connection.clone();

        let updated: u64 = self
            .update_vote
            .key(VOTES)
            .key(VOTES_BY_USER_ITEM)
            .arg(index_field(user_id, prior_item_id))
            .arg(index_field(user_id, item_id))
            .arg(item_id)
            .invoke_async(&mut connection)
            .await?;

        Ok(updated)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.sadd(USERS, &user.id).await?;

        Ok(())
    }

    async fn dashboard_rows(&self) -> StoreResult<Vec<DashboardRow>> {
        let mut connection = self.connection.clone();

        let raw: String = self
            .dashboard
            .key(CATEGORIES)
            .key(CATEGORY_IDS)
            .key(ITEMS)
            .key(ITEM_IDS)
            .key(VOTES)
            .invoke_async(&mut connection)
            .await?;

        parse_dashboard_rows(&raw)
    }
}

use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type CategoryId = String;
pub type ItemId = String;
pub type VoteId = String;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A voteable option. `image` is kept as the client sent it (usually a data URL).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub category_id: CategoryId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub id: VoteId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub category_id: CategoryId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ItemWithVoteCount {
    #[serde(flatten)]
    pub item: Item,
    pub vote_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CategoryWithAggregates {
    #[serde(flatten)]
    pub category: Category,
    pub item_count: u32,
    pub vote_count: u32,
    /// Top items by vote count, highest first.
    pub items: Vec<ItemWithVoteCount>,
}

/// One row of a store-side dashboard aggregation.
///
/// A category without items shows up as a single row with no item fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_image: Option<String>,
    #[serde(default)]
    pub vote_count: u32,
}

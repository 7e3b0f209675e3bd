//! # Bank
//!
//! Shared data model of the voting platform, plus the pure aggregation logic
//! the dashboard and category views are built from.
//!
//! ## Tables
//! - categories: (id, name)
//! - items: (id, name, image, category_id)
//! - votes: (id, user_id, item_id, category_id), at most one per (user_id, category_id)
//! - users: (id)
//!
//! ## Views
//! Nothing here touches a store. Callers fetch rows, then hand them to
//! [`dashboard::compute_dashboard`], [`dashboard::compute_category_votes`] or,
//! when the store pre-aggregates, [`dashboard::group_dashboard_rows`].

pub mod dashboard;
pub mod models;

pub use dashboard::{TOP_ITEMS, compute_category_votes, compute_dashboard, group_dashboard_rows};
pub use models::{
    Category, CategoryId, CategoryWithAggregates, DashboardRow, Item, ItemId, ItemWithVoteCount,
    User, UserId, Vote, VoteId,
};

//! # Aggregation
//!
//! Vote counting for the dashboard and per-category views.
//!
//! - Counts are by `item_id` only, a vote whose item is unknown is ignored
//! - Categories keep the order they were given in
//! - Items are ranked by vote count, highest first; ties keep input order
//! - Only the top [`TOP_ITEMS`] survive on the dashboard, but `item_count` and
//!   `vote_count` always cover every item in the category
use std::collections::HashMap;

use crate::models::{
    Category, CategoryWithAggregates, DashboardRow, Item, ItemWithVoteCount, Vote,
};

pub const TOP_ITEMS: usize = 5;

pub fn compute_dashboard(
    categories: &[Category],
    items: &[Item],
    votes: &[Vote],
) -> Vec<CategoryWithAggregates> {
    let counts = count_votes(votes);

    categories
        .iter()
        .map(|category| {
            let category_items = items
                .iter()
                .filter(|item| item.category_id == category.id)
                .map(|item| with_count(item, &counts))
                .collect();

            aggregate(category.clone(), category_items)
        })
        .collect()
}

/// Annotates the items of a single category with their vote counts, in input order.
pub fn compute_category_votes(items: &[Item], votes: &[Vote]) -> Vec<ItemWithVoteCount> {
    let counts = count_votes(votes);

    items.iter().map(|item| with_count(item, &counts)).collect()
}

/// Rebuilds dashboard entries from pre-grouped store rows.
///
/// Categories come out in the order their first row appears.
pub fn group_dashboard_rows(rows: Vec<DashboardRow>) -> Vec<CategoryWithAggregates> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Category, Vec<ItemWithVoteCount>)> = Vec::new();

    for row in rows {
        let position = *positions.entry(row.category_id.clone()).or_insert_with(|| {
            groups.push((
                Category {
                    id: row.category_id.clone(),
                    name: row.category_name.clone(),
                },
                Vec::new(),
            ));
            groups.len() - 1
        });

        // category without items
        let Some(item_id) = row.item_id else {
            continue;
        };

        groups[position].1.push(ItemWithVoteCount {
            item: Item {
                id: item_id,
                name: row.item_name.unwrap_or_default(),
                image: row.item_image,
                category_id: row.category_id,
            },
            vote_count: row.vote_count,
        });
    }

    groups
        .into_iter()
        .map(|(category, items)| aggregate(category, items))
        .collect()
}

fn count_votes(votes: &[Vote]) -> HashMap<&str, u32> {
    let mut counts = HashMap::new();

    for vote in votes {
        *counts.entry(vote.item_id.as_str()).or_insert(0) += 1;
    }

    counts
}

fn with_count(item: &Item, counts: &HashMap<&str, u32>) -> ItemWithVoteCount {
    ItemWithVoteCount {
        item: item.clone(),
        vote_count: counts.get(item.id.as_str()).copied().unwrap_or(0),
    }
}

fn aggregate(category: Category, mut items: Vec<ItemWithVoteCount>) -> CategoryWithAggregates {
    let item_count = items.len() as u32;
    let vote_count = items.iter().map(|item| item.vote_count).sum();

    // sort_by is stable, equal counts keep their relative order
    items.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
    items.truncate(TOP_ITEMS);

    CategoryWithAggregates {
        category,
        item_count,
        vote_count,
        items,
    }
}

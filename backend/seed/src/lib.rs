//! # Seeding
//!
//! Loads categories and items into a store from a JSON document.
//!
//! ```json
//! { "categories": [ { "name": "Beach", "items": [ { "name": "Cove", "image": "data:..." } ] } ] }
//! ```
//!
//! - Categories are inserted in file order, each followed by its items
//! - Names are trimmed and inner whitespace collapsed; an empty name is skipped with a warning
//! - A skipped category skips its items too, they would have nowhere to go
//! - Votes and users are never seeded
use indicatif::ProgressBar;
use server::store::{NewItem, Store};
use tracing::{info, warn};

pub mod models;
pub mod utils;

use models::SeedFile;
use utils::{sanitize, sanitize_image};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub categories: usize,
    pub items: usize,
    pub skipped: usize,
}

pub async fn load(store: &dyn Store, seed: &SeedFile, pb: &ProgressBar) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();

    for seed_category in &seed.categories {
        let name = sanitize(&seed_category.name);

        if name.is_empty() {
            warn!(
                "Skipping unnamed category and its {} items",
                seed_category.items.len()
            );
            summary.skipped += 1 + seed_category.items.len();
            pb.inc(1 + seed_category.items.len() as u64);
            continue;
        }

        pb.set_message(format!("Category {name}"));
        let category = store.insert_category(&name).await?;
        info!("Inserted category {} ({})", category.name, category.id);
        summary.categories += 1;
        pb.inc(1);

        for seed_item in &seed_category.items {
            let item_name = sanitize(&seed_item.name);
            pb.inc(1);

            if item_name.is_empty() {
                warn!("Skipping unnamed item in {}", category.name);
                summary.skipped += 1;
                continue;
            }

            store
                .insert_item(NewItem {
                    name: item_name,
                    image: sanitize_image(seed_item.image.as_deref()),
                    category_id: category.id.clone(),
                })
                .await?;
            summary.items += 1;
        }
    }

    pb.finish_with_message("Done");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use server::memory::MemoryStore;

    use super::*;
    use crate::models::{SeedCategory, SeedItem};

    fn item(name: &str, image: Option<&str>) -> SeedItem {
        SeedItem {
            name: name.to_string(),
            image: image.map(str::to_string),
        }
    }

    fn seed() -> SeedFile {
        SeedFile {
            categories: vec![
                SeedCategory {
                    name: " Beach ".to_string(),
                    items: vec![
                        item("Cove", Some("data:c")),
                        item("  ", None),
                        item("Bay", Some(" ")),
                    ],
                },
                SeedCategory {
                    name: "".to_string(),
                    items: vec![item("Lost", None)],
                },
                SeedCategory {
                    name: "City   Break".to_string(),
                    items: vec![],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_load() {
        let store = MemoryStore::new();

        let summary = load(&store, &seed(), &ProgressBar::hidden()).await.unwrap();

        assert_eq!(
            summary,
            Summary {
                categories: 2,
                items: 2,
                skipped: 3,
            }
        );

        let categories = store.categories().await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Beach", "City Break"]);

        let items = store.items(Some(categories[0].id.as_str())).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Cove");
        assert_eq!(items[0].image.as_deref(), Some("data:c"));
        assert_eq!(items[1].image, None);
        assert!(store.items(Some(categories[1].id.as_str())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_empty() {
        let store = MemoryStore::new();

        let summary = load(&store, &SeedFile::default(), &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary, Summary::default());
        assert!(store.categories().await.unwrap().is_empty());
    }
}

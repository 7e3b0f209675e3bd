use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub items: Vec<SeedItem>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SeedItem {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl SeedFile {
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| 1 + c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

use bank::{Category, CategoryId};

use crate::error::AppError;

/// Trims a submitted name, refusing one that is empty afterwards.
pub fn required_name(name: &str, what: &str) -> Result<String, AppError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(AppError::Validation(format!("Please enter a {what} name")));
    }

    Ok(name.to_string())
}

/// Ids of the categories before and after `id`, no wrap-around.
pub fn neighbours(categories: &[Category], id: &str) -> (Option<CategoryId>, Option<CategoryId>) {
    let Some(position) = categories.iter().position(|c| c.id == id) else {
        return (None, None);
    };

    let previous = position
        .checked_sub(1)
        .and_then(|i| categories.get(i))
        .map(|c| c.id.clone());
    let next = categories.get(position + 1).map(|c| c.id.clone());

    (previous, next)
}

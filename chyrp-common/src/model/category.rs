use crate::model::Id;
use serde::Serialize;
use thiserror::Error;

pub const CATEGORY_NAME_MAX_LEN: usize = 100;

/// Categories the seeding command makes sure exist.
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Technology",
    "Health",
    "Education",
    "Finance",
    "Travel",
    "Lifestyle",
];

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CategoryMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct Category {
    pub id: Id<CategoryMarker>,
    pub name: CategoryName,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CategoryName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Category name must be 1 to {CATEGORY_NAME_MAX_LEN} characters: {0:?}")]
pub struct InvalidCategoryNameError(String);

impl CategoryName {
    pub fn new(name: String) -> Result<Self, InvalidCategoryNameError> {
        if name.trim().is_empty() || name.chars().count() > CATEGORY_NAME_MAX_LEN {
            Err(InvalidCategoryNameError(name))
        } else {
            Ok(Self(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

/// Outcome of making sure a set of categories exists.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SeedReport {
    pub created: Vec<CategoryName>,
    pub existing: Vec<CategoryName>,
}

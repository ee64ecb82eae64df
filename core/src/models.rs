use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// A bookmarked meal as cached in the local favorites table.
///
/// Fields are denormalized from the catalog at bookmark time and never
/// refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteMeal {
    pub meal_id: String,
    pub name: String,
    pub thumbnail_url: String,
    /// Category the meal was browsed from. `None` when the meal was opened
    /// without category context.
    pub category_id: Option<String>,
}

impl FavoriteMeal {
    /// Build a record from a category listing row.
    #[must_use]
    pub fn from_summary(meal: &MealSummary, browsed_category: Option<&str>) -> Self {
        Self {
            meal_id: meal.id.clone(),
            name: meal.name.clone(),
            thumbnail_url: meal.thumbnail_url.clone(),
            category_id: browsed_category.map(str::to_string),
        }
    }

    /// Build a record from a fetched meal description.
    ///
    /// The description's own category is deliberately not used as a
    /// fallback: without browse context the category stays unset.
    #[must_use]
    pub fn from_description(meal: &MealDescription, browsed_category: Option<&str>) -> Self {
        Self {
            meal_id: meal.id.clone(),
            name: meal.name.clone(),
            thumbnail_url: meal.thumbnail_url.clone().unwrap_or_default(),
            category_id: browsed_category.map(str::to_string),
        }
    }
}

impl fmt::Display for FavoriteMeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.meal_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub thumbnail_url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealSummary {
    pub id: String,
    pub name: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.measure {
            Some(measure) => write!(f, "{}: {measure}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealDescription {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

/// A meal row annotated with its bookmark state, as rendered by list screens.
#[derive(Debug, Clone, Serialize)]
pub struct MealRow {
    #[serde(flatten)]
    pub meal: MealSummary,
    pub favorite: bool,
}

/// Normalize a meal or category identifier taken from user input.
pub fn validate_key(kind: &str, raw: &str) -> Result<String> {
    let key = raw.trim();
    if key.is_empty() {
        bail!("{kind} must not be empty");
    }
    if key.chars().any(char::is_control) {
        bail!("Invalid {kind} '{}'", key.escape_debug());
    }
    Ok(key.to_string())
}

use std::future::Future;
use std::path::Path;

use anyhow::Result;

use crate::favorites::{FavoritesStore, LiveView};
use crate::mealdb::CatalogError;
use crate::models::{Category, FavoriteMeal, MealDescription, MealRow, MealSummary};

/// Read-only recipe catalog.
///
/// The CLI implements this with reqwest; tests use in-memory fakes. Every
/// call is expected to give up after a fixed deadline and report
/// [`CatalogError::Timeout`]. Implementations do not retry.
pub trait CatalogProvider: Send + Sync {
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, CatalogError>> + Send;

    fn list_meals_by_category(
        &self,
        category_id: &str,
    ) -> impl Future<Output = Result<Vec<MealSummary>, CatalogError>> + Send;

    fn get_meal_description(
        &self,
        meal_id: &str,
    ) -> impl Future<Output = Result<Option<MealDescription>, CatalogError>> + Send;
}

/// Data a screen is currently showing, plus the last load failure.
///
/// A failed load never replaces what is already displayed.
#[derive(Debug)]
pub struct Screen<T> {
    pub data: T,
    pub last_error: Option<CatalogError>,
}

impl<T: Default> Default for Screen<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            last_error: None,
        }
    }
}

impl<T> Screen<T> {
    pub fn apply(&mut self, result: Result<T, CatalogError>) -> bool {
        match result {
            Ok(data) => {
                self.data = data;
                self.last_error = None;
                true
            }
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }
}

/// Outcome of [`PlatterService::bookmark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bookmark {
    Added(FavoriteMeal),
    /// Already bookmarked; carries the stored record, which is left as is.
    AlreadyPresent(FavoriteMeal),
    UnknownMeal,
}

/// Composition root for a display shell: one favorites store and one catalog.
pub struct PlatterService<C> {
    favorites: FavoritesStore,
    catalog: C,
}

impl<C: CatalogProvider> PlatterService<C> {
    pub fn new(favorites: FavoritesStore, catalog: C) -> Self {
        Self { favorites, catalog }
    }

    pub fn open(db_path: &Path, catalog: C) -> Result<Self> {
        Ok(Self::new(FavoritesStore::open(db_path)?, catalog))
    }

    pub fn new_in_memory(catalog: C) -> Result<Self> {
        Ok(Self::new(FavoritesStore::open_in_memory()?, catalog))
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    // --- Catalog ---

    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let result = self.catalog.list_categories().await;
        match &result {
            Ok(categories) => tracing::debug!(count = categories.len(), "categories loaded"),
            Err(e) => tracing::warn!("failed to load categories: {e}"),
        }
        result
    }

    pub async fn meals(&self, category_id: &str) -> Result<Vec<MealSummary>, CatalogError> {
        let result = self.catalog.list_meals_by_category(category_id).await;
        match &result {
            Ok(meals) => tracing::debug!(category_id, count = meals.len(), "meals loaded"),
            Err(e) => tracing::warn!(category_id, "failed to load meals: {e}"),
        }
        result
    }

    /// Meals of a category annotated with their current bookmark state.
    pub async fn meal_rows(&self, category_id: &str) -> Result<Vec<MealRow>, CatalogError> {
        let meals = self.meals(category_id).await?;
        Ok(meals
            .into_iter()
            .map(|meal| MealRow {
                favorite: self.favorites.contains(&meal.id),
                meal,
            })
            .collect())
    }

    pub async fn meal_description(
        &self,
        meal_id: &str,
    ) -> Result<Option<MealDescription>, CatalogError> {
        let result = self.catalog.get_meal_description(meal_id).await;
        match &result {
            Ok(Some(meal)) => tracing::debug!(meal_id, name = %meal.name, "meal loaded"),
            Ok(None) => tracing::debug!(meal_id, "meal not found"),
            Err(e) => tracing::warn!(meal_id, "failed to load meal: {e}"),
        }
        result
    }

    /// Reload `screen` with the category list, keeping its data on failure.
    pub async fn refresh_categories(&self, screen: &mut Screen<Vec<Category>>) -> bool {
        screen.apply(self.categories().await)
    }

    /// Reload `screen` with the meals of `category_id`, keeping its data on failure.
    pub async fn refresh_meals(
        &self,
        category_id: &str,
        screen: &mut Screen<Vec<MealRow>>,
    ) -> bool {
        screen.apply(self.meal_rows(category_id).await)
    }

    // --- Favorites ---

    /// Flip the bookmark for a listed meal and return the intended new state.
    ///
    /// The decision reads [`FavoritesStore::contains`], so two toggles in
    /// quick succession may both see the pre-toggle state.
    pub fn toggle_favorite(&self, meal: &MealSummary, browsed_category: Option<&str>) -> bool {
        if self.favorites.contains(&meal.id) {
            self.favorites.delete(&meal.id);
            false
        } else {
            self.favorites
                .insert(FavoriteMeal::from_summary(meal, browsed_category));
            true
        }
    }

    /// Flip the bookmark from a meal detail screen.
    pub fn toggle_description(
        &self,
        meal: &MealDescription,
        browsed_category: Option<&str>,
    ) -> bool {
        if self.favorites.contains(&meal.id) {
            self.favorites.delete(&meal.id);
            false
        } else {
            self.favorites
                .insert(FavoriteMeal::from_description(meal, browsed_category));
            true
        }
    }

    /// Fetch a meal by id and bookmark it. Meals that are already bookmarked
    /// are reported without touching the catalog.
    pub async fn bookmark(
        &self,
        meal_id: &str,
        browsed_category: Option<&str>,
    ) -> Result<Bookmark, CatalogError> {
        if let Some(existing) = self.favorites.get_settled(meal_id).await {
            return Ok(Bookmark::AlreadyPresent(existing));
        }
        let Some(meal) = self.meal_description(meal_id).await? else {
            return Ok(Bookmark::UnknownMeal);
        };
        let record = FavoriteMeal::from_description(&meal, browsed_category);
        self.favorites.insert(record.clone());
        Ok(Bookmark::Added(record))
    }

    /// Remove a bookmark. Returns whether the meal was bookmarked beforehand.
    pub fn unbookmark(&self, meal_id: &str) -> bool {
        let was_favorite = self.favorites.contains(meal_id);
        self.favorites.delete(meal_id);
        was_favorite
    }

    pub fn clear_favorites(&self) -> usize {
        let count = self.favorites.snapshot().len();
        self.favorites.clear();
        count
    }

    pub fn list_favorites(&self) -> Vec<FavoriteMeal> {
        self.favorites.snapshot().to_vec()
    }

    pub fn watch_favorite(&self, meal_id: &str) -> LiveView<Option<FavoriteMeal>> {
        self.favorites.get(meal_id)
    }

    /// Wait until every queued favorites mutation has been applied.
    pub async fn settled(&self) {
        self.favorites.settled().await;
    }
}

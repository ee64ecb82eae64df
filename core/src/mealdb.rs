use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Category, Ingredient, MealDescription, MealSummary};

pub const DEFAULT_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1/";
pub const CATEGORIES_PATH: &str = "categories.php";
pub const FILTER_PATH: &str = "filter.php";
pub const LOOKUP_PATH: &str = "lookup.php";

/// Deadline applied to every catalog request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The API flattens ingredients into numbered fields, 1 through 20.
const MAX_INGREDIENTS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("failed to reach catalog: {0}")]
    Transport(String),
    #[error("catalog returned HTTP {0}")]
    Status(u16),
    #[error("failed to parse catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogError::Timeout(_))
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Option<Vec<CategoryData>>,
}

/// Envelope shared by `filter.php` and `lookup.php`. `meals` is `null` when
/// nothing matched.
#[derive(Debug, Deserialize)]
pub struct MealsResponse<T> {
    pub meals: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryData {
    pub id_category: Option<String>,
    pub str_category: Option<String>,
    pub str_category_thumb: Option<String>,
    pub str_category_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealData {
    pub id_meal: Option<String>,
    pub str_meal: Option<String>,
    pub str_meal_thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDescriptionData {
    pub id_meal: Option<String>,
    pub str_meal: Option<String>,
    pub str_category: Option<String>,
    pub str_area: Option<String>,
    pub str_instructions: Option<String>,
    pub str_meal_thumb: Option<String>,
    pub str_tags: Option<String>,
    pub str_youtube: Option<String>,
    /// `strIngredientN` / `strMeasureN` pairs and anything else we ignore.
    #[serde(flatten)]
    pub rest: HashMap<String, Value>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn field_str<'a>(rest: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    rest.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[must_use]
pub fn category_from_data(c: CategoryData) -> Option<Category> {
    let id = non_blank(c.id_category)?;
    let name = non_blank(c.str_category)?;
    Some(Category {
        id,
        name,
        thumbnail_url: c.str_category_thumb.unwrap_or_default(),
        description: c
            .str_category_description
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
    })
}

#[must_use]
pub fn meal_from_data(m: MealData) -> Option<MealSummary> {
    let id = non_blank(m.id_meal)?;
    let name = non_blank(m.str_meal)?;
    Some(MealSummary {
        id,
        name,
        thumbnail_url: m.str_meal_thumb.unwrap_or_default(),
    })
}

/// Ingredient/measure pairs in API order, skipping blank ingredients.
#[must_use]
pub fn ingredients_from_fields(rest: &HashMap<String, Value>) -> Vec<Ingredient> {
    (1..=MAX_INGREDIENTS)
        .filter_map(|i| {
            let name = field_str(rest, &format!("strIngredient{i}"))?;
            let measure = field_str(rest, &format!("strMeasure{i}")).map(str::to_string);
            Some(Ingredient {
                name: name.to_string(),
                measure,
            })
        })
        .collect()
}

#[must_use]
pub fn description_from_data(d: MealDescriptionData) -> Option<MealDescription> {
    let id = non_blank(d.id_meal)?;
    let name = non_blank(d.str_meal)?;
    let ingredients = ingredients_from_fields(&d.rest);
    let tags = d
        .str_tags
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    Some(MealDescription {
        id,
        name,
        category: non_blank(d.str_category),
        area: non_blank(d.str_area),
        instructions: non_blank(d.str_instructions),
        thumbnail_url: non_blank(d.str_meal_thumb),
        tags,
        youtube_url: non_blank(d.str_youtube),
        ingredients,
    })
}

#[must_use]
pub fn categories_from_response(resp: CategoriesResponse) -> Vec<Category> {
    resp.categories
        .unwrap_or_default()
        .into_iter()
        .filter_map(category_from_data)
        .collect()
}

#[must_use]
pub fn meals_from_response(resp: MealsResponse<MealData>) -> Vec<MealSummary> {
    resp.meals
        .unwrap_or_default()
        .into_iter()
        .filter_map(meal_from_data)
        .collect()
}

/// The lookup endpoint answers with a list; the first entry is the meal.
#[must_use]
pub fn description_from_response(
    resp: MealsResponse<MealDescriptionData>,
) -> Option<MealDescription> {
    resp.meals?
        .into_iter()
        .next()
        .and_then(description_from_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORBA_LOOKUP: &str = r#"{
        "meals": [{
            "idMeal": "52977",
            "strMeal": "Corba",
            "strDrinkAlternate": null,
            "strCategory": "Side",
            "strArea": "Turkish",
            "strInstructions": "Pick through your lentils.",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/58oia61564916529.jpg",
            "strTags": "Soup, ",
            "strYoutube": "https://www.youtube.com/watch?v=VVnZd8A84z4",
            "strIngredient1": "Lentils",
            "strIngredient2": "Onion",
            "strIngredient3": " ",
            "strIngredient4": "Carrots",
            "strIngredient5": null,
            "strMeasure1": "1 cup ",
            "strMeasure2": "1 large",
            "strMeasure3": "1 tbs",
            "strMeasure4": "",
            "strMeasure5": null
        }]
    }"#;

    #[test]
    fn test_description_from_lookup() {
        let resp: MealsResponse<MealDescriptionData> =
            serde_json::from_str(CORBA_LOOKUP).unwrap();
        let meal = description_from_response(resp).unwrap();
        assert_eq!(meal.id, "52977");
        assert_eq!(meal.name, "Corba");
        assert_eq!(meal.category.as_deref(), Some("Side"));
        assert_eq!(meal.area.as_deref(), Some("Turkish"));
        assert_eq!(meal.tags, vec!["Soup"]);

        let names: Vec<&str> = meal.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Lentils", "Onion", "Carrots"]);
        assert_eq!(meal.ingredients[0].measure.as_deref(), Some("1 cup"));
        // Blank measure becomes None
        assert!(meal.ingredients[2].measure.is_none());
    }

    #[test]
    fn test_lookup_null_meals_is_none() {
        let resp: MealsResponse<MealDescriptionData> =
            serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(description_from_response(resp).is_none());
    }

    #[test]
    fn test_filter_null_meals_is_empty() {
        let resp: MealsResponse<MealData> = serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(meals_from_response(resp).is_empty());
    }

    #[test]
    fn test_meals_from_filter() {
        let body = r#"{"meals": [
            {"strMeal": "Corba", "strMealThumb": "url1", "idMeal": "52977"},
            {"strMeal": "", "strMealThumb": "url2", "idMeal": "1"},
            {"strMeal": "Kumpir", "idMeal": "52978"}
        ]}"#;
        let resp: MealsResponse<MealData> = serde_json::from_str(body).unwrap();
        let meals = meals_from_response(resp);
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].name, "Corba");
        assert_eq!(meals[0].thumbnail_url, "url1");
        assert_eq!(meals[1].id, "52978");
        assert_eq!(meals[1].thumbnail_url, "");
    }

    #[test]
    fn test_categories_from_response() {
        let body = r#"{"categories": [
            {
                "idCategory": "1",
                "strCategory": "Beef",
                "strCategoryThumb": "https://www.themealdb.com/images/category/beef.png",
                "strCategoryDescription": "Beef is the culinary name for meat from cattle.\r\n"
            },
            {"idCategory": "2", "strCategory": null}
        ]}"#;
        let resp: CategoriesResponse = serde_json::from_str(body).unwrap();
        let cats = categories_from_response(resp);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, "Beef");
        assert_eq!(
            cats[0].description,
            "Beef is the culinary name for meat from cattle."
        );
    }

    #[test]
    fn test_ingredients_stop_at_twenty() {
        let mut rest = HashMap::new();
        for i in 1..=21 {
            rest.insert(
                format!("strIngredient{i}"),
                Value::String(format!("item{i}")),
            );
        }
        let ingredients = ingredients_from_fields(&rest);
        assert_eq!(ingredients.len(), 20);
        assert_eq!(ingredients[19].name, "item20");
    }

    #[test]
    fn test_timeout_error_display() {
        let err = CatalogError::Timeout(DEFAULT_TIMEOUT);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "catalog request timed out after 10s");
        assert!(!CatalogError::Status(500).is_timeout());
    }
}

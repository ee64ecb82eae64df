use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;

use platter_core::mealdb::{
    CATEGORIES_PATH, CatalogError, CategoriesResponse, FILTER_PATH, LOOKUP_PATH, MealData,
    MealDescriptionData, MealsResponse, categories_from_response, description_from_response,
    meals_from_response,
};
use platter_core::models::{Category, MealDescription, MealSummary};
use platter_core::service::CatalogProvider;

pub struct MealDbClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl MealDbClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "platter/{} (recipe browser)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .context("Failed to build HTTP client")?;

        // Url::join drops the last path segment unless the base ends in '/'
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&base).with_context(|| format!("Invalid catalog URL: '{base_url}'"))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn map_error(&self, e: &reqwest::Error) -> CatalogError {
        if e.is_timeout() {
            CatalogError::Timeout(self.timeout)
        } else if e.is_decode() {
            CatalogError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            CatalogError::Status(status.as_u16())
        } else {
            CatalogError::Transport(e.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        tracing::debug!(%url, ?query, "catalog request");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        resp.json().await.map_err(|e| self.map_error(&e))
    }

    pub async fn list_categories_async(&self) -> Result<Vec<Category>, CatalogError> {
        let data: CategoriesResponse = self.get_json(CATEGORIES_PATH, &[]).await?;
        Ok(categories_from_response(data))
    }

    pub async fn list_meals_async(
        &self,
        category_id: &str,
    ) -> Result<Vec<MealSummary>, CatalogError> {
        let data: MealsResponse<MealData> =
            self.get_json(FILTER_PATH, &[("c", category_id)]).await?;
        Ok(meals_from_response(data))
    }

    pub async fn lookup_meal_async(
        &self,
        meal_id: &str,
    ) -> Result<Option<MealDescription>, CatalogError> {
        let data: MealsResponse<MealDescriptionData> =
            self.get_json(LOOKUP_PATH, &[("i", meal_id)]).await?;
        Ok(description_from_response(data))
    }
}

impl CatalogProvider for MealDbClient {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.list_categories_async().await
    }

    async fn list_meals_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<MealSummary>, CatalogError> {
        self.list_meals_async(category_id).await
    }

    async fn get_meal_description(
        &self,
        meal_id: &str,
    ) -> Result<Option<MealDescription>, CatalogError> {
        self.lookup_meal_async(meal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use platter_core::mealdb::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

    const CATEGORIES: &str = r#"{"categories": [
        {"idCategory": "1", "strCategory": "Beef", "strCategoryThumb": "b.png",
         "strCategoryDescription": "Beef is the culinary name for meat from cattle."},
        {"idCategory": "3", "strCategory": "Dessert", "strCategoryThumb": "d.png",
         "strCategoryDescription": "Dessert is a course that concludes a meal."}
    ]}"#;

    async fn filter(Query(q): Query<HashMap<String, String>>) -> (StatusCode, String) {
        let body = if q.get("c").map(String::as_str) == Some("Side") {
            r#"{"meals": [{"strMeal": "Corba", "strMealThumb": "url1", "idMeal": "52977"}]}"#
        } else {
            r#"{"meals": null}"#
        };
        (StatusCode::OK, body.to_string())
    }

    async fn lookup(Query(q): Query<HashMap<String, String>>) -> (StatusCode, String) {
        let body = if q.get("i").map(String::as_str) == Some("52977") {
            r#"{"meals": [{"idMeal": "52977", "strMeal": "Corba", "strCategory": "Side",
                "strMealThumb": "url1", "strIngredient1": "Lentils", "strMeasure1": "1 cup"}]}"#
        } else {
            r#"{"meals": null}"#
        };
        (StatusCode::OK, body.to_string())
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(2)).await;
        r#"{"categories": []}"#
    }

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn spawn_catalog(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/json/v1/1")
    }

    fn catalog_routes() -> Router {
        Router::new()
            .route("/api/json/v1/1/categories.php", get(|| async { CATEGORIES }))
            .route("/api/json/v1/1/filter.php", get(filter))
            .route("/api/json/v1/1/lookup.php", get(lookup))
    }

    #[tokio::test]
    async fn test_list_categories() {
        let base = spawn_catalog(catalog_routes()).await;
        let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();
        let categories = client.list_categories_async().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Beef");
        assert_eq!(categories[1].id, "3");
    }

    #[tokio::test]
    async fn test_list_meals_by_category() {
        let base = spawn_catalog(catalog_routes()).await;
        let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();

        let meals = client.list_meals_async("Side").await.unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].id, "52977");

        // Unknown categories come back as `"meals": null`
        let none = client.list_meals_async("Nope").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_meal() {
        let base = spawn_catalog(catalog_routes()).await;
        let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();

        let meal = client.lookup_meal_async("52977").await.unwrap().unwrap();
        assert_eq!(meal.name, "Corba");
        assert_eq!(meal.ingredients.len(), 1);
        assert_eq!(meal.ingredients[0].to_string(), "Lentils: 1 cup");

        assert!(client.lookup_meal_async("00000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out() {
        let app = Router::new().route("/api/json/v1/1/categories.php", get(slow));
        let base = spawn_catalog(app).await;
        let client = MealDbClient::new(&base, Duration::from_millis(200)).unwrap();

        let err = client.list_categories_async().await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[tokio::test]
    async fn test_error_status() {
        let app = Router::new().route(
            "/api/json/v1/1/categories.php",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = spawn_catalog(app).await;
        let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();

        let err = client.list_categories_async().await.unwrap_err();
        assert!(matches!(err, CatalogError::Status(503)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = Router::new().route(
            "/api/json/v1/1/categories.php",
            get(|| async { "<html>not json</html>" }),
        );
        let base = spawn_catalog(app).await;
        let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();

        let err = client.list_categories_async().await.unwrap_err();
        assert!(matches!(err, CatalogError::Decode(_)));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = MealDbClient::new("http://localhost/api/json/v1/1", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.base_url.join(LOOKUP_PATH).unwrap().as_str(),
            "http://localhost/api/json/v1/1/lookup.php"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(MealDbClient::new("not a url", DEFAULT_TIMEOUT).is_err());
    }

    #[tokio::test]
    async fn test_bookmark_survives_restart() {
        let base = spawn_catalog(catalog_routes()).await;
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("platter.db");

        {
            let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();
            let app = crate::App::open(&db_path, client).unwrap();
            let rows = app.meal_rows("Side").await.unwrap();
            assert!(app.toggle_favorite(&rows[0].meal, Some("Side")));
            app.settled().await;
        }

        let client = MealDbClient::new(&base, DEFAULT_TIMEOUT).unwrap();
        let app = crate::App::open(&db_path, client).unwrap();
        let rows = app.meal_rows("Side").await.unwrap();
        assert!(rows[0].favorite);
        let favorites = app.list_favorites();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].category_id.as_deref(), Some("Side"));
    }

    // --- Integration tests (hit real TheMealDB API) ---

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_live_lookup_corba() {
        let client = MealDbClient::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT).unwrap();
        let meal = client.lookup_meal_async("52977").await.unwrap();
        let meal = meal.expect("Corba should exist in TheMealDB");
        assert_eq!(meal.name, "Corba");
        assert!(!meal.ingredients.is_empty());
    }

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_live_categories() {
        let client = MealDbClient::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT).unwrap();
        let categories = client.list_categories_async().await.unwrap();
        assert!(categories.iter().any(|c| c.name == "Seafood"));
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::FavoriteMeal;

/// Bump whenever the `favorite_meals` layout changes. Databases carrying any
/// other non-zero version are reset, since the table only caches remote data.
pub const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version == SCHEMA_VERSION {
            return Ok(());
        }

        if version != 0 {
            tracing::warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "favorites schema mismatch, resetting cached favorites"
            );
            self.conn
                .execute_batch("DROP TABLE IF EXISTS favorite_meals;")?;
        }

        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS favorite_meals (
                meal_id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                thumbnail_url TEXT NOT NULL,
                category_id TEXT
            );

            PRAGMA user_version = {SCHEMA_VERSION};"
        ))?;

        Ok(())
    }

    fn favorite_from_row(row: &rusqlite::Row) -> rusqlite::Result<FavoriteMeal> {
        Ok(FavoriteMeal {
            meal_id: row.get("meal_id")?,
            name: row.get("name")?,
            thumbnail_url: row.get("thumbnail_url")?,
            category_id: row.get("category_id")?,
        })
    }

    /// Insert-or-ignore. Returns `true` when a row was actually added.
    pub fn insert_favorite(&self, meal: &FavoriteMeal) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO favorite_meals (meal_id, name, thumbnail_url, category_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![meal.meal_id, meal.name, meal.thumbnail_url, meal.category_id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_favorite(&self, meal_id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM favorite_meals WHERE meal_id = ?1",
            params![meal_id],
        )?;
        Ok(rows > 0)
    }

    /// Remove every favorite, returning how many rows were deleted.
    pub fn clear_favorites(&self) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM favorite_meals", [])?;
        Ok(rows)
    }

    pub fn get_favorite(&self, meal_id: &str) -> Result<Option<FavoriteMeal>> {
        let fav = self
            .conn
            .query_row(
                "SELECT meal_id, name, thumbnail_url, category_id
                 FROM favorite_meals WHERE meal_id = ?1",
                params![meal_id],
                Self::favorite_from_row,
            )
            .optional()?;
        Ok(fav)
    }

    /// Counter that moves whenever another connection commits to this file.
    pub fn data_version(&self) -> Result<i64> {
        let version = self
            .conn
            .pragma_query_value(None, "data_version", |row| row.get(0))?;
        Ok(version)
    }

    /// All favorites in bookmark order.
    pub fn list_favorites(&self) -> Result<Vec<FavoriteMeal>> {
        let mut stmt = self.conn.prepare(
            "SELECT meal_id, name, thumbnail_url, category_id
             FROM favorite_meals ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], Self::favorite_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

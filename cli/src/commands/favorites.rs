use std::process;

use anyhow::{Context, Result};
use serde::Serialize;

use platter_core::models::{FavoriteMeal, validate_key};
use platter_core::service::Bookmark;

use super::helpers::{json_error, print_favorites_table};
use crate::App;

#[derive(Serialize)]
struct FavoriteChange<'a> {
    meal_id: &'a str,
    favorite: bool,
    changed: bool,
    meal: &'a FavoriteMeal,
}

fn not_found(meal_id: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(&format!("Meal {meal_id} not found")));
    } else {
        eprintln!("Meal {meal_id} not found");
    }
    process::exit(2);
}

pub(crate) fn cmd_favorites_list(app: &App, json: bool) -> Result<()> {
    let favorites = app.list_favorites();

    if json {
        println!("{}", serde_json::to_string_pretty(&favorites)?);
    } else if favorites.is_empty() {
        println!("No favorites yet. Bookmark one with `platter favorites add <MEAL_ID>`.");
    } else {
        print_favorites_table(&favorites);
    }
    Ok(())
}

pub(crate) async fn cmd_favorites_add(
    app: &App,
    meal_id: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let meal_id = validate_key("Meal ID", meal_id)?;
    let category = category
        .map(|c| validate_key("Category", c))
        .transpose()?;

    let (stored, changed) = match app.bookmark(&meal_id, category.as_deref()).await? {
        Bookmark::Added(record) => {
            app.settled().await;
            // First write wins, so report what actually got stored
            let stored = app.favorites().get_settled(&meal_id).await.unwrap_or(record);
            (stored, true)
        }
        Bookmark::AlreadyPresent(existing) => (existing, false),
        Bookmark::UnknownMeal => not_found(&meal_id, json),
    };

    if json {
        let change = FavoriteChange {
            meal_id: &meal_id,
            favorite: true,
            changed,
            meal: &stored,
        };
        println!("{}", serde_json::to_string_pretty(&change)?);
    } else if changed {
        println!("Added {stored} to favorites!");
    } else {
        println!("{stored} is already in your favorites.");
    }
    Ok(())
}

pub(crate) async fn cmd_favorites_remove(app: &App, meal_id: &str, json: bool) -> Result<()> {
    let meal_id = validate_key("Meal ID", meal_id)?;
    let Some(existing) = app.favorites().get_settled(&meal_id).await else {
        not_found(&meal_id, json);
    };

    app.unbookmark(&meal_id);
    app.settled().await;

    if json {
        let change = FavoriteChange {
            meal_id: &meal_id,
            favorite: false,
            changed: true,
            meal: &existing,
        };
        println!("{}", serde_json::to_string_pretty(&change)?);
    } else {
        println!("Removed {existing} from favorites.");
    }
    Ok(())
}

pub(crate) async fn cmd_favorites_toggle(
    app: &App,
    meal_id: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let meal_id = validate_key("Meal ID", meal_id)?;
    if app.favorites().contains_settled(&meal_id).await {
        cmd_favorites_remove(app, &meal_id, json).await
    } else {
        cmd_favorites_add(app, &meal_id, category, json).await
    }
}

pub(crate) async fn cmd_favorites_clear(app: &App, json: bool) -> Result<()> {
    let removed = app.clear_favorites();
    app.settled().await;

    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else if removed == 0 {
        println!("No favorites to clear.");
    } else {
        println!("Cleared {removed} favorite(s).");
    }
    Ok(())
}

/// Print the favorites list every time it changes until Ctrl-C.
pub(crate) async fn cmd_favorites_watch(app: &App, json: bool) -> Result<()> {
    let subscription = app.favorites().observe(move |favorites| {
        if json {
            match serde_json::to_string(&favorites) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("failed to encode favorites: {e}"),
            }
        } else if favorites.is_empty() {
            println!("(no favorites)");
        } else {
            print_favorites_table(&favorites);
        }
    });

    if !json {
        eprintln!("Watching favorites. Press Ctrl-C to stop.");
    }
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::debug!(active = subscription.is_active(), "stopping favorites watch");
    drop(subscription);
    Ok(())
}

use std::process;

use anyhow::Result;
use serde::Serialize;

use platter_core::models::{MealDescription, validate_key};
use platter_core::service::Screen;

use super::helpers::{
    format_meal_description, json_error, print_category_table, print_meal_table,
};
use crate::App;

pub(crate) async fn cmd_categories(app: &App, json: bool) -> Result<()> {
    let mut screen = Screen::default();
    app.refresh_categories(&mut screen).await;
    if let Some(e) = screen.last_error.take() {
        return Err(e.into());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&screen.data)?);
    } else if screen.data.is_empty() {
        println!("No categories available.");
    } else {
        print_category_table(&screen.data);
    }
    Ok(())
}

pub(crate) async fn cmd_meals(app: &App, category: &str, json: bool) -> Result<()> {
    let category = validate_key("Category", category)?;
    let mut screen = Screen::default();
    app.refresh_meals(&category, &mut screen).await;
    if let Some(e) = screen.last_error.take() {
        return Err(e.into());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&screen.data)?);
    } else if screen.data.is_empty() {
        println!("No meals found in '{category}'.");
    } else {
        print_meal_table(&screen.data);
        let favorites = screen.data.iter().filter(|r| r.favorite).count();
        if favorites > 0 {
            println!("{favorites} of {} in your favorites.", screen.data.len());
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct MealDetail<'a> {
    #[serde(flatten)]
    meal: &'a MealDescription,
    favorite: bool,
}

pub(crate) async fn cmd_show(
    app: &App,
    meal_id: &str,
    category: Option<&str>,
    toggle: bool,
    json: bool,
) -> Result<()> {
    let meal_id = validate_key("Meal ID", meal_id)?;
    let category = category
        .map(|c| validate_key("Category", c))
        .transpose()?;

    let Some(meal) = app.meal_description(&meal_id).await? else {
        if json {
            println!("{}", json_error(&format!("Meal {meal_id} not found")));
        } else {
            eprintln!("Meal {meal_id} not found");
        }
        process::exit(2);
    };

    let favorite = if toggle {
        let now_favorite = app.toggle_description(&meal, category.as_deref());
        app.settled().await;
        if !json {
            if now_favorite {
                println!("Added {} to favorites!", meal.name);
            } else {
                println!("Removed {} from favorites.", meal.name);
            }
        }
        now_favorite
    } else {
        app.favorites().contains(&meal.id)
    };

    if json {
        let detail = MealDetail {
            meal: &meal,
            favorite,
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print!("{}", format_meal_description(&meal, favorite));
    }
    Ok(())
}

use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use platter_core::models::{Category, FavoriteMeal, MealDescription, MealRow};

pub(crate) const FAVORITE_MARK: &str = "♥";

pub(crate) fn print_category_table(categories: &[Category]) {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| CategoryRow {
            idx: i + 1,
            name: c.name.clone(),
            description: truncate(first_line(&c.description), 60),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn print_meal_table(rows: &[MealRow]) {
    #[derive(Tabled)]
    struct MealTableRow {
        #[tabled(rename = "")]
        favorite: &'static str,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Meal")]
        name: String,
    }

    let table_rows: Vec<MealTableRow> = rows
        .iter()
        .map(|r| MealTableRow {
            favorite: if r.favorite { FAVORITE_MARK } else { "" },
            id: r.meal.id.clone(),
            name: truncate(&r.meal.name, 50),
        })
        .collect();

    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_favorites_table(favorites: &[FavoriteMeal]) {
    #[derive(Tabled)]
    struct FavoriteRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Meal")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
    }

    let rows: Vec<FavoriteRow> = favorites
        .iter()
        .map(|f| FavoriteRow {
            id: f.meal_id.clone(),
            name: truncate(&f.name, 50),
            category: f.category_id.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Render a meal detail screen as plain text.
pub(crate) fn format_meal_description(meal: &MealDescription, favorite: bool) -> String {
    let mut out = String::new();
    let mark = if favorite { format!(" {FAVORITE_MARK}") } else { String::new() };
    out.push_str(&format!("{} ({}){mark}\n", meal.name, meal.id));

    let origin: Vec<&str> = [meal.category.as_deref(), meal.area.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !origin.is_empty() {
        out.push_str(&format!("{}\n", origin.join(" · ")));
    }
    if !meal.tags.is_empty() {
        out.push_str(&format!("Tags: {}\n", meal.tags.join(", ")));
    }

    if !meal.ingredients.is_empty() {
        out.push_str("\nIngredients:\n");
        for ingredient in &meal.ingredients {
            out.push_str(&format!("- {ingredient}\n"));
        }
    }

    if let Some(instructions) = &meal.instructions {
        out.push_str("\nInstructions:\n");
        out.push_str(instructions.trim());
        out.push('\n');
    }
    if let Some(video) = &meal.youtube_url {
        out.push_str(&format!("\nVideo: {video}\n"));
    }
    out
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

fn first_line(s: &str) -> &str {
    s.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

mod commands;
mod config;
mod mealdb;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    cmd_categories, cmd_favorites_add, cmd_favorites_clear, cmd_favorites_list,
    cmd_favorites_remove, cmd_favorites_toggle, cmd_favorites_watch, cmd_meals, cmd_show,
};
use crate::config::Config;
use crate::mealdb::MealDbClient;
use platter_core::service::PlatterService;

pub(crate) type App = PlatterService<MealDbClient>;

#[derive(Parser)]
#[command(
    name = "platter",
    version,
    about = "Browse TheMealDB recipes and keep your favorites",
    long_about = "\n\n  ┌─┐┬  ┌─┐┌┬┐┌┬┐┌─┐┬─┐
  ├─┘│  ├─┤ │  │ ├┤ ├┬┘
  ┴  ┴─┘┴ ┴ ┴  ┴ └─┘┴└─
     what's for dinner?
"
)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List meal categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the meals of a category
    Meals {
        /// Category name (e.g. "Seafood")
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a meal's ingredients and instructions
    Show {
        /// Meal ID
        meal_id: String,
        /// Category you are browsing, recorded if the meal gets bookmarked
        #[arg(short, long)]
        category: Option<String>,
        /// Flip the meal's favorite state
        #[arg(long)]
        toggle: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage bookmarked meals
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
}

#[derive(Subcommand)]
enum FavoritesCommands {
    /// List bookmarked meals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Bookmark a meal by ID
    Add {
        /// Meal ID
        meal_id: String,
        /// Category to file the bookmark under
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a bookmark
    Remove {
        /// Meal ID
        meal_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Bookmark a meal, or remove it if already bookmarked
    Toggle {
        /// Meal ID
        meal_id: String,
        /// Category to file the bookmark under
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every bookmark
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the favorites list whenever it changes
    Watch {
        /// Output one JSON array per change
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "platter=debug,platter_core=debug"
    } else {
        "platter=warn,platter_core=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(data_dir = %config.data_dir.display(), "starting");
    let catalog = MealDbClient::new(&config.api_base, config.timeout)?;
    let app = App::open(&config.db_path, catalog)?;

    match cli.command {
        Commands::Categories { json } => cmd_categories(&app, json).await,
        Commands::Meals { category, json } => cmd_meals(&app, &category, json).await,
        Commands::Show {
            meal_id,
            category,
            toggle,
            json,
        } => cmd_show(&app, &meal_id, category.as_deref(), toggle, json).await,
        Commands::Favorites { command } => match command {
            FavoritesCommands::List { json } => cmd_favorites_list(&app, json),
            FavoritesCommands::Add {
                meal_id,
                category,
                json,
            } => cmd_favorites_add(&app, &meal_id, category.as_deref(), json).await,
            FavoritesCommands::Remove { meal_id, json } => {
                cmd_favorites_remove(&app, &meal_id, json).await
            }
            FavoritesCommands::Toggle {
                meal_id,
                category,
                json,
            } => cmd_favorites_toggle(&app, &meal_id, category.as_deref(), json).await,
            FavoritesCommands::Clear { json } => cmd_favorites_clear(&app, json).await,
            FavoritesCommands::Watch { json } => cmd_favorites_watch(&app, json).await,
        },
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;

use platter_core::mealdb::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub api_base: String,
    pub timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "platter").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Self::resolve(data_dir, |key| std::env::var(key).ok())
    }

    /// Apply `PLATTER_*` overrides from `var` on top of the defaults.
    fn resolve(data_dir: PathBuf, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = var("PLATTER_DB")
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| data_dir.join("platter.db"), PathBuf::from);

        let api_base = var("PLATTER_API_BASE")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match var("PLATTER_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT,
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid PLATTER_TIMEOUT_SECS: '{raw}'"))?;
                if secs == 0 {
                    bail!("PLATTER_TIMEOUT_SECS must be greater than 0");
                }
                Duration::from_secs(secs)
            }
        };

        tracing::debug!(db = %db_path.display(), %api_base, ?timeout, "config resolved");

        Ok(Config {
            db_path,
            data_dir,
            api_base,
            timeout,
        })
    }
}

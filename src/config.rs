//! Scheduler parameters and storage location.
//!
//! Values are resolved with priority: config.toml > .env / environment > default.
//! A value that is present but out of range is ignored with a warning.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ==================== Defaults ====================

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "config.toml";

/// Default SQLite location when nothing else is configured
pub const DEFAULT_DATABASE_PATH: &str = "data/legendas.db";

/// Target probability of recall at the moment a card becomes due
pub const DEFAULT_DESIRED_RETENTION: f64 = 0.9;

/// Interval (days) a Learning/Relearning card must reach to enter Review
pub const DEFAULT_GRADUATION_DAYS: f64 = 1.0;

/// Stability never drops below this, even after a lapse
pub const DEFAULT_STABILITY_FLOOR: f64 = 0.4;

/// Upper bound on any scheduled interval (~100 years)
pub const DEFAULT_MAXIMUM_INTERVAL_DAYS: f64 = 36500.0;

// ==================== Progress thresholds ====================

/// Stability at which a Review card counts as learned
pub const LEARNED_MIN_STABILITY: f64 = 2.0;

/// Reviews needed before a card counts as learned
pub const LEARNED_MIN_REPS: u32 = 3;

// ==================== Scheduler configuration ====================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
  pub desired_retention: f64,
  pub graduation_days: f64,
  pub stability_floor: f64,
  pub maximum_interval_days: f64,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      desired_retention: DEFAULT_DESIRED_RETENTION,
      graduation_days: DEFAULT_GRADUATION_DAYS,
      stability_floor: DEFAULT_STABILITY_FLOOR,
      maximum_interval_days: DEFAULT_MAXIMUM_INTERVAL_DAYS,
    }
  }
}

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
  database: Option<DatabaseConfig>,
  scheduler: Option<SchedulerSection>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
  path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerSection {
  desired_retention: Option<f64>,
  graduation_days: Option<f64>,
  stability_floor: Option<f64>,
  maximum_interval_days: Option<f64>,
}

fn read_app_config(path: &Path) -> AppConfig {
  let Ok(contents) = std::fs::read_to_string(path) else {
    return AppConfig::default();
  };
  match toml::from_str::<AppConfig>(&contents) {
    Ok(config) => config,
    Err(e) => {
      tracing::warn!("Ignoring unparseable {}: {}", path.display(), e);
      AppConfig::default()
    }
  }
}

/// Keep `value` if `valid` accepts it, otherwise warn and keep `current`.
fn accept(name: &str, value: Option<f64>, current: f64, valid: impl Fn(f64) -> bool) -> f64 {
  match value {
    Some(v) if v.is_finite() && valid(v) => v,
    Some(v) => {
      tracing::warn!("Ignoring out-of-range {} = {}, keeping {}", name, v, current);
      current
    }
    None => current,
  }
}

impl SchedulerConfig {
  /// Load from `config.toml` in the working directory, then the environment.
  pub fn load() -> Self {
    Self::load_from(Path::new(CONFIG_FILE))
  }

  pub fn load_from(path: &Path) -> Self {
    let _ = dotenvy::dotenv();
    let section = read_app_config(path).scheduler;
    let env_retention = std::env::var("LEGENDAS_DESIRED_RETENTION").ok();
    Self::resolve(section, env_retention.as_deref())
  }

  /// Parse a `[scheduler]` table out of config text; used by `load_from` and tests.
  pub fn from_toml_str(contents: &str) -> Self {
    let section = match toml::from_str::<AppConfig>(contents) {
      Ok(config) => config.scheduler,
      Err(e) => {
        tracing::warn!("Ignoring unparseable scheduler config: {}", e);
        None
      }
    };
    Self::resolve(section, None)
  }

  fn resolve(section: Option<SchedulerSection>, env_retention: Option<&str>) -> Self {
    let defaults = Self::default();
    let section = section.unwrap_or_default();

    // config.toml wins over the environment for retention
    let retention = section.desired_retention.or_else(|| {
      env_retention.and_then(|raw| match raw.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
          tracing::warn!("Ignoring non-numeric LEGENDAS_DESIRED_RETENTION={}", raw);
          None
        }
      })
    });

    let config = Self {
      desired_retention: accept("desired_retention", retention, defaults.desired_retention, |v| {
        v > 0.0 && v < 1.0
      }),
      graduation_days: accept(
        "graduation_days",
        section.graduation_days,
        defaults.graduation_days,
        |v| v > 0.0,
      ),
      stability_floor: accept(
        "stability_floor",
        section.stability_floor,
        defaults.stability_floor,
        |v| v >= 0.0,
      ),
      maximum_interval_days: accept(
        "maximum_interval_days",
        section.maximum_interval_days,
        defaults.maximum_interval_days,
        |v| v >= 1.0,
      ),
    };
    tracing::info!(
      "Scheduler config: retention={}, graduation_days={}, stability_floor={}, max_interval={}",
      config.desired_retention,
      config.graduation_days,
      config.stability_floor,
      config.maximum_interval_days
    );
    config
  }
}

// ==================== Database Configuration ====================

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
  load_database_path_from(Path::new(CONFIG_FILE))
}

pub fn load_database_path_from(config_file: &Path) -> PathBuf {
  let _ = dotenvy::dotenv();
  let file_path = read_app_config(config_file).database.and_then(|db| db.path);
  let env_path = std::env::var("DATABASE_PATH").ok();
  resolve_database_path(file_path, env_path)
}

fn resolve_database_path(file_path: Option<String>, env_path: Option<String>) -> PathBuf {
  // Priority 1: config.toml
  if let Some(path) = file_path {
    tracing::info!("Using database from config.toml: {}", path);
    return PathBuf::from(path);
  }

  // Priority 2: .env DATABASE_PATH
  if let Some(path) = env_path {
    tracing::info!("Using database from DATABASE_PATH env: {}", path);
    return PathBuf::from(path);
  }

  let default = PathBuf::from(DEFAULT_DATABASE_PATH);
  tracing::info!("Using default database path: {}", default.display());
  default
}

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::PathBuf;

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool
pub struct AppState {
  pub db: DbPool,
}

/// Get the path to the database file.
/// Controlled by DATA_DIR; defaults to ./data relative to the process.
fn get_db_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
  let data_dir =
    PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

  // Create directory if it doesn't exist
  fs::create_dir_all(&data_dir)?;

  Ok(data_dir.join("periods.db"))
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db() -> Result<DbPool, Box<dyn std::error::Error>> {
  let db_path = get_db_path()?;
  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  tracing::info!("Initializing database at: {}", db_path.display());

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}

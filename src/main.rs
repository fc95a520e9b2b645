use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use cycle_log::db::{self, AppState};
use cycle_log::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cycle_log=info")),
    )
    .with_target(false)
    .init();

  let pool = db::initialize_db().await?;
  let state = Arc::new(AppState { db: pool });

  let app = routes::build_router(state);

  let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
  let port = std::env::var("PORT").unwrap_or_else(|_| "3002".to_string());
  let addr = format!("{}:{}", host, port);

  let listener = tokio::net::TcpListener::bind(&addr).await?;
  info!("Listening on http://{}", addr);
  axum::serve(listener, app).await?;

  Ok(())
}

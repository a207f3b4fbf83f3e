mod render;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use habit_core::{HabitService, Router};
use habit_db::Database;

use crate::routes::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "habit_bot=debug,habit_core=debug,habit_db=info,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let db_path = std::env::var("HABIT_DB_PATH").unwrap_or_else(|_| "habits.db".into());
    let host = std::env::var("HABIT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HABIT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let router = Router::new(HabitService::new(db));
    let app = routes::app(Arc::new(AppStateInner { router }));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Habit bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

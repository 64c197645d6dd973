use anyhow::Result;
use sqlx::SqlitePool;
use crate::config::Config;
use std::str::FromStr;

pub mod models;

pub type DbPool = SqlitePool;

pub async fn init(cfg: &Config) -> Result<DbPool> {
    let db_url = format!("sqlite://{}?mode=rwc", cfg.database.path);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::from_str(&db_url)?
                .create_if_missing(true)
        )
        .await?;

    migrate(&pool).await?;

    // Reads on every request, writes only from the admin CLI.
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(&pool)
        .await?;

    tracing::info!("Database connected: {}", cfg.database.path);
    Ok(pool)
}

/// Apply the embedded migrations to `pool`.
pub async fn migrate(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./src/db/migrations").run(pool).await?;
    Ok(())
}

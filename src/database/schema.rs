//! Database schema and migrations
//!
//! Versioned migrations embedded at compile time and applied on
//! startup. SQLite runs in WAL mode for crash safety.

use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize database with schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing database schema");

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    tracing::info!("Current database version: {}", current_version);

    apply_migrations(pool, current_version, &get_migrations()).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

/// Apply every migration above `current_version`, each in its own
/// transaction.
///
/// Migration scripts run through `raw_sql`, which executes the whole
/// file statement by statement inside SQLite itself. Scripts may
/// therefore contain semicolons inside trigger bodies or string
/// literals without any splitting heuristics mangling them.
async fn apply_migrations(
    pool: &SqlitePool,
    current_version: i32,
    migrations: &[(i32, &str)],
) -> Result<()> {
    for &(version, sql) in migrations {
        if version > current_version {
            tracing::info!("Applying migration version {}", version);

            let mut tx = pool.begin().await?;

            sqlx::raw_sql(sql).execute(&mut *tx).await?;

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![(1, include_str!("migrations/001_initial_schema.sql"))]
}

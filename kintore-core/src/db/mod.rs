pub mod models;
pub mod operations;

use std::time::Duration;

use anyhow::Result;
use log::{debug, info};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};

struct Migration {
    name: &'static str,
    up_sql: &'static str,
}

const MIGRATION_2025_08_06_090000_0000_SETUP_TABLES: &str =
    include_str!("../../../migrations/2025-08-06-090000-0000_setup_tables/up.sql");

const MIGRATIONS: &[Migration] = &[Migration {
    name: "2025-08-06-090000-0000_setup_tables",
    up_sql: MIGRATION_2025_08_06_090000_0000_SETUP_TABLES,
}];

/// Open (or create) the SQLite database at `path` and apply pending migrations.
pub async fn connect(path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;
    init_database(&pool).await?;
    Ok(pool)
}

async fn init_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER NOT NULL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER))
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn is_migration_applied(pool: &SqlitePool, migration_name: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE name = ?1")
        .bind(migration_name)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

async fn mark_migration_applied(pool: &SqlitePool, migration_name: &str) -> Result<()> {
    sqlx::query("INSERT INTO _migrations (name) VALUES (?1)")
        .bind(migration_name)
        .execute(pool)
        .await?;
    Ok(())
}

fn parse_sql_statements(sql: &str) -> Vec<String> {
    sql.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("--")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn init_database(pool: &SqlitePool) -> Result<()> {
    init_migrations_table(pool).await?;

    for migration in MIGRATIONS {
        if is_migration_applied(pool, migration.name).await? {
            debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        info!("Applying migration: {}", migration.name);
        for statement in parse_sql_statements(migration.up_sql) {
            sqlx::query(&statement).execute(pool).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to execute migration statement in {}: {} - Error: {}",
                    migration.name,
                    statement,
                    e
                )
            })?;
        }

        mark_migration_applied(pool, migration.name).await?;
        info!("Migration {} applied successfully", migration.name);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    init_database(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_parsing_drops_comments_and_blanks() {
        let sql = "-- comment\nCREATE TABLE a (id INTEGER);\n\nCREATE TABLE b (id INTEGER);\n";
        let statements = parse_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
    }

    #[tokio::test]
    async fn init_database_is_idempotent() {
        let pool = test_pool().await;
        init_database(&pool).await.unwrap();

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
             ('workout_sessions', 'session_exercises', 'session_sets')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 3);
    }
}

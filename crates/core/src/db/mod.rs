pub mod memory;
pub mod repository;
pub mod sqlite;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

pub enum DatabasePool {
    Sqlite(SqlitePool),
}

impl DatabasePool {
    /// Create a new SQLite database pool from a connection string and run migrations.
    pub async fn new_sqlite(path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(path).await?;
        Self::run_migrations(&pool).await?;
        Ok(DatabasePool::Sqlite(pool))
    }

    /// Create a new in-memory SQLite database pool and run migrations. Useful for testing.
    pub async fn new_sqlite_memory() -> Result<Self> {
        let pool = SqlitePool::connect(":memory:").await?;
        Self::run_migrations(&pool).await?;
        Ok(DatabasePool::Sqlite(pool))
    }

    /// Open the database file at `path`, creating it if needed.
    pub async fn open_file(path: &str) -> Result<Self> {
        Self::new_sqlite(&format!("sqlite:{path}?mode=rwc")).await
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        let migrations: &[&str] = &[
            include_str!("../../../../migrations/sqlite/001_initial_schema.sql"),
            include_str!("../../../../migrations/sqlite/002_sync_runs.sql"),
        ];

        let mut statements = 0;
        for migration_sql in migrations {
            for statement in migration_sql.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() {
                    sqlx::query(trimmed).execute(pool).await?;
                    statements += 1;
                }
            }
        }
        debug!(statements, "database migrations applied");
        Ok(())
    }
}

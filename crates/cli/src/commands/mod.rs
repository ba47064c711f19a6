pub mod check;
pub mod init;
pub mod status;
pub mod sync;
pub mod test_connection;

use std::path::Path;

use dirsync_core::config::DirSyncConfig;
use dirsync_core::db::sqlite::SqliteRepository;
use dirsync_core::db::DatabasePool;
use tracing::info;

/// Load and validate the configuration file.
pub fn load_config(config_path: &str) -> anyhow::Result<DirSyncConfig> {
    let config = DirSyncConfig::load(Path::new(config_path))?;
    config.validate()?;
    info!("Loaded configuration from {}", config_path);
    Ok(config)
}

/// Open (and migrate) the configured SQLite database.
pub async fn open_repository(config: &DirSyncConfig) -> anyhow::Result<SqliteRepository> {
    let DatabasePool::Sqlite(pool) = DatabasePool::open_file(&config.dirsync.database.path).await?;
    info!("Connected to database {}", config.dirsync.database.path);
    Ok(SqliteRepository::new(pool))
}

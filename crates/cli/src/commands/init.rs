use std::path::Path;

use dirsync_core::config::DirSyncConfig;
use dirsync_core::db::DatabasePool;
use tracing::info;

/// Run the `init` command: write a default configuration next to a fresh
/// database.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        anyhow::bail!("{config_path} already exists, refusing to overwrite it");
    }

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
        info!("Created directory: {}", dir.display());
    }

    let db_path = dir.join("dirsync.db").to_string_lossy().to_string();
    let mut config = DirSyncConfig::generate_default();
    config.dirsync.database.path = db_path.clone();

    std::fs::write(path, config.to_toml()?)?;
    info!("Wrote configuration to {}", path.display());

    DatabasePool::open_file(&db_path).await?;
    info!("Database initialized at {}", db_path);

    println!("dirsync initialized successfully!");
    println!("  Configuration: {}", path.display());
    println!("  Database:      {}", db_path);
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} to point at your directory server",
        path.display()
    );
    println!("  2. Run `dirsync check` to validate the mapping");
    println!("  3. Run `dirsync test-connection --configuration 1`");
    println!("  4. Run `dirsync sync --dry-run` to preview the first import");

    Ok(())
}

use dirsync_core::db::repository::SyncRunRepository;
use dirsync_core::db::sqlite::SqliteRepository;
use dirsync_core::models::common::Context;
use dirsync_core::models::user::LocalUser;

/// Run the `status` command: show recent runs and local user counts.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let repo = super::open_repository(&config).await?;

    let db_path = &config.dirsync.database.path;
    let db_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());

    println!("dirsync Status");
    println!("==============");
    println!("Instance:       {}", config.dirsync.instance_name);
    println!("Database:       {} ({})", db_path, db_size);
    println!("Configurations: {}", config.configurations.len());
    println!();

    match repo.get_latest_sync_run().await? {
        Some(run) => {
            println!("Last Sync");
            println!("---------");
            println!("ID:        {}", run.id);
            println!("Status:    {:?}", run.status);
            println!(
                "Started:   {}",
                run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if let Some(completed) = run.completed_at {
                println!("Completed: {}", completed.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!("Pairs:     {}", run.pairs);
            println!("Failures:  {}", run.failures);
            println!("Dry run:   {}", run.dry_run);
            if let Some(ref details) = run.error_details {
                println!("Errors:");
                for line in details.lines() {
                    println!("  {line}");
                }
            }
            println!();
        }
        None => {
            println!("No sync runs recorded.");
            println!();
        }
    }

    let recent = repo.list_sync_runs(5).await?;
    if recent.len() > 1 {
        println!("Recent Runs");
        println!("-----------");
        for run in &recent {
            println!(
                "{}  {:<9}  failures={}{}",
                run.started_at.format("%Y-%m-%d %H:%M"),
                format!("{:?}", run.status),
                run.failures,
                if run.dry_run { "  (dry run)" } else { "" }
            );
        }
        println!();
    }

    println!("Local Users");
    println!("-----------");
    for context in [Context::Fe, Context::Be] {
        let counts = UserCounts::load(&repo, context).await?;
        println!(
            "{context}: total={} linked={} active={} disabled={} deleted={}",
            counts.total, counts.linked, counts.active, counts.disabled, counts.deleted
        );
    }

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct UserCounts {
    total: usize,
    linked: usize,
    active: usize,
    disabled: usize,
    deleted: usize,
}

impl UserCounts {
    async fn load(repo: &SqliteRepository, context: Context) -> anyhow::Result<Self> {
        Ok(Self::from_users(&repo.list_users(context).await?))
    }

    fn from_users(users: &[LocalUser]) -> Self {
        Self {
            total: users.len(),
            linked: users.iter().filter(|u| u.is_directory_linked()).count(),
            active: users.iter().filter(|u| u.is_active()).count(),
            disabled: users.iter().filter(|u| u.disabled).count(),
            deleted: users.iter().filter(|u| u.deleted).count(),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_displays_correctly() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1073741824), "1.0 GB");
    }

    #[test]
    fn user_counts_by_flag() {
        let users = vec![
            LocalUser::default(),
            LocalUser {
                dn: Some("cn=a".into()),
                disabled: true,
                ..Default::default()
            },
            LocalUser {
                dn: Some("cn=b".into()),
                deleted: true,
                ..Default::default()
            },
        ];
        assert_eq!(
            UserCounts::from_users(&users),
            UserCounts {
                total: 3,
                linked: 2,
                active: 1,
                disabled: 1,
                deleted: 1,
            }
        );
    }

    #[tokio::test]
    async fn status_requires_config_file() {
        assert!(run("/nonexistent/dirsync.toml").await.is_err());
    }
}

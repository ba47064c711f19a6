use std::time::{Duration, Instant};

use dirsync_core::config::FileConfigurationStore;
use dirsync_core::db::repository::{ConfigurationStore, SyncRunRepository, UserRepository};
use dirsync_core::error::SyncError;
use dirsync_core::models::sync::{RunSummary, SyncRunStatus};
use dirsync_ldap_sync::client::{DirectoryClient, LdapDirectoryClient};
use dirsync_ldap_sync::task::SyncTask;
use tracing::{error, info, warn};

use crate::SyncArgs;

/// Run the `sync` command: import users from every selected directory.
pub async fn run(config_path: &str, args: &SyncArgs) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    for warning in config.warnings() {
        warn!(
            configuration = warning.configuration_uid,
            context = %warning.context,
            "{}",
            warning.message
        );
    }

    let repo = super::open_repository(&config).await?;

    let mut task = SyncTask::new(
        FileConfigurationStore::from(&config),
        repo.clone(),
        LdapDirectoryClient::new(),
    )
    .with_task_config(&config.task);
    apply_overrides(&mut task, args);

    let run = repo.create_sync_run(task.dry_run()).await?;
    info!(run_id = %run.id, dry_run = task.dry_run(), "starting sync");
    println!("{}", task.additional_information().await?);
    let start = Instant::now();

    match task.run().await {
        Ok(summary) => {
            let status = if summary.failures == 0 {
                SyncRunStatus::Completed
            } else {
                SyncRunStatus::Failed
            };
            repo.finish_sync_run(
                &run.id,
                status,
                summary.pairs.len() as i64,
                i64::from(summary.failures),
                summary.error_details().as_deref(),
            )
            .await?;
            print_summary(&summary, start.elapsed());

            if summary.failures > 0 {
                let err = SyncError::AggregateSyncFailure {
                    failures: summary.failures,
                };
                error!(run_id = %run.id, code = ?err.code(), "Sync failed: {err}");
                return Err(err.into());
            }
        }
        Err(e) => {
            repo.finish_sync_run(&run.id, SyncRunStatus::Failed, 0, 0, Some(&e.to_string()))
                .await?;
            error!(run_id = %run.id, "Sync failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Command-line flags win over the `[task]` section.
fn apply_overrides<C, R, D>(task: &mut SyncTask<C, R, D>, args: &SyncArgs)
where
    C: ConfigurationStore,
    R: UserRepository,
    D: DirectoryClient,
{
    if let Some(context) = args.context {
        task.set_context(context);
    }
    if let Some(configuration) = args.configuration {
        task.set_configuration(configuration);
    }
    if let Some(policy) = args.missing_users {
        task.set_missing_users(policy);
    }
    if let Some(policy) = args.restored_users {
        task.set_restored_users(policy);
    }
    if args.allow_empty {
        task.set_allow_empty_directory(true);
    }
    task.set_dry_run(args.dry_run);
}

fn print_summary(summary: &RunSummary, elapsed: Duration) {
    let outcome = match (summary.failures, summary.dry_run) {
        (0, true) => "preview finished (rolled back)",
        (0, false) => "completed",
        _ => "aborted (rolled back)",
    };
    println!("Sync {outcome} in {:.1}s", elapsed.as_secs_f64());
    for pair in &summary.pairs {
        println!(
            "  [{}] {} ({}):",
            pair.context, pair.configuration_name, pair.configuration_uid
        );
        match &pair.failure {
            Some(failure) => println!("    Failed:   {failure}"),
            None => {
                println!("    Fetched:  {}", pair.fetched);
                println!("    Created:  {}", pair.created);
                println!("    Updated:  {}", pair.updated);
                println!("    Restored: {}", pair.restored);
                println!("    Disabled: {}", pair.disabled);
                println!("    Deleted:  {}", pair.deleted);
            }
        }
    }
    if summary.pairs.is_empty() {
        println!("  No configuration matched the selection.");
    }
}

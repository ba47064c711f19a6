//! The scheduled import task: every selected (configuration, context) pair in
//! one all-or-nothing transaction.

use tracing::{error, info, warn};

use dirsync_core::config::{Configuration, TaskConfig};
use dirsync_core::db::repository::{ConfigurationStore, LocalUserStore, UserRepository};
use dirsync_core::error::{Result, SyncError};
use dirsync_core::models::common::{
    ConfigurationSelector, Context, ContextSelection, MissingUsersPolicy, RestoredUsersPolicy,
};
use dirsync_core::models::sync::{PairFailure, PairReport, RunSummary};

use crate::client::DirectoryClient;
use crate::messages::{EnglishMessages, MessageCatalog};
use crate::observer::SyncObserver;
use crate::sync::{SyncEngine, SyncOptions};

/// Imports directory users for the selected configurations and contexts.
///
/// Pairs run one after another, configuration first, then `fe` before `be`.
/// Changes are committed only when every pair succeeded.
pub struct SyncTask<C, R, D> {
    configurations: C,
    repository: R,
    directory: D,
    context: ContextSelection,
    configuration: ConfigurationSelector,
    missing_users: MissingUsersPolicy,
    restored_users: RestoredUsersPolicy,
    allow_empty_directory: bool,
    dry_run: bool,
    messages: Box<dyn MessageCatalog>,
    observer: Option<Box<dyn SyncObserver>>,
}

impl<C, R, D> SyncTask<C, R, D>
where
    C: ConfigurationStore,
    R: UserRepository,
    D: DirectoryClient,
{
    pub fn new(configurations: C, repository: R, directory: D) -> Self {
        Self {
            configurations,
            repository,
            directory,
            context: ContextSelection::default(),
            configuration: ConfigurationSelector::default(),
            missing_users: MissingUsersPolicy::default(),
            restored_users: RestoredUsersPolicy::default(),
            allow_empty_directory: false,
            dry_run: false,
            messages: Box::new(EnglishMessages),
            observer: None,
        }
    }

    /// Take every task parameter from the `[task]` config section.
    pub fn with_task_config(mut self, task: &TaskConfig) -> Self {
        self.context = task.context;
        self.configuration = task.configuration;
        self.missing_users = task.missing_users;
        self.restored_users = task.restored_users;
        self.allow_empty_directory = task.allow_empty_directory;
        self
    }

    pub fn with_messages(mut self, messages: Box<dyn MessageCatalog>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn context(&self) -> ContextSelection {
        self.context
    }

    pub fn set_context(&mut self, context: ContextSelection) {
        self.context = context;
    }

    pub fn configuration(&self) -> ConfigurationSelector {
        self.configuration
    }

    pub fn set_configuration(&mut self, configuration: ConfigurationSelector) {
        self.configuration = configuration;
    }

    pub fn missing_users(&self) -> MissingUsersPolicy {
        self.missing_users
    }

    pub fn set_missing_users(&mut self, policy: MissingUsersPolicy) {
        self.missing_users = policy;
    }

    pub fn restored_users(&self) -> RestoredUsersPolicy {
        self.restored_users
    }

    pub fn set_restored_users(&mut self, policy: RestoredUsersPolicy) {
        self.restored_users = policy;
    }

    pub fn allow_empty_directory(&self) -> bool {
        self.allow_empty_directory
    }

    pub fn set_allow_empty_directory(&mut self, allow: bool) {
        self.allow_empty_directory = allow;
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// A dry run does all the work and then always rolls back.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Run the task. `Ok(true)` when every pair succeeded; otherwise all
    /// changes are rolled back and [`SyncError::AggregateSyncFailure`] is
    /// returned.
    pub async fn execute(&mut self) -> Result<bool> {
        let summary = self.run().await?;
        if summary.failures > 0 {
            error!(failures = summary.failures, "synchronization aborted");
            return Err(SyncError::AggregateSyncFailure {
                failures: summary.failures,
            });
        }
        Ok(true)
    }

    /// Run the task and report per pair. Only transaction errors are
    /// returned as `Err`; pair failures are counted in the summary.
    pub async fn run(&mut self) -> Result<RunSummary> {
        // 1. Expand the selection
        let configurations = self.selected_configurations().await?;
        let contexts = self.context.contexts();
        let options = SyncOptions {
            missing_users: self.missing_users,
            restored_users: self.restored_users,
            allow_empty_directory: self.allow_empty_directory,
        };

        info!(
            configurations = configurations.len(),
            context = %self.context,
            missing_users = %self.missing_users,
            restored_users = %self.restored_users,
            dry_run = self.dry_run,
            "starting directory import"
        );

        // 2. Run every pair inside one transaction
        let mut tx = self.repository.begin().await?;
        let mut summary = RunSummary {
            dry_run: self.dry_run,
            ..Default::default()
        };
        for configuration in &configurations {
            for &context in contexts {
                let report = self
                    .run_pair(configuration, context, &mut *tx, &options)
                    .await;
                if let Some(failure) = &report.failure {
                    summary.failures += 1;
                    warn!(
                        configuration = configuration.uid,
                        context = %context,
                        error = %failure,
                        "pair failed"
                    );
                }
                if let Some(observer) = &self.observer {
                    observer.pair_finished(&report);
                }
                summary.pairs.push(report);
            }
        }

        // 3. All or nothing
        if summary.failures > 0 || self.dry_run {
            tx.rollback().await?;
            info!(
                failures = summary.failures,
                dry_run = self.dry_run,
                "directory import rolled back"
            );
        } else {
            tx.commit().await?;
            summary.committed = true;
            info!(pairs = summary.pairs.len(), "directory import committed");
        }

        if let Some(observer) = &self.observer {
            observer.run_finished(&summary);
        }
        Ok(summary)
    }

    /// Short description of the task parameters for listings.
    pub async fn additional_information(&self) -> Result<String> {
        let name = match self.configuration {
            ConfigurationSelector::All => self.messages.all_configurations(),
            ConfigurationSelector::Uid(uid) => self
                .configurations
                .fetch_by_uid(uid)
                .await?
                .map(|c| c.name)
                .unwrap_or_default(),
        };
        Ok(self.messages.additional_information(self.context, &name))
    }

    async fn selected_configurations(&self) -> Result<Vec<Configuration>> {
        match self.configuration {
            ConfigurationSelector::All => self.configurations.fetch_all().await,
            ConfigurationSelector::Uid(uid) => {
                let found = self.configurations.fetch_by_uid(uid).await?;
                if found.is_none() {
                    warn!(configuration = uid, "selected configuration does not exist");
                }
                Ok(found.into_iter().collect())
            }
        }
    }

    async fn run_pair<S>(
        &mut self,
        configuration: &Configuration,
        context: Context,
        store: &mut S,
        options: &SyncOptions,
    ) -> PairReport
    where
        S: LocalUserStore + ?Sized,
    {
        let mut report = PairReport::new(configuration.uid, &configuration.name, context);

        let engine = match SyncEngine::new(configuration, context) {
            Ok(engine) => engine,
            Err(e) => {
                report.failure = Some(pair_failure(e));
                return report;
            }
        };

        let result = match self.directory.connect(configuration).await {
            Ok(()) => {
                engine
                    .run(&mut self.directory, store, options, &mut report)
                    .await
            }
            Err(e) => Err(e),
        };
        self.directory.disconnect().await;

        if let Err(e) = result {
            report.failure = Some(pair_failure(e));
        }
        report
    }
}

fn pair_failure(error: SyncError) -> PairFailure {
    match error {
        SyncError::DirectoryUnavailable(msg) => PairFailure::DirectoryUnavailable(msg),
        SyncError::EmptyDirectoryResult { .. } => PairFailure::EmptyDirectoryResult,
        SyncError::ContextNotConfigured { .. } => PairFailure::ContextNotConfigured,
        other => PairFailure::Store(other.to_string()),
    }
}

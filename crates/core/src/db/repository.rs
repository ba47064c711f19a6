use async_trait::async_trait;

use crate::config::Configuration;
use crate::error::Result;
use crate::models::{
    common::Context,
    sync::{SyncRun, SyncRunStatus},
    user::{LocalUser, MergedUser},
};

/// Source of directory configurations.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Configuration>>;
    async fn fetch_by_uid(&self, uid: u32) -> Result<Option<Configuration>>;
}

/// Local user tables, reached through a transaction.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Open a transaction. Dropping it without [`UserTransaction::commit`]
    /// discards every change made through it.
    async fn begin(&self) -> Result<Box<dyn UserTransaction>>;
}

/// Reads and writes against the local user tables inside one transaction.
#[async_trait]
pub trait LocalUserStore: Send {
    /// Find the user linked to `dn`. Active rows are preferred over deleted ones.
    async fn find_by_dn(&mut self, dn: &str, context: Context) -> Result<Option<LocalUser>>;

    /// All users in `context` imported by the given configuration.
    async fn list_linked(
        &mut self,
        configuration_uid: u32,
        context: Context,
    ) -> Result<Vec<LocalUser>>;

    /// Create the user when `merged.uid` is `None`, otherwise overwrite its
    /// fields, DN and configuration link in place. Status flags are only
    /// written on creation (enabled, not deleted).
    async fn upsert(
        &mut self,
        merged: &MergedUser,
        configuration_uid: u32,
        context: Context,
    ) -> Result<LocalUser>;

    async fn disable(&mut self, user: &LocalUser, context: Context) -> Result<()>;
    async fn soft_delete(&mut self, user: &LocalUser, context: Context) -> Result<()>;
    async fn enable(&mut self, user: &LocalUser, context: Context) -> Result<()>;
    async fn undelete(&mut self, user: &LocalUser, context: Context) -> Result<()>;
}

#[async_trait]
pub trait UserTransaction: LocalUserStore {
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Log of sync runs, written outside the sync transaction.
#[async_trait]
pub trait SyncRunRepository: Send + Sync {
    async fn create_sync_run(&self, dry_run: bool) -> Result<SyncRun>;
    async fn finish_sync_run(
        &self,
        id: &str,
        status: SyncRunStatus,
        pairs: i64,
        failures: i64,
        error_details: Option<&str>,
    ) -> Result<()>;
    async fn get_sync_run(&self, id: &str) -> Result<Option<SyncRun>>;
    async fn get_latest_sync_run(&self) -> Result<Option<SyncRun>>;
    async fn list_sync_runs(&self, limit: i64) -> Result<Vec<SyncRun>>;
}

//! Sync engine for one (configuration, context) pair.

use std::collections::HashSet;

use tracing::{debug, info};

use dirsync_core::config::{Configuration, ContextSettings};
use dirsync_core::db::repository::LocalUserStore;
use dirsync_core::error::{Result, SyncError};
use dirsync_core::models::common::{Context, MissingUsersPolicy, RestoredUsersPolicy};
use dirsync_core::models::directory::{dn_key, DirectoryUser};
use dirsync_core::models::mapping::mapped_attributes;
use dirsync_core::models::sync::PairReport;
use dirsync_core::models::user::{LocalUser, MergedUser};

use crate::client::DirectoryClient;
use crate::mapper::AttributeMapper;

/// Policies that apply to every pair of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub missing_users: MissingUsersPolicy,
    pub restored_users: RestoredUsersPolicy,
    pub allow_empty_directory: bool,
}

/// Counts from [`SyncEngine::reconcile_missing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingOutcome {
    pub disabled: usize,
    pub deleted: usize,
}

/// What [`SyncEngine::import_user`] did with one directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Created,
    Updated,
    /// Updated and re-activated by the restore policy.
    Restored,
}

/// Synchronizes one context of one configuration into a local user store.
pub struct SyncEngine<'a> {
    configuration: &'a Configuration,
    context: Context,
    settings: &'a ContextSettings,
}

impl<'a> SyncEngine<'a> {
    /// Fails with [`SyncError::ContextNotConfigured`] when the configuration
    /// has no settings for `context`.
    pub fn new(configuration: &'a Configuration, context: Context) -> Result<Self> {
        let settings = configuration
            .context(context)
            .ok_or(SyncError::ContextNotConfigured {
                configuration: configuration.uid,
                context,
            })?;
        Ok(Self {
            configuration,
            context,
            settings,
        })
    }

    pub fn context(&self) -> Context {
        self.context
    }

    /// Search the context's users base DN for the mapped attributes.
    pub async fn fetch_directory_users<D>(&self, directory: &mut D) -> Result<Vec<DirectoryUser>>
    where
        D: DirectoryClient + ?Sized,
    {
        let attributes = mapped_attributes(&self.settings.mapping);
        directory
            .search(
                &self.settings.users_base_dn,
                &self.settings.users_filter,
                &attributes,
            )
            .await
    }

    /// The local counterpart of each directory user, matched by DN.
    pub async fn fetch_local_users<S>(
        &self,
        store: &mut S,
        directory_users: &[DirectoryUser],
    ) -> Result<Vec<Option<LocalUser>>>
    where
        S: LocalUserStore + ?Sized,
    {
        let mut locals = Vec::with_capacity(directory_users.len());
        for user in directory_users {
            locals.push(store.find_by_dn(&user.dn, self.context).await?);
        }
        Ok(locals)
    }

    /// Disable or soft-delete local users of this configuration whose DN is
    /// no longer in the directory result.
    pub async fn reconcile_missing<S>(
        &self,
        store: &mut S,
        directory_users: &[DirectoryUser],
        policy: MissingUsersPolicy,
    ) -> Result<MissingOutcome>
    where
        S: LocalUserStore + ?Sized,
    {
        let mut outcome = MissingOutcome::default();
        if policy == MissingUsersPolicy::Nothing {
            return Ok(outcome);
        }

        let present: HashSet<String> = directory_users.iter().map(|u| dn_key(&u.dn)).collect();
        let linked = store
            .list_linked(self.configuration.uid, self.context)
            .await?;

        for user in linked {
            let Some(dn) = user.dn.as_deref() else {
                continue;
            };
            if present.contains(&dn_key(dn)) {
                continue;
            }
            match policy {
                MissingUsersPolicy::Disable if !user.disabled => {
                    debug!(uid = user.uid, dn, context = %self.context, "disabling missing user");
                    store.disable(&user, self.context).await?;
                    outcome.disabled += 1;
                }
                MissingUsersPolicy::Delete if !user.deleted => {
                    debug!(uid = user.uid, dn, context = %self.context, "deleting missing user");
                    store.soft_delete(&user, self.context).await?;
                    outcome.deleted += 1;
                }
                _ => {}
            }
        }
        Ok(outcome)
    }

    /// Write one merged user. An existing user that is disabled or deleted is
    /// re-activated first, as far as `policy` allows; its fields are written
    /// either way.
    pub async fn import_user<S>(
        &self,
        store: &mut S,
        merged: &MergedUser,
        directory_user: &DirectoryUser,
        policy: RestoredUsersPolicy,
    ) -> Result<ImportOutcome>
    where
        S: LocalUserStore + ?Sized,
    {
        let restore = (merged.disabled && policy.enables()) || (merged.deleted && policy.undeletes());
        let mut restored = false;

        if let (Some(uid), true) = (merged.uid, restore) {
            let current = store
                .find_by_dn(&directory_user.dn, self.context)
                .await?
                .filter(|u| u.uid == uid)
                .ok_or_else(|| {
                    SyncError::Store(format!("{} user {uid} vanished during import", self.context))
                })?;
            if current.disabled && policy.enables() {
                store.enable(&current, self.context).await?;
                restored = true;
            }
            if current.deleted && policy.undeletes() {
                store.undelete(&current, self.context).await?;
                restored = true;
            }
        }

        store
            .upsert(merged, self.configuration.uid, self.context)
            .await?;

        let outcome = match (merged.uid, restored) {
            (None, _) => ImportOutcome::Created,
            (Some(_), true) => ImportOutcome::Restored,
            (Some(_), false) => ImportOutcome::Updated,
        };
        debug!(dn = %directory_user.dn, context = %self.context, ?outcome, "imported user");
        Ok(outcome)
    }

    /// Run the whole pair: fetch, reconcile missing users, then merge and
    /// import every directory user. Counts land in `report` as they happen,
    /// so a failed pair still shows how far it got.
    pub async fn run<D, S>(
        &self,
        directory: &mut D,
        store: &mut S,
        options: &SyncOptions,
        report: &mut PairReport,
    ) -> Result<()>
    where
        D: DirectoryClient + ?Sized,
        S: LocalUserStore + ?Sized,
    {
        // 1. Fetch directory users
        let directory_users = self.fetch_directory_users(directory).await?;
        report.fetched = directory_users.len();
        if directory_users.is_empty() && !options.allow_empty_directory {
            return Err(SyncError::EmptyDirectoryResult {
                configuration: self.configuration.uid,
                context: self.context,
            });
        }

        // 2. Handle users that left the directory
        let missing = self
            .reconcile_missing(store, &directory_users, options.missing_users)
            .await?;
        report.disabled = missing.disabled;
        report.deleted = missing.deleted;

        // 3. Snapshot local counterparts after reconciliation
        let locals = self.fetch_local_users(store, &directory_users).await?;

        // 4. Merge and import
        let mapper = AttributeMapper::new(&self.settings.mapping);
        for (directory_user, local) in directory_users.iter().zip(locals.iter()) {
            let merged = mapper.merge(directory_user, local.as_ref());
            match self
                .import_user(store, &merged, directory_user, options.restored_users)
                .await?
            {
                ImportOutcome::Created => report.created += 1,
                ImportOutcome::Updated => report.updated += 1,
                ImportOutcome::Restored => {
                    report.updated += 1;
                    report.restored += 1;
                }
            }
        }

        info!(
            configuration = self.configuration.uid,
            context = %self.context,
            fetched = report.fetched,
            created = report.created,
            updated = report.updated,
            restored = report.restored,
            disabled = report.disabled,
            deleted = report.deleted,
            "pair synchronized"
        );
        Ok(())
    }
}

//! Test doubles shared by the engine and task tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dirsync_core::config::{Configuration, ConnectionConfig, ContextSettings};
use dirsync_core::db::memory::MemoryUserRepository;
use dirsync_core::db::repository::{LocalUserStore, UserRepository, UserTransaction};
use dirsync_core::error::{Result, SyncError};
use dirsync_core::models::common::{Context, GroupMembership};
use dirsync_core::models::directory::{dn_key, DirectoryUser};
use dirsync_core::models::mapping::FieldMapping;
use dirsync_core::models::user::{LocalUser, MergedUser};

use crate::client::DirectoryClient;

pub(crate) fn fe_base(uid: u32) -> String {
    format!("ou=people,dc=cfg{uid},dc=example,dc=com")
}

pub(crate) fn be_base(uid: u32) -> String {
    format!("ou=staff,dc=cfg{uid},dc=example,dc=com")
}

/// A configuration with both contexts set up and a two-field mapping.
pub(crate) fn configuration(uid: u32) -> Configuration {
    let settings = |base: String| ContextSettings {
        users_base_dn: base,
        users_filter: "(objectClass=person)".into(),
        groups_base_dn: None,
        mapping: vec![
            FieldMapping::new("username", "sAMAccountName"),
            FieldMapping::new("email", "mail"),
        ],
    };
    Configuration {
        uid,
        name: format!("Directory {uid}"),
        connection: ConnectionConfig {
            server: format!("ldap://dc{uid}.example.com"),
            bind_dn: "cn=reader,dc=example,dc=com".into(),
            bind_password: "secret".into(),
            tls_verify: true,
            timeout_secs: 5,
        },
        group_membership: GroupMembership::None,
        fe: Some(settings(fe_base(uid))),
        be: Some(settings(be_base(uid))),
    }
}

pub(crate) fn person(dn: &str, username: &str) -> DirectoryUser {
    DirectoryUser::new(dn)
        .with("sAMAccountName", username)
        .with("mail", format!("{username}@example.com"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Search {
    pub configuration: u32,
    pub base_dn: String,
    pub filter: String,
    pub attributes: Vec<String>,
}

/// Directory double answering searches from a fixed table keyed by base DN.
#[derive(Debug, Default)]
pub(crate) struct ScriptedDirectory {
    entries: HashMap<String, Vec<DirectoryUser>>,
    unreachable: HashSet<u32>,
    session: Option<u32>,
    pub connects: Vec<u32>,
    pub disconnects: usize,
    pub searches: Vec<Search>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(mut self, base_dn: impl Into<String>, users: Vec<DirectoryUser>) -> Self {
        self.entries.insert(base_dn.into(), users);
        self
    }

    /// Make `connect` fail for this configuration.
    pub fn unreachable(mut self, configuration_uid: u32) -> Self {
        self.unreachable.insert(configuration_uid);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[async_trait]
impl DirectoryClient for ScriptedDirectory {
    async fn connect(&mut self, configuration: &Configuration) -> Result<()> {
        self.session = None;
        self.connects.push(configuration.uid);
        if self.unreachable.contains(&configuration.uid) {
            return Err(SyncError::DirectoryUnavailable(format!(
                "{} refused the connection",
                configuration.connection.server
            )));
        }
        self.session = Some(configuration.uid);
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryUser>> {
        let configuration = self
            .session
            .ok_or_else(|| SyncError::DirectoryUnavailable("not connected".into()))?;
        self.searches.push(Search {
            configuration,
            base_dn: base_dn.to_string(),
            filter: filter.to_string(),
            attributes: attributes.to_vec(),
        });
        Ok(self.entries.get(base_dn).cloned().unwrap_or_default())
    }

    async fn disconnect(&mut self) {
        if self.session.take().is_some() {
            self.disconnects += 1;
        }
    }
}

/// Store wrapper that logs every call, for ordering assertions.
pub(crate) struct RecordingStore {
    inner: Box<dyn UserTransaction>,
    pub calls: Vec<String>,
}

impl RecordingStore {
    pub async fn begin(repository: &MemoryUserRepository) -> Self {
        Self {
            inner: repository.begin().await.unwrap(),
            calls: Vec::new(),
        }
    }
}

#[async_trait]
impl LocalUserStore for RecordingStore {
    async fn find_by_dn(&mut self, dn: &str, context: Context) -> Result<Option<LocalUser>> {
        self.calls.push(format!("find_by_dn {dn}"));
        self.inner.find_by_dn(dn, context).await
    }

    async fn list_linked(
        &mut self,
        configuration_uid: u32,
        context: Context,
    ) -> Result<Vec<LocalUser>> {
        self.calls.push("list_linked".to_string());
        self.inner.list_linked(configuration_uid, context).await
    }

    async fn upsert(
        &mut self,
        merged: &MergedUser,
        configuration_uid: u32,
        context: Context,
    ) -> Result<LocalUser> {
        self.calls.push(format!("upsert {}", merged.dn));
        self.inner.upsert(merged, configuration_uid, context).await
    }

    async fn disable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.calls.push(format!("disable {}", user.dn.as_deref().unwrap_or("")));
        self.inner.disable(user, context).await
    }

    async fn soft_delete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.calls.push(format!("soft_delete {}", user.dn.as_deref().unwrap_or("")));
        self.inner.soft_delete(user, context).await
    }

    async fn enable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.calls.push(format!("enable {}", user.dn.as_deref().unwrap_or("")));
        self.inner.enable(user, context).await
    }

    async fn undelete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.calls.push(format!("undelete {}", user.dn.as_deref().unwrap_or("")));
        self.inner.undelete(user, context).await
    }
}

/// Repository whose transactions reject writes for one DN.
#[derive(Clone)]
pub(crate) struct FailingRepository {
    pub inner: MemoryUserRepository,
    pub failing_dn: String,
}

#[async_trait]
impl UserRepository for FailingRepository {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            failing_dn: dn_key(&self.failing_dn),
        }))
    }
}

struct FailingTransaction {
    inner: Box<dyn UserTransaction>,
    failing_dn: String,
}

#[async_trait]
impl LocalUserStore for FailingTransaction {
    async fn find_by_dn(&mut self, dn: &str, context: Context) -> Result<Option<LocalUser>> {
        self.inner.find_by_dn(dn, context).await
    }

    async fn list_linked(
        &mut self,
        configuration_uid: u32,
        context: Context,
    ) -> Result<Vec<LocalUser>> {
        self.inner.list_linked(configuration_uid, context).await
    }

    async fn upsert(
        &mut self,
        merged: &MergedUser,
        configuration_uid: u32,
        context: Context,
    ) -> Result<LocalUser> {
        if dn_key(&merged.dn) == self.failing_dn {
            return Err(SyncError::Store(format!("constraint violation for {}", merged.dn)));
        }
        self.inner.upsert(merged, configuration_uid, context).await
    }

    async fn disable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.inner.disable(user, context).await
    }

    async fn soft_delete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.inner.soft_delete(user, context).await
    }

    async fn enable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.inner.enable(user, context).await
    }

    async fn undelete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.inner.undelete(user, context).await
    }
}

#[async_trait]
impl UserTransaction for FailingTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.inner.rollback().await
    }
}

/// Observer that keeps what it was told.
#[derive(Clone, Default)]
pub(crate) struct CollectingObserver {
    pub pairs: Arc<Mutex<Vec<(u32, Context)>>>,
    pub runs: Arc<Mutex<usize>>,
}

impl crate::observer::SyncObserver for CollectingObserver {
    fn pair_finished(&self, report: &dirsync_core::models::sync::PairReport) {
        self.pairs
            .lock()
            .unwrap()
            .push((report.configuration_uid, report.context));
    }

    fn run_finished(&self, _summary: &dirsync_core::models::sync::RunSummary) {
        *self.runs.lock().unwrap() += 1;
    }
}

//! TOML-based configuration for dirsync.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::repository::ConfigurationStore;
use crate::error::{Result, SyncError};
use crate::models::common::{
    ConfigurationSelector, Context, ContextSelection, GroupMembership, MissingUsersPolicy,
    RestoredUsersPolicy,
};
use crate::models::mapping::FieldMapping;

/// Top-level dirsync configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirSyncConfig {
    pub dirsync: DirSyncSection,
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default)]
    pub configurations: Vec<Configuration>,
}

/// Instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirSyncSection {
    pub instance_name: String,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// SQLite database holding the local user tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/dirsync/dirsync.db".into(),
        }
    }
}

/// Default parameters for the synchronization task. CLI flags override them.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TaskConfig {
    #[serde(default)]
    pub context: ContextSelection,
    #[serde(default)]
    pub configuration: ConfigurationSelector,
    #[serde(default)]
    pub missing_users: MissingUsersPolicy,
    #[serde(default)]
    pub restored_users: RestoredUsersPolicy,
    /// Accept an empty directory result instead of counting it as a failure.
    #[serde(default)]
    pub allow_empty_directory: bool,
}

/// One named directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Configuration {
    pub uid: u32,
    pub name: String,
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub group_membership: GroupMembership,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fe: Option<ContextSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub be: Option<ContextSettings>,
}

impl Configuration {
    pub fn context(&self, context: Context) -> Option<&ContextSettings> {
        match context {
            Context::Fe => self.fe.as_ref(),
            Context::Be => self.be.as_ref(),
        }
    }

    /// Non-fatal problems worth showing to whoever maintains the configuration.
    ///
    /// With `from_member` group membership, groups are resolved through the
    /// users' `usergroup` field, so a context that imports both users and
    /// groups needs that field mapped.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        if self.group_membership != GroupMembership::FromMember {
            return Vec::new();
        }
        [Context::Be, Context::Fe]
            .into_iter()
            .filter_map(|ctx| {
                let settings = self.context(ctx)?;
                let imports_groups = settings
                    .groups_base_dn
                    .as_deref()
                    .is_some_and(|dn| !dn.is_empty());
                let maps_groups = settings.mapping.iter().any(|m| m.field == "usergroup");
                (!settings.users_base_dn.is_empty() && imports_groups && !maps_groups).then(|| {
                    ConfigWarning {
                        configuration_uid: self.uid,
                        context: ctx,
                        message: format!(
                            "{ctx} users mapping has no `usergroup` field, group membership from `member` will not be imported"
                        ),
                    }
                })
            })
            .collect()
    }
}

/// Directory connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// LDAP URL, e.g. `ldaps://dc01.example.com:636`.
    pub server: String,
    #[serde(default)]
    pub bind_dn: String,
    #[serde(default)]
    pub bind_password: String,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tls_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

/// Per-context search and mapping settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextSettings {
    pub users_base_dn: String,
    #[serde(default = "default_users_filter")]
    pub users_filter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_base_dn: Option<String>,
    #[serde(default)]
    pub mapping: Vec<FieldMapping>,
}

fn default_users_filter() -> String {
    "(objectClass=person)".into()
}

/// A configuration problem that does not prevent synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub configuration_uid: u32,
    pub context: Context,
    pub message: String,
}

impl DirSyncConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        if self.dirsync.instance_name.is_empty() {
            return Err(SyncError::Config(
                "dirsync.instance_name must not be empty".into(),
            ));
        }

        if self.dirsync.database.path.is_empty() {
            return Err(SyncError::Config(
                "dirsync.database.path must not be empty".into(),
            ));
        }

        let mut uids = HashSet::new();
        for cfg in &self.configurations {
            if cfg.uid == 0 {
                return Err(SyncError::Config(format!(
                    "configuration `{}` must have a non-zero uid",
                    cfg.name
                )));
            }
            if !uids.insert(cfg.uid) {
                return Err(SyncError::Config(format!(
                    "duplicate configuration uid {}",
                    cfg.uid
                )));
            }
            if cfg.name.is_empty() {
                return Err(SyncError::Config(format!(
                    "configuration {} must have a name",
                    cfg.uid
                )));
            }
            if cfg.connection.server.is_empty() {
                return Err(SyncError::Config(format!(
                    "configuration {} has no connection.server",
                    cfg.uid
                )));
            }
            for ctx in [Context::Fe, Context::Be] {
                let Some(settings) = cfg.context(ctx) else {
                    continue;
                };
                if settings.users_base_dn.is_empty() {
                    return Err(SyncError::Config(format!(
                        "configuration {} {ctx}.users_base_dn must not be empty",
                        cfg.uid
                    )));
                }
                if settings.mapping.is_empty() {
                    return Err(SyncError::Config(format!(
                        "configuration {} {ctx}.mapping must not be empty",
                        cfg.uid
                    )));
                }
            }
        }

        if let ConfigurationSelector::Uid(uid) = self.task.configuration {
            if !uids.contains(&uid) {
                return Err(SyncError::Config(format!(
                    "task.configuration refers to unknown configuration {uid}"
                )));
            }
        }

        let selected: Vec<&Configuration> = self.selected_configurations().collect();
        if !selected.is_empty() {
            for &ctx in self.task.context.contexts() {
                if selected.iter().all(|cfg| cfg.context(ctx).is_none()) {
                    return Err(SyncError::Config(format!(
                        "task.context selects {ctx} but no selected configuration has [{ctx}] settings"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Warnings for every configuration, plus one for each selected
    /// (configuration, context) pair that will fail for lack of settings.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings: Vec<ConfigWarning> = self
            .configurations
            .iter()
            .flat_map(Configuration::warnings)
            .collect();
        for cfg in self.selected_configurations() {
            for &ctx in self.task.context.contexts() {
                if cfg.context(ctx).is_none() {
                    warnings.push(ConfigWarning {
                        configuration_uid: cfg.uid,
                        context: ctx,
                        message: format!(
                            "task.context selects {ctx} but this configuration has no [{ctx}] settings, every sync will fail"
                        ),
                    });
                }
            }
        }
        warnings
    }

    fn selected_configurations(&self) -> impl Iterator<Item = &Configuration> {
        let selector = self.task.configuration;
        self.configurations
            .iter()
            .filter(move |cfg| match selector {
                ConfigurationSelector::All => true,
                ConfigurationSelector::Uid(uid) => cfg.uid == uid,
            })
    }

    /// Generate a sensible default configuration.
    pub fn generate_default() -> Self {
        Self {
            dirsync: DirSyncSection {
                instance_name: "My Intranet".into(),
                database: DatabaseConfig::default(),
            },
            task: TaskConfig {
                context: ContextSelection::Be,
                ..TaskConfig::default()
            },
            configurations: vec![Configuration {
                uid: 1,
                name: "Active Directory".into(),
                connection: ConnectionConfig {
                    server: "ldaps://dc01.example.com:636".into(),
                    bind_dn: "CN=svc-dirsync,OU=Service Accounts,DC=example,DC=com".into(),
                    bind_password: String::new(),
                    tls_verify: true,
                    timeout_secs: default_timeout_secs(),
                },
                group_membership: GroupMembership::FromMemberOf,
                fe: None,
                be: Some(ContextSettings {
                    users_base_dn: "OU=Staff,DC=example,DC=com".into(),
                    users_filter: "(&(objectClass=user)(objectCategory=person))".into(),
                    groups_base_dn: None,
                    mapping: vec![
                        FieldMapping::new("username", "sAMAccountName"),
                        FieldMapping::new("realName", "displayName"),
                        FieldMapping::new("email", "mail"),
                    ],
                }),
            }],
        }
    }

    /// Serialize to TOML, e.g. for `dirsync init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Serialization(e.to_string()))
    }
}

/// [`ConfigurationStore`] backed by the `[[configurations]]` of a config file.
#[derive(Debug, Clone, Default)]
pub struct FileConfigurationStore {
    configurations: Vec<Configuration>,
}

impl FileConfigurationStore {
    pub fn new(configurations: Vec<Configuration>) -> Self {
        Self { configurations }
    }
}

impl From<&DirSyncConfig> for FileConfigurationStore {
    fn from(config: &DirSyncConfig) -> Self {
        Self::new(config.configurations.clone())
    }
}

#[async_trait]
impl ConfigurationStore for FileConfigurationStore {
    async fn fetch_all(&self) -> Result<Vec<Configuration>> {
        Ok(self.configurations.clone())
    }

    async fn fetch_by_uid(&self, uid: u32) -> Result<Option<Configuration>> {
        Ok(self.configurations.iter().find(|c| c.uid == uid).cloned())
    }
}

//! Directory access: the [`DirectoryClient`] seam and its LDAP implementation.

use std::time::Duration;

use async_trait::async_trait;
use dirsync_core::config::Configuration;
use dirsync_core::error::{Result, SyncError};
use dirsync_core::models::directory::DirectoryUser;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info};

/// A session against one directory server.
///
/// The task opens a session before each (configuration, context) pair and
/// closes it afterwards, whether or not the pair succeeded.
#[async_trait]
pub trait DirectoryClient: Send {
    /// Connect and bind with the configuration's credentials. An already open
    /// session is closed first.
    async fn connect(&mut self, configuration: &Configuration) -> Result<()>;

    /// Subtree search below `base_dn`. An empty `attributes` list requests all
    /// user attributes.
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryUser>>;

    /// Close the session. Never fails; a no-op when nothing is open.
    async fn disconnect(&mut self);
}

/// [`DirectoryClient`] over `ldap3` with simple bind.
#[derive(Default)]
pub struct LdapDirectoryClient {
    ldap: Option<Ldap>,
    server: String,
}

impl LdapDirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.ldap.is_some()
    }

    /// Bind and unbind once, for `dirsync test-connection`.
    pub async fn test_connection(&mut self, configuration: &Configuration) -> Result<()> {
        self.connect(configuration).await?;
        self.disconnect().await;
        info!(server = %configuration.connection.server, "LDAP connection test successful");
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn connect(&mut self, configuration: &Configuration) -> Result<()> {
        self.disconnect().await;

        let connection = &configuration.connection;
        let settings = LdapConnSettings::new()
            .set_no_tls_verify(!connection.tls_verify)
            .set_conn_timeout(Duration::from_secs(connection.timeout_secs));
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &connection.server)
            .await
            .map_err(|e| SyncError::DirectoryUnavailable(format!("LDAP connect failed: {e}")))?;

        ldap3::drive!(conn);

        ldap.simple_bind(&connection.bind_dn, &connection.bind_password)
            .await
            .map_err(|e| SyncError::DirectoryUnavailable(format!("LDAP bind failed: {e}")))?
            .success()
            .map_err(|e| SyncError::DirectoryUnavailable(format!("LDAP bind rejected: {e}")))?;

        debug!(server = %connection.server, configuration = configuration.uid, "LDAP bind successful");
        self.server = connection.server.clone();
        self.ldap = Some(ldap);
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryUser>> {
        let ldap = self
            .ldap
            .as_mut()
            .ok_or_else(|| SyncError::DirectoryUnavailable("not connected".into()))?;

        let attrs: Vec<&str> = attributes.iter().map(String::as_str).collect();
        let (results, _) = ldap
            .search(base_dn, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| SyncError::DirectoryUnavailable(format!("LDAP search failed: {e}")))?
            .success()
            .map_err(|e| SyncError::DirectoryUnavailable(format!("LDAP search error: {e}")))?;

        let users: Vec<DirectoryUser> = results
            .into_iter()
            .filter(|entry| !entry.is_ref())
            .map(|entry| {
                let se = SearchEntry::construct(entry);
                DirectoryUser::from_attributes(se.dn, se.attrs)
            })
            .collect();

        debug!(server = %self.server, base_dn, count = users.len(), "LDAP search complete");
        Ok(users)
    }

    async fn disconnect(&mut self) {
        if let Some(mut ldap) = self.ldap.take() {
            if let Err(e) = ldap.unbind().await {
                debug!(server = %self.server, error = %e, "LDAP unbind failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_without_connect_is_unavailable() {
        let mut client = LdapDirectoryClient::new();
        let result = client
            .search("dc=example,dc=com", "(objectClass=person)", &[])
            .await;
        assert!(matches!(result, Err(SyncError::DirectoryUnavailable(_))));
    }

    #[tokio::test]
    async fn disconnect_without_session_is_noop() {
        let mut client = LdapDirectoryClient::new();
        client.disconnect().await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn connect_to_invalid_url_is_unavailable() {
        let mut configuration = dirsync_core::config::DirSyncConfig::generate_default()
            .configurations
            .remove(0);
        configuration.connection.server = "not-a-url".into();
        let mut client = LdapDirectoryClient::new();
        let result = client.connect(&configuration).await;
        assert!(matches!(result, Err(SyncError::DirectoryUnavailable(_))));
        assert!(!client.is_connected());
    }
}

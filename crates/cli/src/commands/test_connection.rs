use dirsync_ldap_sync::client::LdapDirectoryClient;

/// Run the `test-connection` command: bind to one configuration's server.
pub async fn run(config_path: &str, configuration_uid: u32) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let configuration = config
        .configurations
        .iter()
        .find(|c| c.uid == configuration_uid)
        .ok_or_else(|| anyhow::anyhow!("no configuration with uid {configuration_uid}"))?;

    println!(
        "Testing LDAP connection to {}...",
        configuration.connection.server
    );

    let mut client = LdapDirectoryClient::new();
    match client.test_connection(configuration).await {
        Ok(()) => {
            println!("LDAP connection successful!");
            Ok(())
        }
        Err(e) => {
            println!("LDAP connection failed: {e}");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_core::config::DirSyncConfig;

    #[tokio::test]
    async fn unknown_configuration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirsync.toml");
        let toml = DirSyncConfig::generate_default().to_toml().unwrap();
        std::fs::write(&path, toml).unwrap();

        let err = run(path.to_str().unwrap(), 9).await.unwrap_err();
        assert!(err.to_string().contains("no configuration with uid 9"));
    }

    #[tokio::test]
    async fn test_connection_requires_config_file() {
        assert!(run("/nonexistent/dirsync.toml", 1).await.is_err());
    }
}

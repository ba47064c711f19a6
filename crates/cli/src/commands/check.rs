use dirsync_core::models::common::Context;

/// Run the `check` command: validate the configuration file and list what a
/// sync would cover.
pub fn run(config_path: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    println!("Configuration OK: {config_path}");
    println!("  Instance: {}", config.dirsync.instance_name);
    println!(
        "  Task:     context={} configuration={} missing_users={} restored_users={}",
        config.task.context,
        config.task.configuration,
        config.task.missing_users,
        config.task.restored_users
    );
    for cfg in &config.configurations {
        println!("  [{}] {} ({})", cfg.uid, cfg.name, cfg.connection.server);
        for context in [Context::Fe, Context::Be] {
            match cfg.context(context) {
                Some(settings) => println!(
                    "      {context}: {} {} ({} mapped fields)",
                    settings.users_base_dn,
                    settings.users_filter,
                    settings.mapping.len()
                ),
                None => println!("      {context}: not configured"),
            }
        }
    }

    let warnings = config.warnings();
    if warnings.is_empty() {
        println!("No warnings.");
    } else {
        println!("Warnings:");
        for warning in &warnings {
            println!(
                "  configuration {} ({}): {}",
                warning.configuration_uid, warning.context, warning.message
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_core::config::DirSyncConfig;

    #[test]
    fn check_accepts_generated_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirsync.toml");
        let toml = DirSyncConfig::generate_default().to_toml().unwrap();
        std::fs::write(&path, toml).unwrap();
        assert!(run(path.to_str().unwrap()).is_ok());
    }

    #[test]
    fn check_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirsync.toml");
        std::fs::write(&path, "[dirsync]\ninstance_name = \"\"\n").unwrap();
        let err = run(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("instance_name"));
    }

    #[test]
    fn check_requires_config_file() {
        assert!(run("/nonexistent/dirsync.toml").is_err());
    }
}

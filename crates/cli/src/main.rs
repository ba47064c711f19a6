use clap::Parser;
use dirsync_core::models::common::{
    ConfigurationSelector, ContextSelection, MissingUsersPolicy, RestoredUsersPolicy,
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "dirsync",
    about = "Import LDAP / Active Directory users into local user tables",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "dirsync.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Import users from the configured directories
    Sync(SyncArgs),
    /// Show the last runs and local user counts
    Status,
    /// Validate the configuration and print warnings
    Check,
    /// Bind to one configuration's directory server
    TestConnection {
        /// Configuration uid
        #[arg(long)]
        configuration: u32,
    },
}

/// Overrides for the `[task]` section of the configuration file.
#[derive(clap::Args, Debug, Default, PartialEq, Eq)]
pub struct SyncArgs {
    /// fe, be or both
    #[arg(long)]
    pub context: Option<ContextSelection>,
    /// `all` or a configuration uid
    #[arg(long)]
    pub configuration: Option<ConfigurationSelector>,
    /// nothing, disable or delete
    #[arg(long)]
    pub missing_users: Option<MissingUsersPolicy>,
    /// nothing, enable, undelete or both
    #[arg(long)]
    pub restored_users: Option<RestoredUsersPolicy>,
    /// Accept an empty directory result
    #[arg(long)]
    pub allow_empty: bool,
    /// Run everything, then roll back
    #[arg(long)]
    pub dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            commands::init::run(&cli.config).await?;
        }
        Commands::Sync(args) => {
            commands::sync::run(&cli.config, &args).await?;
        }
        Commands::Status => {
            commands::status::run(&cli.config).await?;
        }
        Commands::Check => {
            commands::check::run(&cli.config)?;
        }
        Commands::TestConnection { configuration } => {
            commands::test_connection::run(&cli.config, configuration).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parse_init_defaults() {
        let cli = Cli::parse_from(["dirsync", "init"]);
        assert_eq!(cli.config, "dirsync.toml");
        assert!(matches!(cli.command, Commands::Init));
    }

    #[test]
    fn cli_parse_custom_config() {
        let cli = Cli::parse_from(["dirsync", "--config", "/etc/dirsync.toml", "check"]);
        assert_eq!(cli.config, "/etc/dirsync.toml");
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn cli_parse_sync_defaults() {
        let cli = Cli::parse_from(["dirsync", "sync"]);
        match cli.command {
            Commands::Sync(args) => assert_eq!(args, SyncArgs::default()),
            _ => panic!("expected Sync command"),
        }
    }

    #[test]
    fn cli_parse_sync_overrides() {
        let cli = Cli::parse_from([
            "dirsync",
            "sync",
            "--context",
            "be",
            "--configuration",
            "3",
            "--missing-users",
            "disable",
            "--restored-users",
            "both",
            "--allow-empty",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.context, Some(ContextSelection::Be));
                assert_eq!(args.configuration, Some(ConfigurationSelector::Uid(3)));
                assert_eq!(args.missing_users, Some(MissingUsersPolicy::Disable));
                assert_eq!(args.restored_users, Some(RestoredUsersPolicy::Both));
                assert!(args.allow_empty);
                assert!(args.dry_run);
            }
            _ => panic!("expected Sync command"),
        }
    }

    #[test]
    fn cli_parse_sync_all_configurations() {
        let cli = Cli::parse_from(["dirsync", "sync", "--configuration", "all"]);
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.configuration, Some(ConfigurationSelector::All));
            }
            _ => panic!("expected Sync command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_context() {
        assert!(Cli::try_parse_from(["dirsync", "sync", "--context", "web"]).is_err());
    }

    #[test]
    fn cli_parse_status() {
        let cli = Cli::parse_from(["dirsync", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_parse_test_connection() {
        let cli = Cli::parse_from(["dirsync", "test-connection", "--configuration", "2"]);
        match cli.command {
            Commands::TestConnection { configuration } => assert_eq!(configuration, 2),
            _ => panic!("expected TestConnection command"),
        }
    }

    #[test]
    fn cli_test_connection_requires_configuration() {
        assert!(Cli::try_parse_from(["dirsync", "test-connection"]).is_err());
    }
}

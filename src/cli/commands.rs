//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rate-limited access to paginated REST APIs
#[derive(Parser, Debug)]
#[command(name = "pagewise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML); read from the environment when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// List every Backupify user with storage converted to bytes
    BackupifyUsers {
        /// Only show users using more than this many bytes
        #[arg(long)]
        larger_than: Option<f64>,
    },

    /// Look up an Okta user by id or login
    OktaUser {
        /// User id or login
        id: String,
    },

    /// Look up a Google Workspace user
    GoogleUser {
        /// Primary email, alias or id
        key: String,

        /// Impersonate this user for the lookup
        #[arg(long = "as")]
        subject: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backupify_users() {
        let cli = Cli::try_parse_from(["pagewise", "backupify-users", "--larger-than", "5e9"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::BackupifyUsers {
                larger_than: Some(5e9)
            }
        );
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_google_user_with_subject() {
        let cli = Cli::try_parse_from([
            "pagewise",
            "--verbose",
            "--config",
            "pagewise.yaml",
            "google-user",
            "ada@example.com",
            "--as",
            "admin@example.com",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("pagewise.yaml")));
        assert_eq!(
            cli.command,
            Commands::GoogleUser {
                key: "ada@example.com".to_string(),
                subject: Some("admin@example.com".to_string()),
            }
        );
    }

    #[test]
    fn test_okta_user_requires_id() {
        assert!(Cli::try_parse_from(["pagewise", "okta-user"]).is_err());
    }
}

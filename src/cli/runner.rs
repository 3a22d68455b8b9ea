//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::providers::{BackupifyClient, GoogleClient, OktaClient};
use crate::types::JsonValue;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load settings from `--config` or the environment
    pub fn settings(&self) -> Result<Settings> {
        match &self.cli.config {
            Some(path) => Settings::from_file(path),
            None => Settings::from_env(),
        }
    }

    /// Log level to run at: DEBUG under `--verbose`, else the configured one
    pub fn log_level(&self, settings: &Settings) -> tracing::Level {
        if self.cli.verbose {
            tracing::Level::DEBUG
        } else {
            settings.log_level.into()
        }
    }

    /// Run the CLI command, printing its result as pretty JSON
    pub async fn run(&self, settings: &Settings) -> Result<()> {
        info!(command = ?self.cli.command, "Running command");
        let output = self.execute(settings).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Run the CLI command against `settings`, returning its result
    pub async fn execute(&self, settings: &Settings) -> Result<JsonValue> {
        match &self.cli.command {
            Commands::BackupifyUsers { larger_than } => {
                let client = BackupifyClient::from_settings(&settings.backupify)?;
                let users = client.users().all().await?;
                let users = match larger_than {
                    Some(bytes) => client.users().larger_than(&users, *bytes),
                    None => users,
                };
                Ok(serde_json::to_value(users)?)
            }
            Commands::OktaUser { id } => {
                let client = OktaClient::from_settings(&settings.okta)?;
                Ok(serde_json::to_value(client.users().get(id).await?)?)
            }
            Commands::GoogleUser { key, subject } => {
                let client = GoogleClient::from_settings(&settings.google)?;
                if let Some(subject) = subject {
                    client.impersonate(subject).await?;
                }
                Ok(serde_json::to_value(client.users().get(key).await?)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::LogLevel;
    use clap::Parser;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["pagewise"];
        argv.extend_from_slice(args);
        Runner::new(Cli::parse_from(argv))
    }

    #[tokio::test]
    async fn test_backupify_users_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customer-services/filter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "draw": 1,
                "recordsTotal": 2,
                "recordsFiltered": 2,
                "data": [
                    {"name": "Ada", "email": "ada@example.com", "usedBytes": "3 GB"},
                    {"name": "Bob", "email": "bob@example.com", "usedBytes": "10 MB"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = Settings::default();
        settings.backupify.provider.base_url = Some(server.uri());

        let output = runner(&["backupify-users", "--larger-than", "1e9"])
            .execute(&settings)
            .await
            .unwrap();

        let data = output["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Ada");
        assert_eq!(data[0]["usedBytesFloat"], json!(3e9));
    }

    #[tokio::test]
    async fn test_okta_user_without_token() {
        let mut settings = Settings::default();
        settings.okta.org_name = "acme".to_string();

        let err = runner(&["okta-user", "00u1"])
            .execute(&settings)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[test]
    fn test_log_level_from_settings() {
        let settings = Settings {
            log_level: LogLevel::Warn,
            ..Settings::default()
        };

        assert_eq!(
            runner(&["okta-user", "x"]).log_level(&settings),
            tracing::Level::WARN
        );
        assert_eq!(
            runner(&["--verbose", "okta-user", "x"]).log_level(&settings),
            tracing::Level::DEBUG
        );
    }

    #[test]
    fn test_settings_from_missing_file() {
        let err = runner(&["--config", "/no/such/pagewise.yaml", "okta-user", "x"])
            .settings()
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}

//! Configuration types for provider clients
//!
//! Settings come from a YAML file or from environment variables. Each
//! provider section flattens the shared `ProviderConfig` knobs next to its
//! own credentials.

use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, TransportConfig};
use crate::types::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Shared Provider Config
// ============================================================================

/// Knobs shared by every provider client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Override for the provider's API root
    pub base_url: Option<String>,
    /// Records requested per page
    pub page_size: u64,
    /// Requests allowed per quota window (provider default when unset)
    pub quota_capacity: Option<u32>,
    /// Quota window length in seconds (provider default when unset)
    pub quota_window_secs: Option<u64>,
    /// Follow provider quota headers (provider default when unset)
    pub reset_aware: Option<bool>,
    /// How long complete aggregates stay cached
    pub cache_ttl_secs: u64,
    /// Give up waiting for quota after this many seconds
    pub acquire_timeout_secs: Option<u64>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            page_size: 75,
            quota_capacity: None,
            quota_window_secs: None,
            reset_aware: None,
            cache_ttl_secs: 3 * 60 * 60,
            acquire_timeout_secs: None,
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl ProviderConfig {
    /// Read `<PREFIX>_*` variables from the process environment
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Read `<PREFIX>_*` variables through `lookup`
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |suffix: &str| format!("{prefix}_{suffix}");
        let defaults = Self::default();

        Ok(Self {
            base_url: lookup(&var("BASE_URL")),
            page_size: parse_var(&lookup, &var("PAGE_SIZE"))?.unwrap_or(defaults.page_size),
            quota_capacity: parse_var(&lookup, &var("QUOTA_CAPACITY"))?,
            quota_window_secs: parse_var(&lookup, &var("QUOTA_WINDOW_SECS"))?,
            reset_aware: parse_var(&lookup, &var("RESET_AWARE"))?,
            cache_ttl_secs: parse_var(&lookup, &var("CACHE_TTL_SECS"))?
                .unwrap_or(defaults.cache_ttl_secs),
            acquire_timeout_secs: parse_var(&lookup, &var("ACQUIRE_TIMEOUT_SECS"))?,
            timeout_secs: parse_var(&lookup, &var("TIMEOUT_SECS"))?
                .unwrap_or(defaults.timeout_secs),
            user_agent: lookup(&var("USER_AGENT")),
        })
    }

    /// Reject settings the clients cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be at least 1"));
        }
        if self.quota_capacity == Some(0) {
            return Err(Error::invalid_value("quota_capacity", "must be at least 1"));
        }
        if self.quota_window_secs == Some(0) {
            return Err(Error::invalid_value("quota_window_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Limiter config, filling unset fields from the provider's defaults
    pub fn rate_limiter_config(&self, defaults: &RateLimiterConfig) -> RateLimiterConfig {
        RateLimiterConfig {
            capacity: self.quota_capacity.unwrap_or(defaults.capacity),
            window: self
                .quota_window_secs
                .map_or(defaults.window, Duration::from_secs),
            reset_aware: self.reset_aware.unwrap_or(defaults.reset_aware),
        }
    }

    /// Cache lifetime of complete aggregates
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Upper bound on waiting for quota
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_secs.map(Duration::from_secs)
    }

    /// Transport settings
    pub fn transport_config(&self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::invalid_value(name, format!("'{raw}': {e}"))),
        None => Ok(None),
    }
}

// ============================================================================
// Provider Sections
// ============================================================================

/// Backupify (backup inventory) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupifySettings {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Application whose protected users are listed
    pub app_type: String,
    /// Interpret sizes in powers of 1024
    pub binary_units: bool,
    /// Headers carrying the session credentials
    pub headers: HashMap<String, String>,
}

impl Default for BackupifySettings {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            app_type: "GoogleDrive".to_string(),
            binary_units: false,
            headers: HashMap::new(),
        }
    }
}

impl BackupifySettings {
    /// Read `BACKUPIFY_*` variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let mut headers = HashMap::new();
        if let Some(cookie) = lookup("BACKUPIFY_SESSION_COOKIE") {
            headers.insert("Cookie".to_string(), cookie);
        }

        Ok(Self {
            provider: ProviderConfig::from_lookup("BACKUPIFY", &lookup)?,
            app_type: lookup("BACKUPIFY_APP_TYPE").unwrap_or(defaults.app_type),
            binary_units: parse_var(&lookup, "BACKUPIFY_BINARY_UNITS")?.unwrap_or(false),
            headers,
        })
    }
}

/// Okta (user directory) settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OktaSettings {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Organization subdomain, e.g. `acme` for `acme.okta.com`
    pub org_name: String,
    /// Okta domain, `okta.com` unless a preview org is used
    pub domain: Option<String>,
    /// API token sent as `SSWS`
    pub api_token: Option<String>,
}

impl OktaSettings {
    /// Read `OKTA_*` variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            provider: ProviderConfig::from_lookup("OKTA", &lookup)?,
            org_name: lookup("OKTA_ORG_NAME").unwrap_or_default(),
            domain: lookup("OKTA_DOMAIN"),
            api_token: lookup("OKTA_API_TOKEN"),
        })
    }
}

/// Google Workspace (user directory) settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Path to a service account key file
    pub service_account_file: Option<PathBuf>,
    /// Base64-encoded service account key
    pub service_account_base64: Option<String>,
    /// API key sent as `Bearer` when no service account is configured
    pub api_key: Option<String>,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    /// User to impersonate
    pub subject: Option<String>,
}

impl GoogleSettings {
    /// Read `GOOGLE_*` variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            provider: ProviderConfig::from_lookup("GOOGLE", &lookup)?,
            service_account_file: lookup("GOOGLE_SERVICE_ACCOUNT_FILE").map(PathBuf::from),
            service_account_base64: lookup("GOOGLE_SERVICE_ACCOUNT"),
            api_key: lookup("GOOGLE_API_KEY"),
            scopes: lookup("GOOGLE_SCOPES")
                .map(|s| {
                    s.split([',', ' '])
                        .filter(|scope| !scope.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            subject: lookup("GOOGLE_SUBJECT"),
        })
    }
}

// ============================================================================
// Top-Level Settings
// ============================================================================

/// All provider settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default log level for the binary
    pub log_level: LogLevel,
    pub backupify: BackupifySettings,
    pub okta: OktaSettings,
    pub google: GoogleSettings,
}

impl Settings {
    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|_| Error::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings = Self {
            log_level: parse_var(&lookup, "PAGEWISE_LOG_LEVEL")?.unwrap_or_default(),
            backupify: BackupifySettings::from_lookup(&lookup)?,
            okta: OktaSettings::from_lookup(&lookup)?,
            google: GoogleSettings::from_lookup(&lookup)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every provider section
    pub fn validate(&self) -> Result<()> {
        self.backupify.provider.validate()?;
        self.okta.provider.validate()?;
        self.google.provider.validate()
    }
}

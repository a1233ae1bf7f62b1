//! Application configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. `~/.config/edulink-digest/config.json` (optional)
//! 2. a `.env` file, loaded into the environment by the binary
//! 3. environment variables (`EDULINK_*`, `SEND_EMAIL`, `MAILGUN_*`, ...)
//!
//! `Config` is the raw, partially filled view. `Config::validate` turns it
//! into `Settings`, which is what the rest of the crate consumes.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::CredentialStore;
use crate::report::FailurePolicy;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "edulink-digest";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_ENDPOINT: &str = "https://roundwoodpark.edulinkone.com/api/";
pub const DEFAULT_ESTABLISHMENT_ID: u32 = 2;
pub const DEFAULT_MAILGUN_DOMAIN: &str = "evops.eu";
pub const DEFAULT_EMAIL_SENDER: &str = "EduLink <edulink@evops.eu>";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub username: Option<String>,
    /// Only ever read from the environment or the keychain.
    #[serde(skip)]
    pub password: Option<String>,
    pub endpoint: Option<String>,
    pub establishment_id: Option<u32>,
    pub cache_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub failure_policy: Option<FailurePolicy>,
    pub max_event_age_days: Option<u32>,
    pub send_email: Option<bool>,
    pub email_recipients: Vec<String>,
    pub email_sender: Option<String>,
    pub mailgun_domain: Option<String>,
    #[serde(skip)]
    pub mailgun_api_key: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Mail delivery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub enabled: bool,
    pub recipients: Vec<String>,
    pub sender: String,
    pub mailgun_domain: String,
    /// Present whenever `enabled` is true.
    pub mailgun_api_key: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub username: String,
    pub password: String,
    pub endpoint: String,
    pub establishment_id: u32,
    pub cache_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub failure_policy: FailurePolicy,
    pub max_event_age: Option<Duration>,
    pub email: EmailSettings,
    pub output_dir: PathBuf,
}

impl Config {
    /// Load the config file (if any) and apply process environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) => Self::load_from(&path)?,
            Err(e) => {
                debug!(error = %e, "No config directory, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Overlay variables from `lookup`. Unset and empty variables leave the
    /// current value alone.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("EDULINK_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = var("EDULINK_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = var("EDULINK_ENDPOINT") {
            self.endpoint = Some(v);
        }
        if let Some(v) = var("EDULINK_ESTABLISHMENT_ID") {
            self.establishment_id = Some(
                v.trim()
                    .parse()
                    .with_context(|| format!("EDULINK_ESTABLISHMENT_ID is not a number: {}", v))?,
            );
        }
        if let Some(v) = var("EDULINK_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("EDULINK_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("EDULINK_FAILURE_POLICY") {
            self.failure_policy = Some(v.parse()?);
        }
        if let Some(v) = var("EDULINK_MAX_EVENT_AGE_DAYS") {
            self.max_event_age_days = Some(v.trim().parse().with_context(|| {
                format!("EDULINK_MAX_EVENT_AGE_DAYS is not a number: {}", v)
            })?);
        }
        if let Some(v) = var("SEND_EMAIL") {
            self.send_email = Some(parse_flag(&v));
        }
        if let Some(v) = var("EMAIL_RECIPIENTS") {
            self.email_recipients = split_list(&v);
        }
        if let Some(v) = var("EMAIL_SENDER") {
            self.email_sender = Some(v);
        }
        if let Some(v) = var("MAILGUN_DOMAIN") {
            self.mailgun_domain = Some(v);
        }
        if let Some(v) = var("MAILGUN_API_KEY") {
            self.mailgun_api_key = Some(v);
        }
        if let Some(v) = var("EDULINK_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn establishment_id_or_default(&self) -> u32 {
        self.establishment_id.unwrap_or(DEFAULT_ESTABLISHMENT_ID)
    }

    pub fn cache_dir_or_default(&self) -> Result<PathBuf> {
        match self.cache_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(dirs::cache_dir()
                .ok_or_else(|| anyhow!("Could not find cache directory"))?
                .join(APP_NAME)),
        }
    }

    /// Validate, falling back to the OS keychain for a missing password.
    pub fn validate(self) -> Result<Settings> {
        self.validate_with(CredentialStore::lookup)
    }

    /// Validate with an explicit password source for a missing password.
    pub fn validate_with(
        self,
        keychain: impl FnOnce(&str) -> Result<Option<String>>,
    ) -> Result<Settings> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| anyhow!("EDULINK_USERNAME is not set"))?;
        let cache_dir = self.cache_dir_or_default()?;
        let endpoint = self.endpoint_or_default().to_string();
        let establishment_id = self.establishment_id_or_default();

        let password = match self.password {
            Some(password) => password,
            None => keychain(&username)?.ok_or_else(|| {
                anyhow!(
                    "No password for {}: set EDULINK_PASSWORD or run `edulink-digest store-password`",
                    username
                )
            })?,
        };

        let enabled = self.send_email.unwrap_or(false);
        if enabled && self.mailgun_api_key.is_none() {
            bail!("SEND_EMAIL is true but MAILGUN_API_KEY is not set");
        }

        Ok(Settings {
            username,
            password,
            endpoint,
            establishment_id,
            cache_dir,
            log_dir: self.log_dir,
            failure_policy: self.failure_policy.unwrap_or_default(),
            max_event_age: self
                .max_event_age_days
                .map(|days| Duration::days(i64::from(days))),
            email: EmailSettings {
                enabled,
                recipients: self.email_recipients,
                sender: self
                    .email_sender
                    .unwrap_or_else(|| DEFAULT_EMAIL_SENDER.to_string()),
                mailgun_domain: self
                    .mailgun_domain
                    .unwrap_or_else(|| DEFAULT_MAILGUN_DOMAIN.to_string()),
                mailgun_api_key: self.mailgun_api_key,
            },
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

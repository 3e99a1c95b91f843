use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";

const APP_ID_ENV: &str = "FEISHU_APP_ID";
const APP_SECRET_ENV: &str = "FEISHU_APP_SECRET";
const PLACEHOLDER_PREFIX: &str = "YOUR_";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml; not serialized
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Feishu open platform application settings
    #[serde(default)]
    pub feishu: FeishuConfig,

    /// Token cache settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Free/busy lookup defaults
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

/// Feishu application credentials and endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeishuConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// App ID from the Feishu developer console
    #[serde(default)]
    pub app_id: String,

    /// App secret; `FEISHU_APP_SECRET` takes precedence when set
    #[serde(default)]
    pub app_secret: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Both values present and not the `YOUR_...` placeholders written to a fresh config.
pub fn credentials_configured(app_id: &str, app_secret: &str) -> bool {
    let present = |v: &str| !v.trim().is_empty() && !v.starts_with(PLACEHOLDER_PREFIX);
    present(app_id) && present(app_secret)
}

impl FeishuConfig {
    /// Check if credentials are configured (not placeholders)
    pub fn is_configured(&self) -> bool {
        credentials_configured(&self.app_id, &self.app_secret)
    }
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_id: "YOUR_FEISHU_APP_ID".to_string(),
            app_secret: "YOUR_FEISHU_APP_SECRET".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Refresh the tenant token this many seconds before it expires (default: 300)
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,

    /// Timeout for the token exchange request (default: 10)
    #[serde(default = "default_auth_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_refresh_margin_secs() -> u64 {
    300
}

fn default_auth_timeout_secs() -> u64 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_margin_secs: default_refresh_margin_secs(),
            request_timeout_secs: default_auth_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Offset used to build query windows and read busy times (default: +08:00)
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default = "default_start_hour")]
    pub default_start_hour: u32,

    #[serde(default = "default_end_hour")]
    pub default_end_hour: u32,

    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,

    /// Timeout for each free/busy request (default: 15)
    #[serde(default = "default_scheduling_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_utc_offset() -> String {
    "+08:00".to_string()
}

fn default_start_hour() -> u32 {
    9
}

fn default_end_hour() -> u32 {
    18
}

fn default_duration_minutes() -> u32 {
    30
}

fn default_scheduling_timeout_secs() -> u64 {
    15
}

impl SchedulingConfig {
    /// Parse the configured offset string.
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset
            .parse::<FixedOffset>()
            .map_err(|e| anyhow::anyhow!("Invalid UTC offset '{}': {}", self.utc_offset, e))
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            default_start_hour: default_start_hour(),
            default_end_hour: default_end_hour(),
            default_duration_minutes: default_duration_minutes(),
            request_timeout_secs: default_scheduling_timeout_secs(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feishu-assistant")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            feishu: FeishuConfig::default(),
            auth: AuthConfig::default(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_credential_overrides(
            std::env::var(APP_ID_ENV).ok(),
            std::env::var(APP_SECRET_ENV).ok(),
        );
        Ok(config)
    }

    /// Load configuration from a specific file, writing defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_dir);

        if !path.exists() {
            let config = Self {
                config_dir,
                ..Self::default()
            };
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_dir = config_dir;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors abort the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Environment credentials win over file values when present and non-empty.
    pub fn apply_credential_overrides(
        &mut self,
        app_id: Option<String>,
        app_secret: Option<String>,
    ) {
        if let Some(id) = app_id.filter(|v| !v.is_empty()) {
            self.feishu.app_id = id;
        }
        if let Some(secret) = app_secret.filter(|v| !v.is_empty()) {
            self.feishu.app_secret = secret;
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.feishu.base_url, "feishu.base_url", &mut result);

        if !self.feishu.is_configured() {
            result.add_warning(
                "feishu",
                "App credentials not configured - API calls will fail",
            );
        }

        if self.auth.refresh_margin_secs == 0 {
            result.add_warning(
                "auth.refresh_margin_secs",
                "Tokens will only be refreshed once they have expired",
            );
        } else if self.auth.refresh_margin_secs >= 7200 {
            result.add_warning(
                "auth.refresh_margin_secs",
                "Margin is at least the default token lifetime; every call will refresh",
            );
        }

        if self.auth.request_timeout_secs == 0 {
            result.add_error("auth.request_timeout_secs", "Timeout must be greater than 0");
        }

        let scheduling = &self.scheduling;
        if let Err(e) = scheduling.offset() {
            result.add_error("scheduling.utc_offset", e.to_string());
        }

        if scheduling.default_start_hour > 23 {
            result.add_error("scheduling.default_start_hour", "Hour must be between 0 and 23");
        }
        if scheduling.default_end_hour > 23 {
            result.add_error("scheduling.default_end_hour", "Hour must be between 0 and 23");
        }
        if scheduling.default_start_hour >= scheduling.default_end_hour {
            result.add_error(
                "scheduling.default_end_hour",
                "End hour must be after start hour",
            );
        }

        if scheduling.default_duration_minutes == 0 {
            result.add_warning(
                "scheduling.default_duration_minutes",
                "Zero duration accepts every gap",
            );
        }

        if scheduling.request_timeout_secs == 0 {
            result.add_error(
                "scheduling.request_timeout_secs",
                "Timeout must be greater than 0",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("feishu-assistant");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_unconfigured_credentials_is_warning() {
        let result = Config::default().validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "feishu"));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.feishu.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "feishu.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.feishu.base_url = "ftp://open.feishu.cn".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_inverted_window_is_error() {
        let mut config = Config::default();
        config.scheduling.default_start_hour = 18;
        config.scheduling.default_end_hour = 9;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "scheduling.default_end_hour"));
    }

    #[test]
    fn test_bad_offset_is_error() {
        let mut config = Config::default();
        config.scheduling.utc_offset = "Asia/Shanghai".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "scheduling.utc_offset"));
    }

    #[test]
    fn test_default_offset_parses() {
        let offset = SchedulingConfig::default().offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_placeholder_credentials_not_configured() {
        assert!(!FeishuConfig::default().is_configured());
        assert!(!credentials_configured("cli_a1", "YOUR_FEISHU_APP_SECRET"));
        assert!(!credentials_configured("  ", "secret"));
        assert!(credentials_configured("cli_a1", "secret"));
    }

    #[test]
    fn test_credential_overrides() {
        let mut config = Config::default();
        config.apply_credential_overrides(Some("cli_a1".into()), Some(String::new()));
        assert_eq!(config.feishu.app_id, "cli_a1");
        // Empty values leave the file value in place
        assert_eq!(config.feishu.app_secret, "YOUR_FEISHU_APP_SECRET");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path().join("nested"));
        assert_eq!(config.scheduling.default_start_hour, 9);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.feishu.app_id = "cli_test".to_string();
        config.scheduling.utc_offset = "+09:00".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.feishu.app_id, "cli_test");
        assert_eq!(loaded.scheduling.utc_offset, "+09:00");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[feishu]\napp_id = \"cli_x\"\napp_secret = \"s\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.feishu.is_configured());
        assert_eq!(loaded.feishu.base_url, DEFAULT_BASE_URL);
        assert_eq!(loaded.auth.refresh_margin_secs, 300);
        assert_eq!(loaded.scheduling.default_duration_minutes, 30);
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}

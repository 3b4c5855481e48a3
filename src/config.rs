use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants;

const SECRET_MASK: &str = "********";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub facebook: FacebookConfig,

    pub categorization: CategorizationConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Whether outbound API traffic is appended to files under `api_log_dir`.
    pub api_log_enabled: bool,

    pub api_log_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            api_log_enabled: true,
            api_log_dir: "logs".to_string(),
        }
    }
}

/// Settings for the Graph API `ads_archive` endpoint.
///
/// The tuning knobs are optional so that the service factory can tell an
/// explicit zero (rejected) apart from "use the default".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacebookConfig {
    pub access_token: String,

    pub api_version: String,

    pub base_url: String,

    pub request_timeout_ms: Option<u64>,

    pub min_request_interval_ms: Option<u64>,

    pub max_retries: Option<u32>,

    pub default_page_size: Option<u32>,

    /// Upper bound accepted for the `limit` query parameter of `/api/ads`.
    pub max_results_cap: u32,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_version: constants::facebook::DEFAULT_API_VERSION.to_string(),
            base_url: constants::facebook::GRAPH_BASE_URL.to_string(),
            request_timeout_ms: None,
            min_request_interval_ms: None,
            max_retries: None,
            default_page_size: None,
            max_results_cap: constants::facebook::MAX_RESULTS_CAP,
        }
    }
}

impl FacebookConfig {
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.default_page_size
            .unwrap_or(constants::facebook::DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizationConfig {
    pub enabled: bool,

    pub api_key: String,

    pub model: String,

    pub base_url: String,
}

impl Default for CategorizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: constants::categorization::DEFAULT_MODEL.to_string(),
            base_url: constants::categorization::GEMINI_BASE_URL.to_string(),
        }
    }
}

impl CategorizationConfig {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Hosts `/api/ad-preview` is allowed to fetch from. Subdomains match.
    pub preview_allowed_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
            preview_allowed_hosts: vec!["facebook.com".to_string(), "fbcdn.net".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    /// Loads the first config file found, then layers `.env` and process
    /// environment overrides on top.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("FB_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.facebook.access_token = token;
        }

        if let Some(version) = lookup("FB_API_VERSION").filter(|v| !v.is_empty()) {
            self.facebook.api_version = version;
        }

        if let Some(key) = lookup("GEMINI_API_KEY").filter(|v| !v.is_empty()) {
            self.categorization.api_key = key;
        }

        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ad-library-browser").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ad-library-browser").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Rejects configs the server cannot start with. Facebook credentials
    /// are checked separately by the service factory so the server can still
    /// come up and report "not configured".
    pub fn validate(&self) -> Result<()> {
        if self.server.enabled && self.server.port == 0 {
            anyhow::bail!("Server port must be > 0 when the server is enabled");
        }

        if self.facebook.max_results_cap == 0 {
            anyhow::bail!("facebook.max_results_cap must be > 0");
        }

        if self.general.api_log_enabled && self.general.api_log_dir.trim().is_empty() {
            anyhow::bail!("general.api_log_dir cannot be empty when API logging is enabled");
        }

        Ok(())
    }

    /// Copy of the config with secrets replaced, for display.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        if !config.facebook.access_token.is_empty() {
            config.facebook.access_token = SECRET_MASK.to_string();
        }
        if !config.categorization.api_key.is_empty() {
            config.categorization.api_key = SECRET_MASK.to_string();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.facebook.api_version, "v18.0");
        assert_eq!(config.facebook.page_size(), 24);
        assert_eq!(config.server.port, 5000);
        assert!(!config.facebook.is_configured());
        assert!(!config.categorization.is_active());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [facebook]
            access_token = "token"
            default_page_size = 50
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.facebook.page_size(), 50);
        assert_eq!(config.facebook.max_retries, None);
        assert_eq!(config.facebook.api_version, "v18.0");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FB_ACCESS_TOKEN", "from-env"),
            ("GEMINI_API_KEY", "gemini"),
            ("PORT", "8080"),
            ("FB_API_VERSION", ""),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.facebook.access_token, "from-env");
        assert_eq!(config.categorization.api_key, "gemini");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.facebook.api_version, "v18.0");
        assert!(config.categorization.is_active());
    }

    #[test]
    fn test_masked_hides_secrets() {
        let mut config = Config::default();
        config.facebook.access_token = "secret-token".to_string();

        let rendered = toml::to_string_pretty(&config.masked()).unwrap();
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[facebook]"));
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = Config::default();
        config.facebook.max_results_cap = 0;
        assert!(config.validate().is_err());
    }
}

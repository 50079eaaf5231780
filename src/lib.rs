//! execmatch
//!
//! Matching and messaging core for a two-sided marketplace connecting
//! startups with fractional executives:
//! - compatibility scoring between executives and posted roles, delegated
//!   to an external AI scoring oracle
//! - conversations with unread tracking, platform broadcasts and a
//!   support channel routed to a reserved identity
//! - SQLite-backed document store with transactional messaging updates

pub mod api;
pub mod auth;
pub mod error;
pub mod marketplace;
pub mod matching;
pub mod messaging;
pub mod oracle;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use messaging::SupportIdentity;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub database: DatabaseYamlConfig,
    pub oracle: OracleYamlConfig,
    pub support: SupportYamlConfig,
    /// Auth section — if absent, auth is None (deny-by-default)
    pub auth: Option<AuthConfig>,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Database configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseYamlConfig {
    pub path: String,
}

impl Default for DatabaseYamlConfig {
    fn default() -> Self {
        Self {
            path: "execmatch.db".into(),
        }
    }
}

/// Scoring oracle configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleYamlConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OracleYamlConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/v1/chat/completions".into(),
            model: "llama3.1".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Platform-support identity section. A reserved user id, injected here
/// so support-channel routing never depends on a literal in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupportYamlConfig {
    pub user_id: String,
    pub display_name: String,
}

impl Default for SupportYamlConfig {
    fn default() -> Self {
        Self {
            user_id: "platform-support".into(),
            display_name: "Platform Support".into(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret (HS256, minimum 32 characters)
    pub jwt_secret: String,
    /// JWT token lifetime in seconds (default: 28800 = 8h)
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_secs: u64,
}

fn default_jwt_expiry() -> u64 {
    28800 // 8 hours
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub server_port: u16,
    pub oracle_url: String,
    pub oracle_model: String,
    pub oracle_api_key: Option<String>,
    pub oracle_timeout_secs: u64,
    pub support_user_id: String,
    pub support_display_name: String,
    /// Auth config — None means deny-by-default (no auth section in YAML)
    pub auth: Option<AuthConfig>,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with
    /// env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file
    /// doesn't exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or(yaml.database.path),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            oracle_url: std::env::var("ORACLE_URL").unwrap_or(yaml.oracle.url),
            oracle_model: std::env::var("ORACLE_MODEL").unwrap_or(yaml.oracle.model),
            oracle_api_key: std::env::var("ORACLE_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .or(yaml.oracle.api_key),
            oracle_timeout_secs: std::env::var("ORACLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.oracle.timeout_secs),
            support_user_id: std::env::var("SUPPORT_USER_ID").unwrap_or(yaml.support.user_id),
            support_display_name: std::env::var("SUPPORT_DISPLAY_NAME")
                .unwrap_or(yaml.support.display_name),
            auth: yaml.auth,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any
    /// failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn support_identity(&self) -> SupportIdentity {
        SupportIdentity {
            user_id: self.support_user_id.clone(),
            display_name: self.support_display_name.clone(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::DocumentStore>,
    pub oracle: Arc<dyn oracle::ScoringOracle>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state with all services initialized
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(store::SqliteStore::new(Path::new(&config.database_path)).await?);

        let oracle = Arc::new(oracle::HttpScoringOracle::new(
            config.oracle_url.clone(),
            config.oracle_model.clone(),
            config.oracle_api_key.clone(),
            Some(config.oracle_timeout_secs),
        ));

        Ok(Self {
            store,
            oracle,
            config: Arc::new(config),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
server:
  port: 9090

database:
  path: /tmp/test.db

oracle:
  url: http://scoring:9000/v1/chat/completions
  model: test-model
  api_key: sk-test
  timeout_secs: 10

support:
  user_id: support-reserved
  display_name: Acme Support

auth:
  jwt_secret: "super-secret-key-min-32-characters!"
  jwt_expiry_secs: 3600
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.oracle.model, "test-model");
        assert_eq!(config.oracle.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.support.user_id, "support-reserved");

        let auth = config.auth.unwrap();
        assert_eq!(auth.jwt_expiry_secs, 3600);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "execmatch.db");
        assert_eq!(config.oracle.timeout_secs, 30);
        assert_eq!(config.support.user_id, "platform-support");
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_jwt_expiry_default() {
        let yaml = r#"
auth:
  jwt_secret: "min-32-chars-secret-key-for-test!!"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.auth.unwrap().jwt_expiry_secs, 28800); // 8h default
    }

    /// Combined test for YAML file loading and env var overrides.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "DATABASE_PATH",
                "SERVER_PORT",
                "ORACLE_URL",
                "ORACLE_MODEL",
                "ORACLE_API_KEY",
                "ORACLE_TIMEOUT_SECS",
                "SUPPORT_USER_ID",
                "SUPPORT_DISPLAY_NAME",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
server:
  port: 9999
database:
  path: /tmp/yaml.db
oracle:
  url: http://yaml-oracle:9000
  model: yaml-model
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_port, 9999);
        assert_eq!(config.database_path, "/tmp/yaml.db");
        assert_eq!(config.oracle_model, "yaml-model");
        assert!(config.auth.is_none());

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("ORACLE_URL", "http://env-oracle:9000");
        std::env::set_var("SERVER_PORT", "7777");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.oracle_url, "http://env-oracle:9000");
        assert_eq!(config.server_port, 7777);
        // YAML value still used where no env override
        assert_eq!(config.oracle_model, "yaml-model");

        clear_env();

        // --- Phase 3: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-config-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.support_user_id, "platform-support");
        assert!(config.auth.is_none());
    }
}

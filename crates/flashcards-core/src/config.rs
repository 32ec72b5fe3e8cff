use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FlashcardsError, Result};

/// Top-level configuration for the Flashcards backend.
///
/// Loaded from `flashcards.toml` by default, then overlaid with environment
/// variables (see [`FlashcardsConfig::apply_env_overrides`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashcardsConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl FlashcardsConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FlashcardsConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| FlashcardsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    ///
    /// Recognized variables: `PORT`, `DATABASE_PATH`, `OPENAI_API_KEY`,
    /// `OPENAI_MODEL`, `OPENAI_BASE_URL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values looked up through `lookup`. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid PORT value"),
            }
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
    }

    /// Check values that cannot be expressed by types alone.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(FlashcardsError::Config(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(FlashcardsError::Config(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(FlashcardsError::Config(
                "llm.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/flashcards.db".to_string(),
        }
    }
}

/// Language-model provider settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key. Usually supplied through `OPENAI_API_KEY` rather than the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Base URL of the API, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Whole-request timeout for model calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = FlashcardsConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "data/flashcards.db");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.llm.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[server]
host = "127.0.0.1"
port = 9090

[database]
path = "/tmp/cards.db"

[llm]
model = "gpt-4o"
base_url = "http://localhost:11434/v1"
request_timeout_secs = 30
"#;
        let file = create_temp_config(content);
        let config = FlashcardsConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.path, "/tmp/cards.db");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.request_timeout_secs, 30);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[server]\nport = 3000\n");
        let config = FlashcardsConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("[server\nport = ");
        let err = FlashcardsConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, FlashcardsError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = FlashcardsConfig::load_or_default(Path::new("/nonexistent/flashcards.toml"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flashcards.toml");

        let mut config = FlashcardsConfig::default();
        config.server.port = 4321;
        config.save(&path).unwrap();

        let reloaded = FlashcardsConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 4321);
        assert_eq!(reloaded.database.path, config.database.path);
    }

    #[test]
    fn test_save_omits_missing_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flashcards.toml");
        FlashcardsConfig::default().save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("api_key"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "5000"),
            ("DATABASE_PATH", "/var/lib/flashcards.db"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
        ]);
        let mut config = FlashcardsConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.path, "/var/lib/flashcards.db");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_env_overrides_ignore_invalid_and_empty() {
        let env: HashMap<&str, &str> =
            HashMap::from([("PORT", "not-a-port"), ("OPENAI_API_KEY", "  ")]);
        let mut config = FlashcardsConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8080);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = FlashcardsConfig::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            FlashcardsError::Config(_)
        ));
    }

    #[test]
    fn test_validate_rejects_empty_database_path() {
        let mut config = FlashcardsConfig::default();
        config.database.path = "  ".to_string();
        assert!(config.validate().is_err());
    }
}

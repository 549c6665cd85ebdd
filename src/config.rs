//! Configuration parsing and validation for aigate.
//!
//! Two layers of configuration exist: a JSON settings file controlling the
//! server itself (listen address, file paths, log level), and two
//! line-delimited flat files holding the provider and token tables. The flat
//! files are the only part re-read by `/v1/reload`.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Server settings, loaded once at startup from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Path to the provider table (`name|url|api_key` per line)
    #[serde(default = "default_providers_file")]
    pub providers_file: String,
    /// Path to the token table (`description|token` per line)
    #[serde(default = "default_tokens_file")]
    pub tokens_file: String,
    /// Regex patterns limiting which model ids `/v1/models` returns.
    /// Empty means all models are listed.
    #[serde(default)]
    pub supported_models: Vec<String>,
    /// Overall timeout for upstream requests, in seconds
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_providers_file() -> String {
    "providers.conf".to_string()
}

fn default_tokens_file() -> String {
    "tokens.conf".to_string()
}

fn default_upstream_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            providers_file: default_providers_file(),
            tokens_file: default_tokens_file(),
            supported_models: Vec::new(),
            upstream_timeout_secs: default_upstream_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse settings from a JSON string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(content).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.is_empty() {
            return Err(ConfigError::Validation(
                "listen address must not be empty".to_string(),
            ));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upstream_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the key value is only accessible via
/// `.expose_secret()`, keeping every call site grep-auditable.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// An upstream provider: a name, a base URL, and the credential used
/// when forwarding requests to it.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Unique name, used as the prefix in `provider/model` ids
    pub name: String,
    /// Base URL for the provider's API (e.g., "https://api.example.com/v1")
    pub base_url: String,
    /// Key substituted for the client's token on upstream requests
    pub api_key: ApiKey,
}

impl Provider {
    /// Parse a single `name|url|api_key` record.
    ///
    /// Returns `Ok(None)` for blank lines and `#` comments. Trailing slashes
    /// are trimmed from the URL.
    pub fn from_line(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 3 {
            return Err(format!(
                "expected 3 fields (name|url|api_key), got {}",
                parts.len()
            ));
        }

        let name = parts[0].trim();
        let url = parts[1].trim().trim_end_matches('/');
        if name.is_empty() {
            return Err("provider name must not be empty".to_string());
        }
        if url.is_empty() {
            return Err("provider URL must not be empty".to_string());
        }

        Ok(Some(Provider {
            name: name.to_string(),
            base_url: url.to_string(),
            api_key: ApiKey::from(parts[2].trim()),
        }))
    }
}

/// An access token accepted by the gateway, with a human-readable label.
#[derive(Debug, Clone)]
pub struct Token {
    /// Label surfaced in logs when this token authenticates a request
    pub description: String,
    /// The bearer value itself
    pub value: ApiKey,
}

impl Token {
    /// Parse a single `description|token` record.
    ///
    /// Returns `Ok(None)` for blank lines and `#` comments.
    pub fn from_line(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 2 {
            return Err(format!(
                "expected 2 fields (description|token), got {}",
                parts.len()
            ));
        }

        let description = parts[0].trim();
        let value = parts[1].trim();
        if value.is_empty() {
            return Err("token value must not be empty".to_string());
        }

        Ok(Some(Token {
            description: description.to_string(),
            value: ApiKey::from(value),
        }))
    }
}

/// Parse a full provider table from flat-file content.
///
/// Any malformed record fails the whole parse; a reload must be
/// all-or-nothing.
pub fn parse_providers(content: &str, path: &str) -> Result<Vec<Provider>, ConfigError> {
    let mut providers = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        match Provider::from_line(line) {
            Ok(Some(provider)) => providers.push(provider),
            Ok(None) => {}
            Err(message) => {
                return Err(ConfigError::Record {
                    path: path.to_string(),
                    line: idx + 1,
                    message,
                })
            }
        }
    }
    Ok(providers)
}

/// Parse a full token table from flat-file content.
pub fn parse_tokens(content: &str, path: &str) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        match Token::from_line(line) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {}
            Err(message) => {
                return Err(ConfigError::Record {
                    path: path.to_string(),
                    line: idx + 1,
                    message,
                })
            }
        }
    }
    Ok(tokens)
}

/// Read and parse the provider table file.
pub fn load_providers(path: impl AsRef<Path>) -> Result<Vec<Provider>, ConfigError> {
    let path_str = path.as_ref().display().to_string();
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    parse_providers(&content, &path_str)
}

/// Read and parse the token table file.
pub fn load_tokens(path: impl AsRef<Path>) -> Result<Vec<Token>, ConfigError> {
    let path_str = path.as_ref().display().to_string();
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    parse_tokens(&content, &path_str)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed record in '{path}' at line {line}: {message}")]
    Record {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

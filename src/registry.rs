//! Provider and token table snapshots.
//!
//! Tables are immutable once built. The server holds an `Arc` snapshot
//! behind a read-write lock; `/v1/reload` builds a fresh snapshot from the
//! flat files and swaps it in wholesale, so in-flight requests keep the
//! tables they started with.

use std::sync::Arc;

use regex::RegexBuilder;
use tokio::sync::RwLock;

use crate::config::{load_providers, load_tokens, ConfigError, Provider, Settings, Token};

/// One immutable generation of the provider and token tables.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    providers: Vec<Provider>,
    tokens: Vec<Token>,
}

impl Tables {
    pub fn new(providers: Vec<Provider>, tokens: Vec<Token>) -> Self {
        Self { providers, tokens }
    }

    /// Look up a provider by name. Duplicate names resolve last-write-wins,
    /// matching the flat-file load order.
    pub fn provider(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().rev().find(|p| p.name == name)
    }

    /// All loaded providers, in file order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Membership test for an inbound bearer value. Returns the token's
    /// description so callers can log who authenticated.
    pub fn token_description(&self, value: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.value.expose_secret() == value)
            .map(|t| t.description.as_str())
    }
}

/// Shared handle to the current table snapshot.
pub type SharedTables = Arc<RwLock<Arc<Tables>>>;

/// Wrap a table snapshot for sharing across handlers.
pub fn shared(tables: Tables) -> SharedTables {
    Arc::new(RwLock::new(Arc::new(tables)))
}

/// Load both flat files into a fresh snapshot.
///
/// Both files must parse completely before anything is returned; a failure
/// in either leaves the caller's current snapshot untouched.
pub fn load_tables(settings: &Settings) -> Result<Tables, ConfigError> {
    let providers = load_providers(&settings.providers_file)?;
    let tokens = load_tokens(&settings.tokens_file)?;

    if providers.is_empty() {
        tracing::warn!(
            path = %settings.providers_file,
            "No providers configured - gateway will reject all chat requests"
        );
    }

    Ok(Tables::new(providers, tokens))
}

/// Split a `provider/model` id at the first slash.
///
/// The remainder after the first `/` is the upstream model id and may itself
/// contain slashes.
pub fn split_model(model: &str) -> Option<(&str, &str)> {
    model.split_once('/')
}

/// Case-insensitive pattern filter for model ids, compiled once from the
/// `supported_models` settings list.
#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    patterns: Vec<regex::Regex>,
}

impl ModelFilter {
    /// Compile the configured patterns. An invalid pattern is skipped with a
    /// warning rather than failing startup.
    pub fn from_patterns(patterns: &[String]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(regex) => compiled.push(regex),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Skipping invalid supported_models pattern");
                }
            }
        }
        Self { patterns: compiled }
    }

    /// Whether a prefixed model id passes the filter. An empty filter allows
    /// everything.
    pub fn allows(&self, model_id: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|p| p.is_match(model_id))
    }
}

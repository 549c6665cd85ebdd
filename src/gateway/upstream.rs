//! Upstream provider calls: URL construction and model listing.

use reqwest::Client;

use super::types::ModelEntry;
use crate::config::Provider;
use crate::error::{Error, Result};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Chat completions URL for a provider.
///
/// A base URL that already ends in `/chat/completions` is used verbatim, so
/// providers exposing only that one route can be configured directly.
pub fn chat_url(provider: &Provider) -> String {
    if provider.base_url.ends_with(CHAT_COMPLETIONS_PATH) {
        provider.base_url.clone()
    } else {
        format!("{}{}", provider.base_url, CHAT_COMPLETIONS_PATH)
    }
}

/// Model listing URL for a provider.
pub fn models_url(provider: &Provider) -> String {
    let base = provider
        .base_url
        .trim_end_matches(CHAT_COMPLETIONS_PATH)
        .trim_end_matches('/');
    format!("{}/models", base)
}

/// Fetch a provider's model list and prefix every id with `provider/`.
///
/// Upstream entries missing an id are skipped; some providers report the id
/// under `model` instead of `id`.
pub async fn fetch_models(client: &Client, provider: &Provider) -> Result<Vec<ModelEntry>> {
    let response = client
        .get(models_url(provider))
        .bearer_auth(provider.api_key.expose_secret())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Provider(format!(
            "Provider '{}' returned {} for model listing",
            provider.name, status
        )));
    }

    let body: serde_json::Value = response.json().await?;

    let mut models = Vec::new();
    if let Some(data) = body.get("data").and_then(|d| d.as_array()) {
        for entry in data {
            let id = entry
                .get("id")
                .and_then(|v| v.as_str())
                .or_else(|| entry.get("model").and_then(|v| v.as_str()));
            let Some(id) = id else {
                continue;
            };
            models.push(ModelEntry {
                id: format!("{}/{}", provider.name, id),
                object: entry
                    .get("object")
                    .and_then(|v| v.as_str())
                    .unwrap_or("model")
                    .to_string(),
                created: entry.get("created").and_then(|v| v.as_i64()),
                owned_by: provider.name.clone(),
            });
        }
    }

    Ok(models)
}

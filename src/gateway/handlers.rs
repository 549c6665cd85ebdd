//! HTTP request handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;

use super::server::AppState;
use super::types::{ChatCompletionRequest, ModelsResponse};
use super::upstream;
use crate::error::Error;
use crate::registry::{self, Tables};

/// Response header: correlation ID (UUID v4).
pub const REQUEST_ID_HEADER: &str = "x-aigate-request-id";

/// Handle GET / - static service metadata.
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let tables = state.snapshot().await;
    Json(serde_json::json!({
        "service": "aigate",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "models": "/v1/models",
            "chat": "/v1/chat/completions",
            "reload": "/v1/reload",
            "health": "/health"
        },
        "providers_count": tables.provider_count()
    }))
}

/// Handle GET /health - liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "aigate"
    }))
}

/// Handle GET /providers - gateway extension listing loaded providers.
/// Key values are never included.
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let tables = state.snapshot().await;
    let providers: Vec<serde_json::Value> = tables
        .providers()
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "base_url": p.base_url,
                "has_key": !p.api_key.expose_secret().is_empty(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "providers": providers
    }))
}

/// Handle GET /v1/models - aggregate model listings across all providers.
///
/// Providers are queried concurrently; one that fails is skipped rather than
/// failing the whole response. The aggregate is cached until the next reload.
pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, Error> {
    {
        let cache = state.models_cache.lock().await;
        if let Some(models) = cache.as_ref() {
            tracing::debug!(count = models.len(), "Serving model list from cache");
            return Ok(Json(ModelsResponse::new(models.clone())));
        }
    }

    let tables = state.snapshot().await;
    let fetches = tables.providers().iter().map(|provider| {
        let client = state.http_client.clone();
        let provider = provider.clone();
        async move {
            let result = upstream::fetch_models(&client, &provider).await;
            (provider.name.clone(), result)
        }
    });

    let mut models = Vec::new();
    for (name, result) in futures::future::join_all(fetches).await {
        match result {
            Ok(listed) => {
                tracing::debug!(provider = %name, count = listed.len(), "Fetched provider models");
                models.extend(listed);
            }
            Err(e) => {
                tracing::warn!(provider = %name, error = %e, "Skipping provider in model listing");
            }
        }
    }

    models.retain(|m| state.model_filter.allows(&m.id));
    tracing::info!(count = models.len(), "Aggregated model listing");

    *state.models_cache.lock().await = Some(models.clone());

    Ok(Json(ModelsResponse::new(models)))
}

/// Handle POST /v1/chat/completions.
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, Error> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let tables = state.snapshot().await;

    let mut response = match execute_chat(&state, &tables, &headers, &request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                model = %request.model,
                error = %e,
                "Chat completion failed"
            );
            e.into_response()
        }
    };

    response.headers_mut().insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&request_id).unwrap(),
    );

    Ok(response)
}

/// Core chat forwarding: auth, routing, upstream call, relay.
async fn execute_chat(
    state: &AppState,
    tables: &Tables,
    headers: &HeaderMap,
    request: &ChatCompletionRequest,
) -> Result<Response, Error> {
    // Token check comes first: no upstream call is made for unauthorized callers.
    let token = bearer_token(headers).ok_or(Error::MissingToken)?;
    let Some(description) = tables.token_description(token) else {
        return Err(Error::InvalidToken);
    };

    let (provider_name, upstream_model) =
        registry::split_model(&request.model).ok_or_else(|| Error::MalformedModel {
            model: request.model.clone(),
        })?;

    let provider = tables
        .provider(provider_name)
        .ok_or_else(|| Error::UnknownProvider {
            name: provider_name.to_string(),
        })?;

    tracing::info!(
        token = %description,
        provider = %provider.name,
        model = %upstream_model,
        messages = request.messages.len(),
        stream = ?request.stream,
        "Forwarding chat completion"
    );

    let upstream_request = request.for_upstream(upstream_model);

    let upstream_response = state
        .http_client
        .post(upstream::chat_url(provider))
        .header(header::CONTENT_TYPE, "application/json")
        .bearer_auth(provider.api_key.expose_secret())
        .json(&upstream_request)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(provider = %provider.name, error = %e, "Failed to reach provider");
            Error::Provider(format!(
                "Failed to reach provider '{}': {}",
                provider.name, e
            ))
        })?;

    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);

    let is_event_stream = upstream_response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false);

    if is_event_stream {
        relay_streaming(upstream_response, status, &provider.name)
    } else {
        relay_json(upstream_response, status, &provider.name, &request.model).await
    }
}

/// Extract the bearer value from an Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rewrite the response's `model` field back to the full `provider/model`
/// id the caller asked for.
fn rewrite_model(body: &mut serde_json::Value, full_model: &str) {
    if let Some(obj) = body.as_object_mut() {
        if obj.contains_key("model") {
            obj.insert(
                "model".to_string(),
                serde_json::Value::String(full_model.to_string()),
            );
        }
    }
}

/// Relay a non-streaming upstream response, preserving its status code.
async fn relay_json(
    upstream_response: reqwest::Response,
    status: StatusCode,
    provider_name: &str,
    full_model: &str,
) -> Result<Response, Error> {
    let bytes = upstream_response.bytes().await.map_err(|e| {
        tracing::error!(provider = %provider_name, error = %e, "Failed to read provider response");
        Error::Provider(format!(
            "Failed to read response from '{}': {}",
            provider_name, e
        ))
    })?;

    let mut body: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            if status.is_success() {
                tracing::error!(provider = %provider_name, error = %e, "Failed to parse provider response");
                return Err(Error::Provider(format!(
                    "Failed to parse response from '{}': {}",
                    provider_name, e
                )));
            }
            // Non-JSON error bodies pass through untouched.
            return Ok(Response::builder()
                .status(status)
                .body(Body::from(bytes))
                .unwrap());
        }
    };

    if status.is_success() {
        rewrite_model(&mut body, full_model);
    } else {
        tracing::warn!(
            provider = %provider_name,
            status = %status,
            "Provider returned error status, passing through"
        );
    }

    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap())
}

/// Relay a streaming (SSE) upstream response chunk by chunk.
fn relay_streaming(
    upstream_response: reqwest::Response,
    status: StatusCode,
    provider_name: &str,
) -> Result<Response, Error> {
    let provider_name = provider_name.to_string();

    let stream = upstream_response.bytes_stream().map(move |chunk| {
        if let Err(ref e) = chunk {
            tracing::error!(provider = %provider_name, error = %e, "Error streaming from provider");
        }
        chunk.map_err(std::io::Error::other)
    });

    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .unwrap())
}

/// Handle POST /v1/reload - re-read the provider and token flat files.
///
/// All-or-nothing: both files must parse before the snapshot is swapped, so
/// a broken edit leaves the previous tables serving.
pub async fn reload(State(state): State<AppState>) -> Result<Json<serde_json::Value>, Error> {
    let tables = registry::load_tables(&state.settings)?;
    let providers_count = tables.provider_count();
    let tokens_count = tables.token_count();

    *state.tables.write().await = std::sync::Arc::new(tables);
    *state.models_cache.lock().await = None;

    tracing::info!(
        providers = providers_count,
        tokens = tokens_count,
        "Configuration reloaded"
    );

    Ok(Json(serde_json::json!({
        "message": "configuration reloaded",
        "providers_count": providers_count,
        "tokens_count": tokens_count
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = headers_with_auth("Bearer tok-123");
        assert_eq!(bearer_token(&headers), Some("tok-123"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_value() {
        let headers = headers_with_auth("Bearer ");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_rewrite_model_present() {
        let mut body = serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o",
            "choices": []
        });
        rewrite_model(&mut body, "openai/gpt-4o");
        assert_eq!(body["model"], "openai/gpt-4o");
    }

    #[test]
    fn test_rewrite_model_absent_untouched() {
        let mut body = serde_json::json!({ "id": "chatcmpl-123" });
        rewrite_model(&mut body, "openai/gpt-4o");
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_rewrite_model_non_object_untouched() {
        let mut body = serde_json::json!(["not", "an", "object"]);
        rewrite_model(&mut body, "openai/gpt-4o");
        assert!(body.is_array());
    }
}

//! Integration tests for chat completion forwarding.
//!
//! Verifies that:
//! - The provider prefix selects the upstream and is stripped from the
//!   forwarded model name
//! - The provider's API key is substituted for the client's token
//! - The upstream body round-trips unchanged apart from the model rewrite
//! - Upstream error statuses pass through to the caller
//! - A malformed model (no '/') yields a 400-class error
//! - An unknown provider prefix yields a 404

use axum::body::Body;
use http::Request;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aigate::config::{parse_providers, parse_tokens, Settings};
use aigate::gateway::{create_router, AppState, REQUEST_ID_HEADER};
use aigate::registry::Tables;

fn test_app(providers: &str, tokens: &str) -> axum::Router {
    let providers = parse_providers(providers, "test-providers").unwrap();
    let tokens = parse_tokens(tokens, "test-tokens").unwrap();
    let state = AppState::new(Settings::default(), Tables::new(providers, tokens)).unwrap();
    create_router(state)
}

fn chat_request(model: &str) -> Request<Body> {
    chat_request_with_body(serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": "hello"}]
    }))
}

fn chat_request_with_body(body: serde_json::Value) -> Request<Body> {
    Request::post("/v1/chat/completions")
        .header("content-type", "application/json")
        .header("authorization", "Bearer tok-1")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn parse_body(response: axum::response::Response) -> (http::StatusCode, serde_json::Value) {
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();
    (status, json)
}

#[tokio::test]
async fn test_forwarding_substitutes_key_and_strips_prefix() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-alpha"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": []
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test_app(
        &format!("alpha|{}|sk-alpha\n", upstream.uri()),
        "tester|tok-1\n",
    );

    let response = app.oneshot(chat_request("alpha/gpt-4o")).await.unwrap();
    let (status, _) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::OK);
}

#[tokio::test]
async fn test_response_round_trip_with_model_rewrite() {
    let upstream_body = serde_json::json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "created": 1715367049,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "hi there"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
    });

    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_body.clone()))
        .mount(&upstream)
        .await;

    let app = test_app(
        &format!("alpha|{}|sk-alpha\n", upstream.uri()),
        "tester|tok-1\n",
    );

    let response = app.oneshot(chat_request("alpha/gpt-4o")).await.unwrap();
    assert!(
        response.headers().get(REQUEST_ID_HEADER).is_some(),
        "response should carry a correlation id"
    );
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::OK);
    // Everything except the model id is unchanged.
    assert_eq!(json["model"], "alpha/gpt-4o");
    assert_eq!(json["id"], upstream_body["id"]);
    assert_eq!(json["choices"], upstream_body["choices"]);
    assert_eq!(json["usage"], upstream_body["usage"]);
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "rate limited", "type": "rate_limit_error"}
        })))
        .mount(&upstream)
        .await;

    let app = test_app(
        &format!("alpha|{}|sk-alpha\n", upstream.uri()),
        "tester|tok-1\n",
    );

    let response = app.oneshot(chat_request("alpha/gpt-4o")).await.unwrap();
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["message"], "rate limited");
}

#[tokio::test]
async fn test_unreachable_provider_yields_502() {
    // Port 9 is discard; nothing listens there.
    let app = test_app("alpha|http://127.0.0.1:9|sk-alpha\n", "tester|tok-1\n");

    let response = app.oneshot(chat_request("alpha/gpt-4o")).await.unwrap();
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["type"], "upstream_error");
}

#[tokio::test]
async fn test_malformed_model_yields_400() {
    let app = test_app("alpha|https://alpha.test/v1|sk-alpha\n", "tester|tok-1\n");

    let response = app.oneshot(chat_request("gpt-4o")).await.unwrap();
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["type"], "invalid_request_error");
    assert!(
        json["error"]["message"].as_str().unwrap().contains("gpt-4o"),
        "error should name the model: {}",
        json
    );
}

#[tokio::test]
async fn test_unknown_provider_yields_404() {
    let app = test_app("alpha|https://alpha.test/v1|sk-alpha\n", "tester|tok-1\n");

    let response = app.oneshot(chat_request("nonexistent/gpt-4o")).await.unwrap();
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["type"], "invalid_request_error");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("nonexistent"),
        "error should name the provider: {}",
        json
    );
}

#[tokio::test]
async fn test_model_remainder_with_slashes_forwarded_whole() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "meta/llama-3-70b"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "meta/llama-3-70b",
            "choices": []
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test_app(
        &format!("alpha|{}|sk-alpha\n", upstream.uri()),
        "tester|tok-1\n",
    );

    // Only the first '/' splits provider from model.
    let response = app
        .oneshot(chat_request("alpha/meta/llama-3-70b"))
        .await
        .unwrap();
    let (status, json) = parse_body(response).await;

    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(json["model"], "alpha/meta/llama-3-70b");
}

#[tokio::test]
async fn test_streaming_body_relayed_verbatim() {
    let sse_body = "data: {\"id\":\"chatcmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n";

    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&upstream)
        .await;

    let app = test_app(
        &format!("alpha|{}|sk-alpha\n", upstream.uri()),
        "tester|tok-1\n",
    );

    let body = serde_json::json!({
        "model": "alpha/gpt-4o",
        "messages": [{"role": "user", "content": "hello"}],
        "stream": true
    });
    let response = app.oneshot(chat_request_with_body(body)).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let relayed = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .expect("read body");
    assert_eq!(relayed.as_ref(), sse_body.as_bytes());
}

#[tokio::test]
async fn test_array_content_normalized_before_forwarding() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "hello world"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": []
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = test_app(
        &format!("alpha|{}|sk-alpha\n", upstream.uri()),
        "tester|tok-1\n",
    );

    let body = serde_json::json!({
        "model": "alpha/gpt-4o",
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "text", "text": "world"}
            ]
        }]
    });

    let response = app.oneshot(chat_request_with_body(body)).await.unwrap();
    let (status, _) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::OK);
}

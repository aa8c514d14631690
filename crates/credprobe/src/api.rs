//! HTTP API.
//!
//! Every route under `/api` requires `Authorization: Bearer <token>`.
//! `/health` is open.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use credprobe_core::provider::ProviderEndpoints;
use credprobe_core::{
    BatchJob, CheckKind, CheckOutcome, CheckRecord, CheckService, CheckStats, EmailItem,
    ProxyItem,
};

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    service: Arc<CheckService>,
    token: Arc<str>,
}

/// JSON error body with a status code.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Not authenticated".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Builds the application router.
pub fn router(service: Arc<CheckService>, token: impl Into<Arc<str>>) -> Router {
    let state = AppState {
        service,
        token: token.into(),
    };

    let api = Router::new()
        .route("/check-email", post(check_email))
        .route("/check-proxy", post(check_proxy))
        .route("/batch-check", post(batch_check))
        .route("/batch-status/:job_id", get(batch_status))
        .route("/batches", get(list_batches))
        .route("/provider-config/:email", get(provider_config))
        .route("/results", get(results))
        .route("/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let authorized = matches!(
        presented,
        Some(token) if !state.token.is_empty() && token == &*state.token
    );

    if authorized {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "rejected unauthenticated request");
        ApiError::unauthorized().into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn check_email(
    State(state): State<AppState>,
    body: Option<Json<EmailItem>>,
) -> Result<Json<CheckOutcome>, ApiError> {
    let item = body.map(|Json(item)| item).unwrap_or_default();
    if item.is_incomplete() {
        return Err(ApiError::bad_request("Email and password required"));
    }
    Ok(Json(state.service.check_email(item).await))
}

async fn check_proxy(
    State(state): State<AppState>,
    body: Option<Json<ProxyItem>>,
) -> Result<Json<CheckOutcome>, ApiError> {
    let item = body.map(|Json(item)| item).unwrap_or_default();
    if item.is_incomplete() {
        return Err(ApiError::bad_request("Host and port required"));
    }
    Ok(Json(state.service.check_proxy(item).await))
}

#[derive(Debug, Default, Deserialize)]
struct BatchRequest {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    items: Option<Vec<Value>>,
}

async fn batch_check(
    State(state): State<AppState>,
    body: Option<Json<BatchRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let (Some(kind), Some(items)) = (request.kind, request.items) else {
        return Err(ApiError::bad_request("Items and type required"));
    };
    if items.is_empty() || kind.trim().is_empty() {
        return Err(ApiError::bad_request("Items and type required"));
    }
    let kind: CheckKind = kind.parse().map_err(ApiError::bad_request)?;

    let job_id = state
        .service
        .submit_batch(kind, items)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(json!({ "job_id": job_id })))
}

async fn batch_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<BatchJob>, ApiError> {
    state
        .service
        .batch_status(&job_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

async fn list_batches(State(state): State<AppState>) -> Json<Vec<BatchJob>> {
    Json(state.service.batches())
}

async fn provider_config(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Json<ProviderEndpoints> {
    Json(state.service.provider_config(&email))
}

async fn results(State(state): State<AppState>) -> Json<Vec<CheckRecord>> {
    Json(state.service.results())
}

async fn stats(State(state): State<AppState>) -> Json<CheckStats> {
    Json(state.service.stats())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use credprobe_core::verify::Checker;
    use credprobe_core::{EmailCheckRequest, MemoryStore, ProviderRegistry, ProxyCheckRequest};
    use reqwest::Client;

    use super::*;

    const TOKEN: &str = "test-token";

    /// Accepts the password "good"; every proxy on port 3128 works.
    struct FakeChecker;

    #[async_trait]
    impl Checker for FakeChecker {
        async fn check_email(&self, request: &EmailCheckRequest) -> CheckOutcome {
            if request.secret == "good" {
                CheckOutcome::success(format!(
                    "{} authentication successful",
                    request.protocol.label()
                ))
            } else {
                CheckOutcome::failed("Authentication failed - invalid credentials")
            }
        }

        async fn check_proxy(&self, request: &ProxyCheckRequest) -> CheckOutcome {
            match request.port.resolve() {
                Err(message) => CheckOutcome::invalid(message),
                Ok(3128) => CheckOutcome::success("HTTP proxy is working"),
                Ok(port) => {
                    CheckOutcome::failed(format!("Connection failed to {}:{port}", request.host))
                }
            }
        }
    }

    async fn spawn_app() -> String {
        let service = Arc::new(CheckService::new(
            Arc::new(ProviderRegistry::builtin()),
            Arc::new(FakeChecker),
            Arc::new(MemoryStore::new()),
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(service, TOKEN)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_json(base: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let response = Client::new()
            .post(format!("{base}{path}"))
            .bearer_auth(TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    async fn get_json(base: &str, path: &str) -> (StatusCode, Value) {
        let response = Client::new()
            .get(format!("{base}{path}"))
            .bearer_auth(TOKEN)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let base = spawn_app().await;
        let response = Client::new().get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let base = spawn_app().await;
        let client = Client::new();

        let response = client.get(format!("{base}/api/stats")).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 401);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Not authenticated");

        let response = client
            .get(format!("{base}/api/stats"))
            .bearer_auth("wrong")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn test_check_email() {
        let base = spawn_app().await;

        let (status, body) = post_json(
            &base,
            "/api/check-email",
            json!({"email": "a@gmail.com", "password": "good", "protocol": "imap"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "IMAP authentication successful");

        let (status, body) =
            post_json(&base, "/api/check-email", json!({"email": "a@gmail.com"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password required");

        let (status, body) = post_json(
            &base,
            "/api/check-email",
            json!({"email": "a@gmail.com", "password": "good", "protocol": "ftp"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "invalid");
        assert_eq!(body["message"], "Unknown protocol: ftp");
    }

    #[tokio::test]
    async fn test_check_proxy() {
        let base = spawn_app().await;

        let (status, body) = post_json(
            &base,
            "/api/check-proxy",
            json!({"host": "10.0.0.1", "port": "3128"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (status, body) =
            post_json(&base, "/api/check-proxy", json!({"host": "10.0.0.1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Host and port required");

        let (status, body) = post_json(
            &base,
            "/api/check-proxy",
            json!({"host": "10.0.0.1", "port": 70000}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "invalid");
        assert_eq!(body["message"], "Invalid port number");

        let (status, body) = post_json(
            &base,
            "/api/check-proxy",
            json!({"host": "10.0.0.1", "port": 1080, "type": "gopher"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Unsupported proxy type: gopher");
    }

    #[tokio::test]
    async fn test_batch_lifecycle() {
        let base = spawn_app().await;

        let (status, body) = post_json(
            &base,
            "/api/batch-check",
            json!({
                "type": "email",
                "items": [
                    {"email": "a@gmail.com", "password": "good"},
                    {"email": "b@gmail.com"},
                    {"email": "c@yahoo.com", "password": "bad", "protocol": "pop3"},
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert!(job_id.starts_with("batch_"));

        let mut job = Value::Null;
        for _ in 0..200 {
            let (status, body) = get_json(&base, &format!("/api/batch-status/{job_id}")).await;
            assert_eq!(status, StatusCode::OK);
            job = body;
            if job["status"] == "completed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(job["status"], "completed");
        assert_eq!(job["progress"], 3);
        assert_eq!(job["total"], 3);
        assert_eq!(job["results"][0]["status"], "success");
        assert_eq!(job["results"][1]["status"], "invalid");
        assert_eq!(job["results"][2]["status"], "failed");
        assert_eq!(job["results"][2]["target"], "c@yahoo.com");

        let (status, body) = get_json(&base, "/api/batches").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_validation_and_unknown_job() {
        let base = spawn_app().await;

        let (status, body) =
            post_json(&base, "/api/batch-check", json!({"type": "email", "items": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Items and type required");

        let (status, _) = post_json(&base, "/api/batch-check", json!({"items": [{}]})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            post_json(&base, "/api/batch-check", json!({"type": "sms", "items": [{}]})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown check type: sms");

        let (status, body) = get_json(&base, "/api/batch-status/batch_missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Job not found");
    }

    #[tokio::test]
    async fn test_provider_config() {
        let base = spawn_app().await;

        let (status, body) = get_json(&base, "/api/provider-config/someone@gmail.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["smtp"]["host"], "smtp.gmail.com");
        assert_eq!(body["smtp"]["port"], 587);
        assert_eq!(body["imap"]["encrypted"], true);

        let (status, body) = get_json(&base, "/api/provider-config/someone@example.org").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_results_and_stats() {
        let base = spawn_app().await;
        post_json(
            &base,
            "/api/check-email",
            json!({"email": "a@gmail.com", "password": "good"}),
        )
        .await;
        post_json(
            &base,
            "/api/check-proxy",
            json!({"host": "10.0.0.1", "port": 8080}),
        )
        .await;

        let (status, body) = get_json(&base, "/api/results").await;
        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["kind"], "email");
        assert_eq!(records[1]["target"], "10.0.0.1:8080");

        let (_, stats) = get_json(&base, "/api/stats").await;
        assert_eq!(stats["total_email_checks"], 1);
        assert_eq!(stats["total_proxy_checks"], 1);
        assert_eq!(stats["total_checks"], 2);
        assert_eq!(stats["success_rate"], 50.0);
    }
}

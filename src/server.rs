// src/server.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::context::ReconContext;
use crate::core::models::{PortScanRequest, ReputationRequest, SubdomainRequest};
use crate::core::reputation::check_reputation;
use crate::core::scanner::port_scanner::run_port_scan;
use crate::core::subdomain::discover_subdomains;
use crate::error::ReconError;

type SharedContext = Arc<ReconContext>;

/// Builds the API router. Every operation is POST-only; other methods get a 405 body.
pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/api/port-scan", post(port_scan).fallback(method_not_allowed))
        .route("/api/ip-reputation", post(ip_reputation).fallback(method_not_allowed))
        .route("/api/subdomains", post(subdomains).fallback(method_not_allowed))
        .route("/health", get(health))
        .with_state(ctx)
}

/// Binds `bind` and serves the API until the process is stopped.
pub async fn serve(ctx: SharedContext, bind: &str) -> Result<(), ReconError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| ReconError::Config(format!("cannot bind {}: {}", bind, e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| ReconError::Internal(e.to_string()))?;
    info!(address = %local, "HTTP API listening.");

    axum::serve(listener, router(ctx).into_make_service())
        .await
        .map_err(|e| ReconError::Internal(format!("server stopped: {}", e)))
}

async fn port_scan(
    State(ctx): State<SharedContext>,
    body: Result<Json<PortScanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let report = run_port_scan(&ctx, request).await?;
    Ok(Json(report))
}

async fn ip_reputation(
    State(ctx): State<SharedContext>,
    body: Result<Json<ReputationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let verdict = check_reputation(&ctx, request.ip.as_deref()).await?;
    Ok(Json(verdict))
}

async fn subdomains(
    State(ctx): State<SharedContext>,
    body: Result<Json<SubdomainRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let report = discover_subdomains(&ctx, request.domain.as_deref()).await?;
    Ok(Json(report))
}

async fn health(State(ctx): State<SharedContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": ctx.cache.stats().await,
        "timestamp": Utc::now(),
    }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    MethodNotAllowed,
    InternalError(String),
}

impl From<ReconError> for ApiError {
    fn from(err: ReconError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::InternalError(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let timestamp = Utc::now();
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                warn!(error = %msg, "Rejected API request.");
                (
                    StatusCode::BAD_REQUEST,
                    serde_json::json!({ "error": msg, "timestamp": timestamp }),
                )
            }
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                serde_json::json!({ "error": "Method Not Allowed", "timestamp": timestamp }),
            ),
            ApiError::InternalError(details) => {
                error!(error = %details, "API request failed.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({
                        "error": "Internal Server Error",
                        "message": "An unexpected error occurred while processing the request.",
                        "details": details,
                        "timestamp": timestamp,
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::reputation::sources::ReputationSource;
    use crate::core::scanner::port_scanner::tests::ScriptedConnector;
    use crate::core::subdomain::tests::ZoneDns;
    use serde_json::Value;

    fn context(settings: Settings) -> SharedContext {
        let dns = ZoneDns::with(&[
            ("example.com", "192.0.2.10"),
            ("www.example.com", "192.0.2.10"),
        ]);
        Arc::new(
            ReconContext::builder(settings)
                .dns(Arc::new(dns))
                .connector(Arc::new(ScriptedConnector::only_open(&[443])))
                .sources(Vec::<Arc<dyn ReputationSource>>::new())
                .passive_sources(Vec::new())
                .build()
                .unwrap(),
        )
    }

    async fn spawn(settings: Settings) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(context(settings));
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn post_json(base: &str, path: &str, body: Value) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn missing_host_is_a_bad_request() {
        let base = spawn(Settings::default()).await;
        let (status, body) = post_json(&base, "/api/port-scan", serde_json::json!({})).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Host is required");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn port_scan_reports_camel_case_fields() {
        let base = spawn(Settings::default()).await;
        let (status, body) = post_json(
            &base,
            "/api/port-scan",
            serde_json::json!({ "host": "example.com", "scanType": "range", "ports": [80, 443] }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["ip"], "192.0.2.10");
        assert_eq!(body["openPorts"], 1);
        assert_eq!(body["scanResults"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_on_an_operation_is_method_not_allowed() {
        let base = spawn(Settings::default()).await;
        let response = reqwest::get(format!("{}/api/ip-reputation", base)).await.unwrap();
        assert_eq!(response.status().as_u16(), 405);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Method Not Allowed");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn private_address_reputation_short_circuits() {
        let base = spawn(Settings::default()).await;
        let (status, body) =
            post_json(&base, "/api/ip-reputation", serde_json::json!({ "ip": "192.168.1.20" })).await;
        assert_eq!(status, 200);
        assert_eq!(body["is_private"], true);
        assert_eq!(body["threat_level"], "low");
        assert_eq!(body["confidence_score"], 0);
    }

    #[tokio::test]
    async fn malformed_ip_is_a_bad_request() {
        let base = spawn(Settings::default()).await;
        let (status, _) =
            post_json(&base, "/api/ip-reputation", serde_json::json!({ "ip": "999.1.1.1" })).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn subdomains_endpoint_lists_resolving_names() {
        let base = spawn(Settings::default()).await;
        let (status, body) =
            post_json(&base, "/api/subdomains", serde_json::json!({ "domain": "example.com" })).await;
        assert_eq!(status, 200);
        assert_eq!(body["totalFound"], 1);
        assert_eq!(body["subdomains"][0]["subdomain"], "www");
        assert_eq!(body["subdomains"][0]["records"]["A"][0], "192.0.2.10");
    }

    #[tokio::test]
    async fn invalid_json_is_a_bad_request() {
        let base = spawn(Settings::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/subdomains", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn scheduler_misconfiguration_is_an_internal_error() {
        let mut settings = Settings::default();
        settings.ports.workers = 0;
        let base = spawn(settings).await;
        let (status, body) =
            post_json(&base, "/api/port-scan", serde_json::json!({ "host": "example.com" })).await;
        assert_eq!(status, 500);
        assert_eq!(body["error"], "Internal Server Error");
        assert!(body["details"].as_str().unwrap().contains("Scheduler"));
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn health_reports_version() {
        let base = spawn(Settings::default()).await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["cache"]["entries"], 0);
    }
}

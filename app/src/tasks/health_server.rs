use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

use super::TaskHandler;
use crate::{Data, Error};

#[derive(Clone)]
struct ServerState {
    started_at: Instant,
}

pub struct HealthServerTask {
    port: u16,
}

impl HealthServerTask {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl TaskHandler for HealthServerTask {
    fn name(&self) -> &'static str {
        "Health Server"
    }

    async fn run(&mut self, _ctx: &serenity::Context, data: Data) -> Result<(), Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("🌐 Web server running on port {}", self.port);
        info!("📊 Health check: http://localhost:{}/health", self.port);
        axum::serve(listener, router(data.started_at)).await?;
        Ok(())
    }
}

fn router(started_at: Instant) -> Router {
    Router::new()
        .route("/", get(index).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .route("/webhook", post(webhook).fallback(not_found))
        .fallback(not_found)
        .with_state(ServerState { started_at })
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": "Latesh Analysis",
        "description": "Discord bot for FRC match analysis and webhook management",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
        "endpoints": {
            "health": "/health",
            "webhook": "/webhook"
        }
    }))
}

async fn health(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn webhook(body: Bytes) -> Json<Value> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&body).into_owned())
    });
    info!("Webhook received: {payload}");
    Json(json!({
        "success": true,
        "message": "Webhook received",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested endpoint does not exist"
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(Instant::now()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let (status, body) = call(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["endpoints"]["health"], "/health");
    }

    #[tokio::test]
    async fn health_reports_uptime() {
        let (status, body) = call(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn webhook_accepts_json() {
        let req = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"event":"match_score"}"#))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Webhook received");
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let (status, body) = call(Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
    }

    #[tokio::test]
    async fn wrong_method_is_json_404() {
        for req in [
            Request::get("/webhook").body(Body::empty()).unwrap(),
            Request::post("/health").body(Body::empty()).unwrap(),
            Request::post("/").body(Body::empty()).unwrap(),
        ] {
            let (status, body) = call(req).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "The requested endpoint does not exist");
        }
    }

    #[test]
    fn version_matches_package() {
        assert_eq!(env!("CARGO_PKG_VERSION"), "1.0.0");
    }
}

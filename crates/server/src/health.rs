use axum::{http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub detail: String,
    pub checked_at: String,
}

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        detail: "parley-server runtime initialized".to_string(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, Json};

    use crate::health::health;

    #[tokio::test]
    async fn health_reports_ready() {
        let (status, Json(payload)) = health().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert!(!payload.checked_at.is_empty());
    }
}

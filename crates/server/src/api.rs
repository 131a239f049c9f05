//! The gateway's single inbound endpoint.
//!
//! `POST /` accepts `{"message": <text>}` (the capitalized `Message` form is
//! accepted for older callers, and an optional `session` field overrides the
//! configured default session id), forwards the text to the NLU engine, and
//! responds with the reshaped result:
//!
//! ```json
//! { "intent": "...", "text": "...", "confidence": 0.87, "entities": { "drink": "Coffee" } }
//! ```

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use parley_core::NlpResult;
use parley_nlu::NluEngine;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Clone)]
pub struct GatewayState {
    engine: Arc<dyn NluEngine>,
    default_session: String,
}

impl GatewayState {
    pub fn new(engine: Arc<dyn NluEngine>, default_session: String) -> Self {
        Self { engine, default_session }
    }
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(alias = "Message")]
    pub message: String,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GatewayError {
    pub error: String,
}

pub fn router(state: GatewayState) -> Router {
    Router::new().route("/", post(detect)).with_state(state)
}

pub async fn detect(
    State(state): State<GatewayState>,
    Json(inbound): Json<InboundMessage>,
) -> Result<Json<NlpResult>, (StatusCode, Json<GatewayError>)> {
    let session = inbound.session.as_deref().unwrap_or(&state.default_session);

    match state.engine.detect_intent(session, &inbound.message).await {
        Ok(query) => {
            let result = NlpResult::from(query);
            info!(
                event_name = "gateway.detect.completed",
                session_id = %session,
                intent = %result.intent,
                confidence = result.confidence,
                fulfillment_text = %result.text,
                "detect intent completed"
            );
            Ok(Json(result))
        }
        Err(engine_error) => {
            error!(
                event_name = "gateway.detect.engine_failed",
                session_id = %session,
                error = %engine_error,
                "engine call failed"
            );
            Err((
                StatusCode::BAD_GATEWAY,
                Json(GatewayError { error: "language engine call failed".to_string() }),
            ))
        }
    }
}

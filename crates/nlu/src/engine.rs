//! Engine client seam and the Dialogflow-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::config::NluConfig;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

use crate::wire::{
    DetectIntentRequest, DetectIntentResponse, QueryInput, QueryParameters, QueryResult, TextInput,
};

const STATUS_DETAIL_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum NluError {
    #[error("engine client construction failed: {0}")]
    Build(#[source] reqwest::Error),
    #[error("engine request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("engine rejected the request with status {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("engine response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Detect-intent seam so the gateway can run against a scripted engine in
/// tests and a remote engine in production.
#[async_trait]
pub trait NluEngine: Send + Sync {
    async fn detect_intent(&self, session_id: &str, text: &str) -> Result<QueryResult, NluError>;
}

/// REST client for the Dialogflow v2 `Sessions.DetectIntent` call.
pub struct DialogflowEngine {
    client: Client,
    base_url: String,
    project_id: String,
    access_token: SecretString,
    language: String,
    time_zone: String,
}

impl DialogflowEngine {
    pub fn from_config(config: &NluConfig) -> Result<Self, NluError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(NluError::Build)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            project_id: config.project_id.clone(),
            access_token: config.access_token.clone(),
            language: config.language.clone(),
            time_zone: config.time_zone.clone(),
        })
    }

    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.base_url, self.project_id, session_id
        )
    }
}

#[async_trait]
impl NluEngine for DialogflowEngine {
    async fn detect_intent(&self, session_id: &str, text: &str) -> Result<QueryResult, NluError> {
        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput { text: text.to_owned(), language_code: self.language.clone() },
            },
            query_params: Some(QueryParameters { time_zone: self.time_zone.clone() }),
        };

        debug!(
            event_name = "nlu.detect_intent.request",
            session_id = %session_id,
            language = %self.language,
            "sending detect intent request"
        );

        let response = self
            .client
            .post(self.session_url(session_id))
            .bearer_auth(self.access_token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(NluError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NluError::Status { status, detail: excerpt(&detail) });
        }

        let decoded: DetectIntentResponse = response.json().await.map_err(NluError::Decode)?;
        Ok(decoded.query_result)
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(STATUS_DETAIL_LIMIT).collect()
}

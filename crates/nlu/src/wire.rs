//! Wire types for the engine's REST `detectIntent` call, plus the reshaping
//! of a query result into the simplified [`NlpResult`] contract.

use std::collections::BTreeMap;

use parley_core::{flatten_parameters, NlpResult, StructuredValue};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentRequest {
    pub query_input: QueryInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_params: Option<QueryParameters>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    pub text: TextInput,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInput {
    pub text: String,
    pub language_code: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    pub time_zone: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectIntentResponse {
    pub response_id: String,
    pub query_result: QueryResult,
}

/// The subset of the engine's query result the gateway consumes.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub query_text: String,
    pub fulfillment_text: String,
    pub intent: Option<Intent>,
    pub intent_detection_confidence: f32,
    pub parameters: BTreeMap<String, StructuredValue>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Intent {
    pub name: String,
    pub display_name: String,
    pub is_fallback: bool,
}

impl From<QueryResult> for NlpResult {
    /// A result without a matched intent degrades to an empty intent and
    /// fulfillment text with zero confidence; entities are always flattened.
    fn from(query: QueryResult) -> Self {
        let entities = flatten_parameters(&query.parameters);

        match query.intent {
            Some(intent) => NlpResult {
                intent: intent.display_name,
                text: query.fulfillment_text,
                confidence: query.intent_detection_confidence,
                entities,
            },
            None => NlpResult { entities, ..NlpResult::default() },
        }
    }
}

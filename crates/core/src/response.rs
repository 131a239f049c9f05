//! Simplified result shape returned to gateway callers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::entities::{flatten, StructuredValue};

/// Parameter name to flattened value, built fresh per request.
pub type EntityTable = BTreeMap<String, String>;

/// The reshaped NLU response serialized back to the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NlpResult {
    pub intent: String,
    pub text: String,
    pub confidence: f32,
    pub entities: EntityTable,
}

/// Flattens every named parameter of a response into the entity table.
/// Entries that flatten to the empty string are kept; callers rely on every
/// parameter name being present.
pub fn flatten_parameters(parameters: &BTreeMap<String, StructuredValue>) -> EntityTable {
    parameters.iter().map(|(name, value)| (name.clone(), flatten(value))).collect()
}

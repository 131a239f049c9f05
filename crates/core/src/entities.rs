//! Flattening of the engine's dynamically typed parameter values.
//!
//! The NLU engine returns each matched parameter as an arbitrarily nested
//! tree of null/string/number/boolean/object/list nodes. Gateway callers
//! consume a flat `name -> string` table instead, so every tree is collapsed
//! into a single string here. Flattening never fails: kinds without a
//! defined rendering degrade to the empty string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of the engine's structured-parameter tree.
///
/// Deserialized straight from the JSON encoding of the engine's parameter
/// struct. The tree is finite by construction of the response format, so
/// recursion over it terminates.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StructuredValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(BTreeMap<String, StructuredValue>),
    List(Vec<StructuredValue>),
}

/// Object keys that contribute to a flattened composite value, checked in
/// this fixed sequence so the output is deterministic regardless of the
/// object's own field ordering.
const RECOGNIZED_KEYS: [&str; 3] = ["amount", "unit", "date_time"];

/// Collapses one parameter value into a single flat entity string.
///
/// Numbers render with fixed six decimal places and no exponent. Objects
/// contribute only their recognized keys, each followed by a newline. Lists
/// flatten every element in order but keep only the last result; earlier
/// elements are computed and discarded. Downstream consumers depend on that
/// exact last-element shape, so it is part of the contract here.
pub fn flatten(value: &StructuredValue) -> String {
    match value {
        StructuredValue::Null => String::new(),
        StructuredValue::Bool(flag) => flag.to_string(),
        StructuredValue::Number(number) => format_number(*number),
        StructuredValue::String(text) => text.clone(),
        StructuredValue::Object(fields) => {
            let mut flattened = String::new();
            for key in RECOGNIZED_KEYS {
                match fields.get(key) {
                    Some(StructuredValue::Number(number)) => {
                        flattened.push_str(&format_number(*number));
                        flattened.push('\n');
                    }
                    Some(StructuredValue::String(text)) => {
                        flattened.push_str(text);
                        flattened.push('\n');
                    }
                    _ => {}
                }
            }
            flattened
        }
        StructuredValue::List(items) => {
            let mut flattened = String::new();
            for item in items {
                flattened = flatten(item);
            }
            flattened
        }
    }
}

fn format_number(number: f64) -> String {
    format!("{number:.6}")
}

pub mod engine;
pub mod wire;

pub use engine::{DialogflowEngine, NluEngine, NluError};
pub use wire::{DetectIntentRequest, DetectIntentResponse, Intent, QueryResult};

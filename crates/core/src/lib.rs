pub mod config;
pub mod entities;
pub mod response;

pub use entities::{flatten, StructuredValue};
pub use response::{flatten_parameters, EntityTable, NlpResult};

//! Domain layer for Taxonomist
//!
//! Core models, error types and the port traits adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AttemptError, ClassifierError, ClassifyError, ClassifyResult, ResponseError};

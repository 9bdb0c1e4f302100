//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON console output
//! - JSON file output with rotation

pub mod logger;

pub use logger::LoggerImpl;

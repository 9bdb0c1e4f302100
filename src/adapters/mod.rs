//! Adapters for external systems.

pub mod classifiers;

//! Port trait definitions (Hexagonal Architecture)
//!
//! - ClassifierClient: one call to the external generative classifier
//! - PromptBuilder: structured request to prompt text
//! - Clock: injectable wall clock

pub mod classifier_client;
pub mod clock;
pub mod prompt_builder;

pub use classifier_client::{ClassifierClient, ClassifierResponse};
pub use clock::{Clock, ManualClock, SystemClock};
pub use prompt_builder::{
    BatchRequest, Prompt, PromptBuilder, TaxonomyFileSummary, TaxonomyRequest,
};

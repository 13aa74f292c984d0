//! Detection engine
//!
//! ```text
//!   DetectionRequest ─► FeatureExtractor ─► Orchestrator ─► Verdict
//!                                              │
//!                   providers ─ local heuristic ─ simulation
//! ```

pub mod extract;
pub mod features;
pub mod heuristic;
pub mod orchestrator;
pub mod providers;
pub mod simulation;
pub mod verdict;

pub use extract::{FeatureExtractor, MediaExtractor};
pub use features::{ExtractError, FeatureMap};
pub use orchestrator::Orchestrator;
pub use providers::ProviderSet;
pub use verdict::{DetectionRequest, MediaType, Verdict};

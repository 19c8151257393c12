//! The Generation Coordinator and Recommendation Cache (spec §4.G, §4.H):
//! the front door over the Job Store and Queue Orchestrator, and the
//! single-flight cache over similarity computations.

mod cache;
mod coordinator;
mod prompt;

pub use cache::{CacheSettings, RecommendationCache, RecommendationSource, SharedSource};
pub use coordinator::{
    AdapterSelector, CoordinatorSettings, GenerateRequest, GenerationCoordinator, LoraSelection,
};
pub use prompt::{compose, order_selection, SelectedAdapter};

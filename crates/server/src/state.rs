//! Shared application state handed to every route handler.
//!
//! Every field is already cheaply cloneable (`Arc`-backed internally, the
//! same shape `JobStore`/`AdapterCatalog` use elsewhere in the workspace),
//! so `AppState` itself derives `Clone` rather than wrapping a second `Arc`
//! around an inner struct.

use loraflow_adapters::AdapterCatalog;
use loraflow_broadcaster::ProgressBroadcaster;
use loraflow_coordinator::{RecommendationCache, SharedSource};
use loraflow_core::SystemClock;
use loraflow_coordinator::GenerationCoordinator;
use loraflow_queue::QueueOrchestrator;
use loraflow_store::JobStore;
use loraflow_worker::CancellationRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: JobStore,
    pub catalog: AdapterCatalog,
    pub queue: Arc<QueueOrchestrator>,
    pub coordinator: Arc<GenerationCoordinator<SystemClock>>,
    pub broadcaster: ProgressBroadcaster<SystemClock>,
    pub cache: RecommendationCache<SystemClock>,
    pub similarity: SharedSource,
    pub cancellations: CancellationRegistry,
}

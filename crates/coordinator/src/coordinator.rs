use crate::prompt::{compose, order_selection, SelectedAdapter};
use loraflow_adapters::AdapterCatalog;
use loraflow_core::{Adapter, AdapterId, Clock, CoreError, GenerationParams, Job, JobId, JobMode};
use loraflow_queue::QueueOrchestrator;
use loraflow_store::JobStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Which adapters a `generate` request applies (spec §4.G).
#[derive(Debug, Clone)]
pub enum LoraSelection {
    /// Use every adapter currently marked active in the catalog.
    Implicit,
    /// Use exactly these adapters, each optionally at an overridden weight.
    /// May name inactive adapters; the catalog lookup still succeeds, it
    /// just affects composition order (spec §4.G ordering rule).
    Explicit(Vec<AdapterSelector>),
}

#[derive(Debug, Clone)]
pub struct AdapterSelector {
    pub adapter_id: AdapterId,
    pub weight_override: Option<f64>,
}

/// Input to [`GenerationCoordinator::generate`] (spec §4.G request contract).
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub negative_prompt: Option<String>,
    pub params: GenerationParams,
    pub mode: JobMode,
    pub lora_selection: LoraSelection,
}

/// Tunables for one coordinator (spec §4.G, expanded spec §1.3).
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub immediate_mode_deadline: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self { immediate_mode_deadline: Duration::from_secs(5) }
    }
}

/// Thin, synchronous front door over the Job Store and Queue Orchestrator
/// (spec §4.G). Owns no persistent state of its own.
pub struct GenerationCoordinator<C> {
    store: JobStore,
    queue: Arc<QueueOrchestrator>,
    catalog: AdapterCatalog,
    clock: C,
    settings: CoordinatorSettings,
}

impl<C: Clock> GenerationCoordinator<C> {
    pub fn new(
        store: JobStore,
        queue: Arc<QueueOrchestrator>,
        catalog: AdapterCatalog,
        clock: C,
        settings: CoordinatorSettings,
    ) -> Self {
        Self { store, queue, catalog, clock, settings }
    }

    /// Validate, compose, create, and dispatch one generation request.
    ///
    /// In `immediate` mode, waits up to `immediate_mode_deadline` for the
    /// job to leave `queued`; on timeout returns the job snapshot as-is
    /// (still `queued`) rather than failing the request (spec §4.G).
    pub async fn generate(&self, request: GenerateRequest) -> Result<Job, CoreError> {
        request
            .params
            .validate()
            .map_err(CoreError::InvalidParameters)?;

        let selected = order_selection(self.resolve_selection(&request.lora_selection)?);
        let prompt = compose(request.prefix.as_deref(), request.suffix.as_deref(), &selected);
        let adapter_ids = selected.iter().map(|s| s.adapter.id.clone()).collect();

        let job = Job::new(
            JobId::new(),
            prompt,
            request.negative_prompt,
            request.mode,
            request.params,
            adapter_ids,
            &self.clock,
        );
        let job_id = job.id.clone();
        self.store.create(job).map_err(CoreError::from)?;
        self.queue.submit(job_id.clone()).await?;

        if request.mode == JobMode::Immediate {
            self.await_dispatch(&job_id).await
        } else {
            self.store.get(&job_id).map_err(CoreError::from)
        }
    }

    /// Best-effort cancellation request: records intent via the job store
    /// by rejecting an already-terminal job with `invalid_transition`-style
    /// feedback to the caller (the actual cascade to the poll loop is the
    /// delivery worker's `CancellationRegistry`, which callers reach
    /// through the same handle wired at process start).
    pub fn cancelable(&self, job_id: &JobId) -> Result<Job, CoreError> {
        let job = self.store.get(job_id)?;
        if job.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "job {job_id} is already {}",
                job.status
            )));
        }
        Ok(job)
    }

    fn resolve_selection(&self, selection: &LoraSelection) -> Result<Vec<SelectedAdapter>, CoreError> {
        match selection {
            LoraSelection::Implicit => Ok(self
                .catalog
                .list_active()
                .into_iter()
                .map(|adapter| {
                    let weight = adapter.weight;
                    SelectedAdapter { adapter, weight }
                })
                .collect()),
            LoraSelection::Explicit(selectors) => selectors
                .iter()
                .map(|selector| self.resolve_one(selector))
                .collect(),
        }
    }

    fn resolve_one(&self, selector: &AdapterSelector) -> Result<SelectedAdapter, CoreError> {
        let adapter: Adapter = self
            .catalog
            .get(&selector.adapter_id)
            .ok_or_else(|| CoreError::UnknownAdapter(selector.adapter_id.to_string()))?;
        if adapter.file_path.is_empty() {
            return Err(CoreError::UnknownAdapter(format!(
                "{} has no file_path",
                selector.adapter_id
            )));
        }
        let weight = selector.weight_override.unwrap_or(adapter.weight);
        Ok(SelectedAdapter { adapter, weight })
    }

    async fn await_dispatch(&self, job_id: &JobId) -> Result<Job, CoreError> {
        let deadline = self.clock.now()
            + chrono::Duration::from_std(self.settings.immediate_mode_deadline).unwrap_or_default();
        loop {
            let job = self.store.get(job_id)?;
            if job.status != loraflow_core::CanonicalStatus::Queued {
                return Ok(job);
            }
            if self.clock.now() >= deadline {
                info!(%job_id, "immediate mode deadline elapsed before dispatch, returning queued snapshot");
                return Ok(job);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

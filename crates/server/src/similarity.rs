//! Stand-in [`RecommendationSource`] for the Recommendation Cache.
//!
//! Computing genuine similarity scores requires an ML embedding pipeline,
//! which is explicitly out of scope here (spec §7/§9): the cache only ever
//! consumes a `compute` function injected from outside. This implementation
//! is that external collaborator for a workspace with no embedding service
//! configured — it ranks by catalog order rather than learned similarity,
//! so `loraflow-server` has a working recommendations endpoint out of the
//! box. A deployment with a real embedding service swaps this for another
//! `RecommendationSource` impl without touching the cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loraflow_adapters::AdapterCatalog;
use loraflow_coordinator::RecommendationSource;
use loraflow_core::{Clock, FingerprintKind, RecommendationFingerprint};
use serde::Serialize;

#[derive(Serialize)]
struct RecommendationItem {
    adapter_id: String,
    name: String,
    score: f64,
}

#[derive(Serialize)]
struct RecommendationPayload {
    items: Vec<RecommendationItem>,
    cached_at: DateTime<Utc>,
}

pub struct CatalogSimilaritySource<C> {
    catalog: AdapterCatalog,
    clock: C,
}

impl<C: Clock> CatalogSimilaritySource<C> {
    pub fn new(catalog: AdapterCatalog, clock: C) -> Self {
        Self { catalog, clock }
    }
}

#[async_trait]
impl<C: Clock> RecommendationSource for CatalogSimilaritySource<C> {
    async fn compute(&self, fingerprint: &RecommendationFingerprint) -> Vec<u8> {
        let k = fingerprint.k.max(1) as usize;
        let active = self.catalog.list_active();

        let items: Vec<RecommendationItem> = match fingerprint.kind {
            FingerprintKind::ByAdapter => {
                let target = fingerprint.target_id_or_prompt_hash.as_str();
                active
                    .into_iter()
                    .filter(|adapter| adapter.id.as_str() != target)
                    .take(k)
                    .map(|adapter| RecommendationItem {
                        adapter_id: adapter.id.to_string(),
                        name: adapter.name,
                        score: 1.0,
                    })
                    .collect()
            }
            FingerprintKind::ByPrompt => active
                .into_iter()
                .take(k)
                .map(|adapter| RecommendationItem {
                    adapter_id: adapter.id.to_string(),
                    name: adapter.name,
                    score: 1.0,
                })
                .collect(),
        };

        let payload = RecommendationPayload { items, cached_at: self.clock.now() };
        serde_json::to_vec(&payload).unwrap_or_default()
    }
}

//! `/jobs` routes (spec §6).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use loraflow_coordinator::{AdapterSelector, GenerateRequest, LoraSelection};
use loraflow_core::{AdapterId, CanonicalStatus, CoreError, GenerationParams, Job, JobId, JobMode};
use loraflow_store::JobFilter;
use serde::{Deserialize, Serialize};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct AdapterSelectorBody {
    pub adapter_id: String,
    #[serde(default)]
    pub weight_override: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequestBody {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    pub params: GenerationParams,
    #[serde(default = "default_mode")]
    pub mode: JobMode,
    /// Explicit adapter selection; omitted means "every active adapter"
    /// (spec §4.G implicit selection).
    #[serde(default)]
    pub adapters: Option<Vec<AdapterSelectorBody>>,
}

fn default_mode() -> JobMode {
    JobMode::Queued
}

impl From<GenerateRequestBody> for GenerateRequest {
    fn from(body: GenerateRequestBody) -> Self {
        let lora_selection = match body.adapters {
            Some(selectors) => LoraSelection::Explicit(
                selectors
                    .into_iter()
                    .map(|s| AdapterSelector {
                        adapter_id: AdapterId::from_string(s.adapter_id),
                        weight_override: s.weight_override,
                    })
                    .collect(),
            ),
            None => LoraSelection::Implicit,
        };
        GenerateRequest {
            prefix: body.prefix,
            suffix: body.suffix,
            negative_prompt: body.negative_prompt,
            params: body.params,
            mode: body.mode,
            lora_selection,
        }
    }
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequestBody>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let job = state.coordinator.generate(body.into()).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state.store.get(&JobId::from_string(id)).map_err(CoreError::from)?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<CanonicalStatus>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<JobListResponse> {
    let filter = JobFilter {
        status: query.status,
        limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT),
        cursor: query.cursor.map(JobId::from_string),
    };
    Json(JobListResponse { jobs: state.store.list(&filter) })
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let job_id = JobId::from_string(id);
    match state.coordinator.cancelable(&job_id) {
        Ok(job) => {
            state.cancellations.request_cancel(job_id);
            Ok((StatusCode::ACCEPTED, Json(job)))
        }
        Err(CoreError::InvalidTransition(reason)) => Err(ApiError::Conflict(reason)),
        Err(err) => Err(ApiError::from(err)),
    }
}

//! `/recommendations` route (spec §6, §4.H).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use loraflow_core::{CoreError, RecommendationFingerprint};
use serde::Deserialize;

fn default_k() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKindParam {
    Similar,
    ForPrompt,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub kind: RecommendationKindParam,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_k")]
    pub k: u32,
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let fingerprint = match query.kind {
        RecommendationKindParam::Similar => {
            let target = query.target.ok_or_else(|| {
                ApiError::Core(CoreError::InvalidParameters(
                    "target is required for kind=similar".to_string(),
                ))
            })?;
            RecommendationFingerprint::by_adapter(target, query.k)
        }
        RecommendationKindParam::ForPrompt => {
            let prompt = query.prompt.ok_or_else(|| {
                ApiError::Core(CoreError::InvalidParameters(
                    "prompt is required for kind=for_prompt".to_string(),
                ))
            })?;
            RecommendationFingerprint::by_prompt(&prompt, query.k)
        }
    };

    let bytes = state.cache.get_or_build(fingerprint, state.similarity.as_ref()).await;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        ApiError::Core(CoreError::InvalidTransition(format!("malformed cached recommendation payload: {e}")))
    })?;
    Ok(Json(value))
}

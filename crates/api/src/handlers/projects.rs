//! Handlers for the `/projects` resource.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use leasetrack_core::types::EntityId;
use leasetrack_pipeline::{ProjectAccess, ProjectAccessValidator};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectAccessRequest {
    pub project_ids: Vec<EntityId>,
}

/// POST /api/v1/projects/access
pub async fn check_access(
    State(state): State<AppState>,
    Json(input): Json<ProjectAccessRequest>,
) -> AppResult<Json<DataResponse<HashMap<EntityId, ProjectAccess>>>> {
    let limit = state.config.max_batch_size;
    if input.project_ids.len() > limit {
        return Err(AppError::BadRequest(format!(
            "At most {limit} project ids can be checked at once"
        )));
    }

    let validator = ProjectAccessValidator::new(
        state.store.clone(),
        state.config.pipeline_config().access_cache_ttl,
    );
    let results = validator.validate_many(&input.project_ids).await;

    Ok(Json(DataResponse { data: results }))
}

//! Handlers for the `/suggestions` resource.

use axum::extract::State;
use axum::Json;
use leasetrack_core::error::CoreError;
use leasetrack_core::suggestion::{dedupe_suggestion_ids, BatchResult, UpdateSuggestion};
use leasetrack_pipeline::SuggestionBatchProcessor;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for applying approved suggestions.
#[derive(Debug, Deserialize)]
pub struct ApplySuggestionsRequest {
    pub suggestions: Vec<UpdateSuggestion>,
}

/// POST /api/v1/suggestions/apply
///
/// Per-item failures are reported inside the batch result with a 200; only a
/// malformed or oversized request is rejected outright.
pub async fn apply(
    State(state): State<AppState>,
    Json(input): Json<ApplySuggestionsRequest>,
) -> AppResult<Json<DataResponse<BatchResult>>> {
    let limit = state.config.max_batch_size;
    if input.suggestions.len() > limit {
        return Err(CoreError::Validation(format!(
            "Batch of {} suggestions exceeds the limit of {limit}",
            input.suggestions.len()
        ))
        .into());
    }

    let suggestions = dedupe_suggestion_ids(input.suggestions);
    let processor = SuggestionBatchProcessor::new(state.store.clone(), &state.config.pipeline_config());
    let result = processor.apply_approved_suggestions(&suggestions).await;

    Ok(Json(DataResponse { data: result }))
}

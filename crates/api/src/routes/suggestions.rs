use axum::routing::post;
use axum::Router;

use crate::handlers::suggestions;
use crate::state::AppState;

/// Routes mounted at `/suggestions`.
///
/// ```text
/// POST /apply    -> apply
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/apply", post(suggestions::apply))
}

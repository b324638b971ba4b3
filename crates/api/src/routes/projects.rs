use axum::routing::post;
use axum::Router;

use crate::handlers::projects;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// POST /access   -> check_access
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/access", post(projects::check_access))
}

pub mod health;
pub mod projects;
pub mod suggestions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /suggestions/apply      apply approved suggestions (POST)
/// /projects/access        check project access (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/suggestions", suggestions::router())
        .nest("/projects", projects::router())
}

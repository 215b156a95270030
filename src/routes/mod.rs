pub mod projects;

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/projects", get(projects::list))
        .route("/api/v1/projects/{num}", get(projects::get))
}

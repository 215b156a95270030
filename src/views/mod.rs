pub mod lists;
pub mod project;

use askama::Template;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        .route("/hello", get(hello))
        // Lists
        .route("/", get(lists::active))
        .route("/paused", get(lists::paused))
        .route("/done", get(lists::done))
        .route("/list", get(lists::all))
        .route("/habits", get(lists::habits))
        // Single project
        .route("/project/{num}", get(project::show))
        .route(
            "/project/{num}/edit",
            get(project::edit_page).post(project::update),
        )
}

async fn hello() -> Html<&'static str> {
    Html("<h1>Hello!</h1>")
}

pub(crate) fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

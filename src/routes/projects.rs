use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::Project;
use crate::state::SharedState;
use crate::storage::Filter;

#[derive(Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Project>>, AppError> {
    let filter = match query.filter.as_deref() {
        Some(name) => name
            .parse::<Filter>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => Filter::All,
    };

    let mut store = state.store.open().await?;
    let mut projects = store.scan(filter).await?;
    store.close().await?;

    filter.sort(&mut projects);
    Ok(Json(projects))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(number): Path<i64>,
) -> Result<Json<Project>, AppError> {
    let mut store = state.store.open().await?;
    let project = store.get(number).await?;
    store.close().await?;

    project
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Project {number} not found")))
}

use askama::Template;
use axum::extract::State;
use axum::response::Html;

use crate::dates;
use crate::error::AppError;
use crate::models::Project;
use crate::state::SharedState;
use crate::storage::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Number,
    Idea,
    Created,
    StartedOn,
    StoppedOn,
    Done,
}

impl Column {
    fn header(&self) -> &'static str {
        match self {
            Column::Number => "number",
            Column::Idea => "idea",
            Column::Created => "created",
            Column::StartedOn => "started_on",
            Column::StoppedOn => "stopped_on",
            Column::Done => "done",
        }
    }

    fn cell(&self, project: &Project) -> String {
        match self {
            Column::Number => project.number.to_string(),
            Column::Idea => project.idea.clone(),
            Column::Created => dates::display(project.created.as_ref()),
            Column::StartedOn => dates::display(project.started_on.as_ref()),
            Column::StoppedOn => dates::display(project.stopped_on.as_ref()),
            Column::Done => dates::display(project.done.as_ref()),
        }
    }
}

const FOCUS_COLUMNS: &[Column] = &[Column::Number, Column::Idea, Column::Created, Column::StartedOn];
const PROGRESS_COLUMNS: &[Column] = &[
    Column::Number,
    Column::Idea,
    Column::Created,
    Column::StartedOn,
    Column::StoppedOn,
    Column::Done,
];
const SUMMARY_COLUMNS: &[Column] = &[Column::Number, Column::Idea, Column::Created, Column::Done];

fn page(filter: Filter) -> (&'static str, &'static [Column]) {
    match filter {
        Filter::Active => ("Currently Active", FOCUS_COLUMNS),
        Filter::Paused => ("Paused", PROGRESS_COLUMNS),
        Filter::Done => ("Completed", PROGRESS_COLUMNS),
        Filter::All => ("All", SUMMARY_COLUMNS),
        Filter::Habits => ("Habits", FOCUS_COLUMNS),
    }
}

#[derive(Template)]
#[template(path = "list.html")]
struct ListTemplate {
    title: &'static str,
    headers: Vec<&'static str>,
    rows: Vec<ListRow>,
}

struct ListRow {
    number: i64,
    cells: Vec<String>,
}

async fn list_page(state: &SharedState, filter: Filter) -> Result<Html<String>, AppError> {
    let mut store = state.store.open().await?;
    let mut projects = store.scan(filter).await?;
    store.close().await?;

    filter.sort(&mut projects);

    let (title, columns) = page(filter);
    let template = ListTemplate {
        title,
        headers: columns.iter().map(Column::header).collect(),
        rows: projects
            .iter()
            .map(|project| ListRow {
                number: project.number,
                cells: columns.iter().map(|column| column.cell(project)).collect(),
            })
            .collect(),
    };
    super::render(&template)
}

/// The home page: what is being worked on right now.
pub async fn active(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    list_page(&state, Filter::Active).await
}

pub async fn paused(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    list_page(&state, Filter::Paused).await
}

pub async fn done(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    list_page(&state, Filter::Done).await
}

pub async fn all(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    list_page(&state, Filter::All).await
}

pub async fn habits(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    list_page(&state, Filter::Habits).await
}

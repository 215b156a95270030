use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use chrono::Local;
use serde::Deserialize;

use crate::dates;
use crate::error::AppError;
use crate::models::Project;
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "project.html")]
struct ProjectTemplate {
    title: String,
    number: i64,
    idea: String,
    state: String,
    created: String,
    started_on: String,
    stopped_on: String,
    done: String,
    last_modified: String,
    continuous: bool,
    links: String,
    memoranda: String,
}

#[derive(Template)]
#[template(path = "edit.html")]
struct EditTemplate {
    title: &'static str,
    number: i64,
    error: Option<String>,
    form: EditForm,
}

/// The edit form as posted. Dates use the `datetime-local` format.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditForm {
    pub idea: String,
    pub memoranda: String,
    pub links: String,
    pub created: String,
    pub started_on: String,
    pub stopped_on: String,
    pub done: String,
    pub last_modified: String,
    pub continuous: Option<String>,
}

impl EditForm {
    /// `last_modified` is set to now, so saving the form stamps the edit.
    fn from_project(project: &Project) -> Self {
        let last_modified = Local::now().naive_local();
        Self {
            idea: project.idea.clone(),
            memoranda: project.memoranda.clone().unwrap_or_default(),
            links: project.links.clone().unwrap_or_default(),
            created: dates::to_form(project.created.as_ref()),
            started_on: dates::to_form(project.started_on.as_ref()),
            stopped_on: dates::to_form(project.stopped_on.as_ref()),
            done: dates::to_form(project.done.as_ref()),
            last_modified: dates::to_form(Some(&last_modified)),
            continuous: project.continuous.then(|| "1".to_string()),
        }
    }

    fn is_continuous(&self) -> bool {
        self.continuous.is_some()
    }

    /// Validate the form into a full replacement record for `number`.
    fn to_project(&self, number: i64) -> Result<Project, String> {
        if self.idea.trim().is_empty() {
            return Err("Idea is required.".to_string());
        }

        let date = |label: &str, value: &str| {
            dates::parse_form(value).map_err(|e| format!("{label}: {e}"))
        };
        let text = |value: &str| Some(value.to_string()).filter(|v| !v.trim().is_empty());

        Ok(Project {
            number,
            idea: self.idea.trim().to_string(),
            created: date("Created", &self.created)?,
            done: date("Done", &self.done)?,
            started_on: date("Started on", &self.started_on)?,
            stopped_on: date("Stopped on", &self.stopped_on)?,
            continuous: match &self.continuous {
                Some(flag) => dates::parse_flag(flag).map_err(|e| format!("Continuous: {e}"))?,
                None => false,
            },
            links: text(&self.links),
            memoranda: text(&self.memoranda),
            last_modified: date("Last modified", &self.last_modified)?,
        })
    }
}

pub async fn show(
    State(state): State<SharedState>,
    Path(number): Path<i64>,
) -> Result<Response, AppError> {
    let mut store = state.store.open().await?;
    let project = store.get(number).await?;
    store.close().await?;

    let project = project.ok_or_else(|| AppError::NotFound(format!("Project {number} not found")))?;

    let template = ProjectTemplate {
        title: project.idea.clone(),
        number: project.number,
        idea: project.idea.clone(),
        state: format!("{:?}", project.lifecycle()),
        created: dates::display(project.created.as_ref()),
        started_on: dates::display(project.started_on.as_ref()),
        stopped_on: dates::display(project.stopped_on.as_ref()),
        done: dates::display(project.done.as_ref()),
        last_modified: dates::display(project.last_modified.as_ref()),
        continuous: project.continuous,
        links: project.links.unwrap_or_default(),
        memoranda: project.memoranda.unwrap_or_default(),
    };
    Ok(super::render(&template)?.into_response())
}

pub async fn edit_page(
    State(state): State<SharedState>,
    Path(number): Path<i64>,
) -> Result<Response, AppError> {
    let mut store = state.store.open().await?;
    let project = store.get(number).await?;
    store.close().await?;

    let project = project.ok_or_else(|| AppError::NotFound(format!("Project {number} not found")))?;

    let template = EditTemplate {
        title: "Editing",
        number,
        error: None,
        form: EditForm::from_project(&project),
    };
    Ok(super::render(&template)?.into_response())
}

/// Replace the whole record from the form. Invalid input re-renders the
/// form with the problem and leaves the stored record untouched.
pub async fn update(
    State(state): State<SharedState>,
    Path(number): Path<i64>,
    Form(form): Form<EditForm>,
) -> Result<Response, AppError> {
    let project = match form.to_project(number) {
        Ok(project) => project,
        Err(error) => {
            tracing::debug!("Rejected edit of project {number}: {error}");
            let template = EditTemplate {
                title: "Editing",
                number,
                error: Some(error),
                form,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, super::render(&template)?).into_response());
        }
    };

    let mut store = state.store.open().await?;
    if store.get(number).await?.is_none() {
        return Err(AppError::NotFound(format!("Project {number} not found")));
    }
    store.update(&project).await?;
    store.close().await?;

    tracing::info!("Updated project {number}");
    Ok(Redirect::to(&format!("/project/{number}")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(idea: &str) -> EditForm {
        EditForm {
            idea: idea.to_string(),
            ..EditForm::default()
        }
    }

    #[test]
    fn blank_idea_is_required() {
        assert_eq!(form("   ").to_project(1).unwrap_err(), "Idea is required.");
    }

    #[test]
    fn empty_fields_become_unset() {
        let project = form("Sail to Iceland").to_project(9).unwrap();
        assert_eq!(project.number, 9);
        assert_eq!(project.created, None);
        assert_eq!(project.links, None);
        assert!(!project.continuous);
    }

    #[test]
    fn malformed_date_is_reported_with_its_label() {
        let mut bad = form("Sail to Iceland");
        bad.started_on = "next tuesday".to_string();
        let error = bad.to_project(9).unwrap_err();
        assert!(error.starts_with("Started on:"), "{error}");
    }

    #[test]
    fn project_round_trips_through_the_form() {
        let mut project = Project::new(4, "Knit a jumper");
        project.created = dates::parse_form("2021-02-03T04:05").unwrap();
        project.last_modified = dates::parse_form("2021-03-03T10:00").unwrap();
        project.continuous = true;
        project.links = Some("https://example.org/pattern".to_string());

        let back = EditForm::from_project(&project).to_project(4).unwrap();
        assert_eq!(back.created, project.created);
        assert_eq!(back.links, project.links);
        assert!(back.continuous);
        assert_ne!(back.last_modified, project.last_modified);
    }

    #[test]
    fn form_stamps_last_modified_with_now() {
        let mut project = Project::new(6, "Paint the fence");
        project.last_modified = dates::parse_form("2005-06-01T15:05").unwrap();

        let before = Local::now().naive_local() - chrono::Duration::minutes(1);
        let form = EditForm::from_project(&project);
        let stamped = dates::parse_form(&form.last_modified).unwrap().unwrap();
        assert!(stamped >= before, "{stamped} is older than {before}");
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Project {
    pub number: i64,
    pub idea: String,
    pub created: Option<NaiveDateTime>,
    pub done: Option<NaiveDateTime>,
    pub started_on: Option<NaiveDateTime>,
    pub stopped_on: Option<NaiveDateTime>,
    pub continuous: bool,
    pub links: Option<String>,
    pub memoranda: Option<String>,
    pub last_modified: Option<NaiveDateTime>,
}

/// Where a project sits, derived from which of its dates are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Idea,
    Active,
    Paused,
    Done,
}

impl Project {
    /// A bare idea with every optional field unset.
    pub fn new(number: i64, idea: impl Into<String>) -> Self {
        Self {
            number,
            idea: idea.into(),
            created: None,
            done: None,
            started_on: None,
            stopped_on: None,
            continuous: false,
            links: None,
            memoranda: None,
            last_modified: None,
        }
    }

    /// `done` wins over everything else, then a stop date pauses a started project.
    pub fn lifecycle(&self) -> Lifecycle {
        match (self.done, self.started_on, self.stopped_on) {
            (Some(_), _, _) => Lifecycle::Done,
            (None, Some(_), Some(_)) => Lifecycle::Paused,
            (None, Some(_), None) => Lifecycle::Active,
            (None, None, _) => Lifecycle::Idea,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn done_overrides_other_dates() {
        let mut project = Project::new(1, "Write a compiler");
        project.started_on = Some(at(2001, 1, 1));
        project.stopped_on = Some(at(2001, 2, 1));
        project.done = Some(at(2002, 3, 1));
        assert_eq!(project.lifecycle(), Lifecycle::Done);
    }

    #[test]
    fn started_and_stopped_is_paused() {
        let mut project = Project::new(2, "Learn the cello");
        project.started_on = Some(at(2010, 5, 4));
        assert_eq!(project.lifecycle(), Lifecycle::Active);
        project.stopped_on = Some(at(2011, 5, 4));
        assert_eq!(project.lifecycle(), Lifecycle::Paused);
    }

    #[test]
    fn untouched_project_is_an_idea() {
        assert_eq!(Project::new(3, "Build a boat").lifecycle(), Lifecycle::Idea);
    }
}

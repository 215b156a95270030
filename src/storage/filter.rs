use std::cmp::Ordering;
use std::str::FromStr;

use super::kv::{Condition, Value};
use super::StoreError;
use crate::models::{Lifecycle, Project};

/// The fixed set of list queries the views ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    All,
    /// Started and not done. Paused projects are included.
    Active,
    Paused,
    Done,
    Habits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Number,
    StartedOn,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Filter {
    pub const ALL: [Filter; 5] = [
        Filter::All,
        Filter::Active,
        Filter::Paused,
        Filter::Done,
        Filter::Habits,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Paused => "paused",
            Filter::Done => "done",
            Filter::Habits => "habits",
        }
    }

    /// `WHERE` clause body for the relational store, `None` for no predicate.
    pub fn sql_predicate(&self) -> Option<&'static str> {
        match self {
            Filter::All => None,
            Filter::Active => Some("started_on IS NOT NULL AND done IS NULL"),
            Filter::Paused => {
                Some("started_on IS NOT NULL AND stopped_on IS NOT NULL AND done IS NULL")
            }
            Filter::Done => Some("done IS NOT NULL"),
            Filter::Habits => Some("continuous = 1"),
        }
    }

    /// Does `project` belong in this list? Decided on the decoded record.
    pub fn matches(&self, project: &Project) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => matches!(project.lifecycle(), Lifecycle::Active | Lifecycle::Paused),
            Filter::Paused => project.lifecycle() == Lifecycle::Paused,
            Filter::Done => project.lifecycle() == Lifecycle::Done,
            Filter::Habits => project.continuous,
        }
    }

    /// Pre-filter for the key-value store. Stored items may hold legacy
    /// values (`""` dates, textual flags), so this only narrows the scan and
    /// never excludes an item [`Filter::matches`] would keep.
    pub fn condition(&self) -> Option<Condition> {
        match self {
            Filter::All => None,
            Filter::Active => Some(Condition::Exists("started_on")),
            Filter::Paused => Some(Condition::And(vec![
                Condition::Exists("started_on"),
                Condition::Exists("stopped_on"),
            ])),
            Filter::Done => Some(Condition::Exists("done")),
            Filter::Habits => Some(Condition::NotEquals("continuous", Value::Bool(false))),
        }
    }

    pub fn ordering(&self) -> (SortKey, Direction) {
        match self {
            Filter::Active | Filter::Paused => (SortKey::StartedOn, Direction::Ascending),
            Filter::Done => (SortKey::Done, Direction::Descending),
            Filter::All | Filter::Habits => (SortKey::Number, Direction::Ascending),
        }
    }

    /// Order scan results the same way whichever backend produced them.
    /// Ties fall back to ascending `number`.
    pub fn sort(&self, projects: &mut [Project]) {
        let (key, direction) = self.ordering();
        projects.sort_by(|a, b| {
            let primary = match key {
                SortKey::Number => a.number.cmp(&b.number),
                SortKey::StartedOn => a.started_on.cmp(&b.started_on),
                SortKey::Done => a.done.cmp(&b.done),
            };
            let primary = match direction {
                Direction::Ascending => primary,
                Direction::Descending => primary.reverse(),
            };
            match primary {
                Ordering::Equal => a.number.cmp(&b.number),
                other => other,
            }
        });
    }
}

impl FromStr for Filter {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .into_iter()
            .find(|filter| filter.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::Query(format!("unknown filter '{s}'")))
    }
}

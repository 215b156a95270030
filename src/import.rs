//! Bulk import of a projects CSV export into a store.
//!
//! The run walks `Init -> ConnectionOpen -> SchemaReady -> Insert* -> Closed`
//! and stops at the first failure. Rows inserted before that failure stay in
//! the store; there is no transaction around the batch.

use std::io::Read;

use csv::StringRecord;

use crate::dates::{self, FormatError};
use crate::models::Project;
use crate::storage::{Connector, ProjectStore, SchemaMode, StoreError};

pub const COLUMNS: [&str; 10] = [
    "number",
    "idea",
    "created",
    "done",
    "started_on",
    "stopped_on",
    "continuous",
    "links",
    "memoranda",
    "last_modified",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Init,
    ConnectionOpen,
    SchemaReady,
    Insert,
    Closed,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("expected {expected} columns, found {found}")]
    Columns { expected: usize, found: usize },
    #[error("'{0}' is not a project number")]
    Number(String),
    #[error("{column}: {source}")]
    Format {
        column: &'static str,
        #[source]
        source: FormatError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot open store: {0}")]
    Connect(#[source] StoreError),
    #[error("cannot prepare schema: {0}")]
    Schema(#[source] StoreError),
    #[error("cannot read row {row}: {source}")]
    Read {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: RowError,
    },
    #[error("row {row} (project {number}): {source}")]
    Insert {
        row: usize,
        number: i64,
        #[source]
        source: StoreError,
    },
    #[error("cannot close store: {0}")]
    Close(#[source] StoreError),
}

impl ImportError {
    /// The stage the run was in when it failed.
    pub fn stage(&self) -> ImportStage {
        match self {
            ImportError::Connect(_) => ImportStage::Init,
            ImportError::Schema(_) => ImportStage::ConnectionOpen,
            ImportError::Read { .. } | ImportError::Row { .. } | ImportError::Insert { .. } => {
                ImportStage::Insert
            }
            ImportError::Close(_) => ImportStage::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
}

/// Import every row of `source` through a handle opened from `connector`.
///
/// `on_insert` is called after each successful insert. The handle is closed
/// whether or not the run succeeds.
pub async fn run<R: Read>(
    connector: &Connector,
    source: R,
    mode: SchemaMode,
    mut on_insert: impl FnMut(&Project),
) -> Result<ImportReport, ImportError> {
    tracing::info!(stage = ?ImportStage::Init, backend = %connector.kind(), "Starting import");

    let mut store = connector.open().await.map_err(|e| failed(ImportError::Connect(e)))?;
    tracing::info!(stage = ?ImportStage::ConnectionOpen, "Store opened");

    let outcome = insert_all(store.as_mut(), source, mode, &mut on_insert).await;
    let closed = store.close().await;

    match (outcome, closed) {
        (Ok(report), Ok(())) => {
            tracing::info!(stage = ?ImportStage::Closed, inserted = report.inserted, "Import finished");
            Ok(report)
        }
        (Ok(_), Err(e)) => Err(failed(ImportError::Close(e))),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!("Closing store after failed import: {close_err}");
            }
            Err(failed(e))
        }
    }
}

async fn insert_all<R: Read>(
    store: &mut dyn ProjectStore,
    source: R,
    mode: SchemaMode,
    on_insert: &mut impl FnMut(&Project),
) -> Result<ImportReport, ImportError> {
    store.ensure_schema(mode).await.map_err(ImportError::Schema)?;
    tracing::info!(stage = ?ImportStage::SchemaReady, ?mode, "Schema ready");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut inserted = 0;
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|source| ImportError::Read { row, source })?;
        let project = parse_row(&record).map_err(|source| ImportError::Row { row, source })?;

        store
            .insert(&project)
            .await
            .map_err(|source| ImportError::Insert {
                row,
                number: project.number,
                source,
            })?;
        tracing::debug!(stage = ?ImportStage::Insert, row, number = project.number, "Inserted");

        inserted += 1;
        on_insert(&project);
    }

    Ok(ImportReport { inserted })
}

fn failed(err: ImportError) -> ImportError {
    tracing::error!(stage = ?ImportStage::Failed, failed_in = ?err.stage(), "Import failed: {err}");
    err
}

/// Build a project from one CSV record in the fixed column order.
pub fn parse_row(record: &StringRecord) -> Result<Project, RowError> {
    if record.len() != COLUMNS.len() {
        return Err(RowError::Columns {
            expected: COLUMNS.len(),
            found: record.len(),
        });
    }

    let date = |index: usize| {
        dates::parse_import(&record[index]).map_err(|source| RowError::Format {
            column: COLUMNS[index],
            source,
        })
    };
    let text = |index: usize| Some(record[index].to_string()).filter(|s| !dates::is_unset(s));

    Ok(Project {
        number: parse_number(&record[0])?,
        idea: record[1].to_string(),
        created: date(2)?,
        done: date(3)?,
        started_on: date(4)?,
        stopped_on: date(5)?,
        continuous: dates::parse_flag(&record[6]).map_err(|source| RowError::Format {
            column: COLUMNS[6],
            source,
        })?,
        links: text(7),
        memoranda: text(8),
        last_modified: date(9)?,
    })
}

/// Spreadsheet exports sometimes write whole numbers as `12.0`.
fn parse_number(value: &str) -> Result<i64, RowError> {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| RowError::Number(value.to_string()))
}

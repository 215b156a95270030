//! One interface over the two places a project list can live.
//!
//! A [`Connector`] is built once at startup from a [`StoreConfig`]; every run
//! or request then calls [`Connector::open`] for its own [`ProjectStore`]
//! handle and passes it explicitly to each operation.

pub mod filter;
pub mod kv;
pub mod sqlite;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::Project;

pub use filter::Filter;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("query error: {0}")]
    Query(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Relational,
    KeyValue,
}

impl BackendKind {
    pub fn token(&self) -> &'static str {
        match self {
            BackendKind::Relational => "sqlite3",
            BackendKind::KeyValue => "dynamodb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite3" => Ok(BackendKind::Relational),
            "dynamodb" => Ok(BackendKind::KeyValue),
            other => Err(StoreError::Connection(format!(
                "unknown backend '{other}', expected sqlite3 or dynamodb"
            ))),
        }
    }
}

/// What `ensure_schema` does when the table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaMode {
    #[default]
    Reuse,
    /// Drop the existing table and everything in it, then create it afresh.
    Recreate,
}

/// How long to wait for a remote table to finish creating or deleting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            attempts: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub kind: BackendKind,
    pub sqlite_path: PathBuf,
    pub table_name: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub wait: WaitPolicy,
}

#[async_trait]
pub trait ProjectStore: Send {
    async fn ensure_schema(&mut self, mode: SchemaMode) -> Result<(), StoreError>;

    /// Write a new record. Fails if `number` is already taken.
    async fn insert(&mut self, project: &Project) -> Result<(), StoreError>;

    /// Replace an existing record wholesale. Fails if `number` is unknown.
    async fn update(&mut self, project: &Project) -> Result<(), StoreError>;

    async fn get(&mut self, number: i64) -> Result<Option<Project>, StoreError>;

    /// Unordered; callers apply [`Filter::sort`].
    async fn scan(&mut self, filter: Filter) -> Result<Vec<Project>, StoreError>;

    async fn close(&mut self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct Connector {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Relational(PathBuf),
    KeyValue(kv::KeyValueStore),
}

impl Connector {
    /// Prepare the client side for `config.kind`. For DynamoDB this loads
    /// the AWS configuration once so later handles share one SDK client.
    pub async fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.kind {
            BackendKind::Relational => Ok(Self::relational(config.sqlite_path.clone())),
            BackendKind::KeyValue => {
                let client =
                    kv::dynamo::DynamoClient::connect(&config.region, config.endpoint_url.as_deref())
                        .await?;
                Self::key_value(Arc::new(client), &config.table_name, config.wait)
            }
        }
    }

    pub fn relational(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Relational(path.into()),
        }
    }

    pub fn key_value(
        client: Arc<dyn kv::DocumentClient>,
        table: &str,
        wait: WaitPolicy,
    ) -> Result<Self, StoreError> {
        if table.trim().is_empty() {
            return Err(StoreError::Connection("table name must not be empty".to_string()));
        }
        Ok(Self {
            backend: Backend::KeyValue(kv::KeyValueStore::new(client, table, wait)),
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self.backend {
            Backend::Relational(_) => BackendKind::Relational,
            Backend::KeyValue(_) => BackendKind::KeyValue,
        }
    }

    pub async fn open(&self) -> Result<Box<dyn ProjectStore>, StoreError> {
        match &self.backend {
            Backend::Relational(path) => Ok(Box::new(sqlite::SqliteStore::connect(path).await?)),
            Backend::KeyValue(store) => Ok(Box::new(store.clone())),
        }
    }
}

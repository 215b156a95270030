use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

use super::{Filter, ProjectStore, SchemaMode, StoreError};
use crate::models::Project;

const SCHEMA: &str = include_str!("../../schema/projects.sql");

/// Older databases hold `''` or `'0'` for an unset date; both read as NULL,
/// so filters and decoding see the same value.
const SELECT: &str = "SELECT * FROM (SELECT number, idea, \
                      NULLIF(NULLIF(created, ''), '0') AS created, \
                      NULLIF(NULLIF(done, ''), '0') AS done, \
                      NULLIF(NULLIF(started_on, ''), '0') AS started_on, \
                      NULLIF(NULLIF(stopped_on, ''), '0') AS stopped_on, \
                      continuous, links, memoranda, \
                      NULLIF(NULLIF(last_modified, ''), '0') AS last_modified \
                      FROM projects) AS cleaned";

/// A single connection to a local SQLite file. Dropping it closes the file.
pub struct SqliteStore {
    conn: Option<SqliteConnection>,
}

impl SqliteStore {
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Connection(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|e| StoreError::Connection(format!("cannot open {}: {e}", path.display())))?;

        tracing::debug!("Opened SQLite database at {}", path.display());
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Connection("connection already closed".to_string()))
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn ensure_schema(&mut self, mode: SchemaMode) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if mode == SchemaMode::Recreate {
            tracing::warn!("Dropping projects table before recreating it");
            sqlx::query("DROP TABLE IF EXISTS projects")
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::Schema(e.to_string()))?;
        }
        sqlx::query(SCHEMA)
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        Ok(())
    }

    async fn insert(&mut self, project: &Project) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO projects (number, idea, created, done, started_on, stopped_on,
                                   continuous, links, memoranda, last_modified)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(project.number)
        .bind(&project.idea)
        .bind(project.created)
        .bind(project.done)
        .bind(project.started_on)
        .bind(project.stopped_on)
        .bind(project.continuous)
        .bind(project.links.as_deref())
        .bind(project.memoranda.as_deref())
        .bind(project.last_modified)
        .execute(self.conn()?)
        .await
        .map_err(|e| StoreError::Write(format!("project {}: {e}", project.number)))?;
        Ok(())
    }

    async fn update(&mut self, project: &Project) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE projects SET idea = ?, created = ?, done = ?, started_on = ?, stopped_on = ?,
                                 continuous = ?, links = ?, memoranda = ?, last_modified = ?
             WHERE number = ?",
        )
        .bind(&project.idea)
        .bind(project.created)
        .bind(project.done)
        .bind(project.started_on)
        .bind(project.stopped_on)
        .bind(project.continuous)
        .bind(project.links.as_deref())
        .bind(project.memoranda.as_deref())
        .bind(project.last_modified)
        .bind(project.number)
        .execute(self.conn()?)
        .await
        .map_err(|e| StoreError::Write(format!("project {}: {e}", project.number)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Write(format!("no project {}", project.number)));
        }
        Ok(())
    }

    async fn get(&mut self, number: i64) -> Result<Option<Project>, StoreError> {
        sqlx::query_as::<_, Project>(&format!("{SELECT} WHERE number = ?"))
            .bind(number)
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn scan(&mut self, filter: Filter) -> Result<Vec<Project>, StoreError> {
        let sql = match filter.sql_predicate() {
            Some(predicate) => format!("{SELECT} WHERE {predicate}"),
            None => SELECT.to_string(),
        };
        sqlx::query_as::<_, Project>(&sql)
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| StoreError::Query(format!("{} filter: {e}", filter.name())))
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        Ok(())
    }
}

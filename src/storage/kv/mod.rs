//! Projects as documents in a key-value table.
//!
//! Unset fields are left out of the written item entirely: the table has
//! no NULL, so an absent attribute is the only way to say "no value".

pub mod condition;
pub mod dynamo;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;

use super::{Filter, ProjectStore, SchemaMode, StoreError, WaitPolicy};
use crate::dates;
use crate::models::Project;

pub use condition::{Condition, Expression};

pub const KEY_ATTRIBUTE: &str = "number";

const TABLE_DESCRIPTOR: &str = include_str!("../../../schema/projects-table.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Number(i64),
    Text(String),
    Bool(bool),
}

pub type Item = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Other(String),
}

/// Whether a put must create a new item or replace an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    Create,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDescriptor {
    pub table_name: String,
    pub key_schema: Vec<KeySchemaElement>,
    pub attribute_definitions: Vec<AttributeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    Hash,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: AttributeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AttributeType {
    S,
    N,
    B,
}

impl TableDescriptor {
    /// The bundled projects table descriptor, renamed to `table_name`.
    pub fn projects(table_name: &str) -> Result<Self, StoreError> {
        let mut descriptor: TableDescriptor = serde_json::from_str(TABLE_DESCRIPTOR)
            .map_err(|e| StoreError::Schema(format!("invalid table descriptor: {e}")))?;
        descriptor.table_name = table_name.to_string();
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.key_schema.is_empty() {
            return Err(StoreError::Schema(format!(
                "table {} declares no key",
                self.table_name
            )));
        }
        for key in &self.key_schema {
            if !self
                .attribute_definitions
                .iter()
                .any(|attr| attr.attribute_name == key.attribute_name)
            {
                return Err(StoreError::Schema(format!(
                    "key attribute {} of table {} has no type definition",
                    key.attribute_name, self.table_name
                )));
            }
        }
        Ok(())
    }
}

/// The calls the key-value store makes against its table service.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// `None` when no table of that name exists.
    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>, StoreError>;

    async fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError>;

    async fn delete_table(&self, table: &str) -> Result<(), StoreError>;

    async fn put_item(&self, table: &str, item: Item, mode: PutMode) -> Result<(), StoreError>;

    async fn get_item(&self, table: &str, number: i64) -> Result<Option<Item>, StoreError>;

    async fn scan(
        &self,
        table: &str,
        condition: Option<&Condition>,
    ) -> Result<Vec<Item>, StoreError>;
}

/// Handle to one named table. Holds no releasable resource.
#[derive(Clone)]
pub struct KeyValueStore {
    client: Arc<dyn DocumentClient>,
    table: String,
    wait: WaitPolicy,
}

impl KeyValueStore {
    pub fn new(client: Arc<dyn DocumentClient>, table: &str, wait: WaitPolicy) -> Self {
        Self {
            client,
            table: table.to_string(),
            wait,
        }
    }

    async fn create(&self) -> Result<(), StoreError> {
        let descriptor = TableDescriptor::projects(&self.table)?;
        self.client.create_table(&descriptor).await?;
        tracing::info!("Created table {}, waiting for it to become active", self.table);
        self.wait_until_active().await
    }

    async fn wait_until_active(&self) -> Result<(), StoreError> {
        for _ in 0..self.wait.attempts {
            if self.client.table_status(&self.table).await? == Some(TableStatus::Active) {
                return Ok(());
            }
            tokio::time::sleep(self.wait.interval).await;
        }
        Err(StoreError::Schema(format!(
            "table {} not active after {} checks",
            self.table, self.wait.attempts
        )))
    }

    async fn wait_until_absent(&self) -> Result<(), StoreError> {
        for _ in 0..self.wait.attempts {
            if self.client.table_status(&self.table).await?.is_none() {
                return Ok(());
            }
            tokio::time::sleep(self.wait.interval).await;
        }
        Err(StoreError::Schema(format!(
            "table {} still present after {} checks",
            self.table, self.wait.attempts
        )))
    }
}

#[async_trait]
impl ProjectStore for KeyValueStore {
    async fn ensure_schema(&mut self, mode: SchemaMode) -> Result<(), StoreError> {
        match (self.client.table_status(&self.table).await?, mode) {
            (None, _) => self.create().await,
            (Some(TableStatus::Deleting), SchemaMode::Reuse) => {
                tracing::info!("Table {} is being deleted, waiting to recreate it", self.table);
                self.wait_until_absent().await?;
                self.create().await
            }
            (Some(_), SchemaMode::Reuse) => self.wait_until_active().await,
            (Some(status), SchemaMode::Recreate) => {
                tracing::warn!("Deleting table {} to recreate it", self.table);
                if status != TableStatus::Deleting {
                    self.wait_until_active().await?;
                    self.client.delete_table(&self.table).await?;
                }
                self.wait_until_absent().await?;
                self.create().await
            }
        }
    }

    async fn insert(&mut self, project: &Project) -> Result<(), StoreError> {
        self.client
            .put_item(&self.table, to_item(project), PutMode::Create)
            .await
    }

    async fn update(&mut self, project: &Project) -> Result<(), StoreError> {
        self.client
            .put_item(&self.table, to_item(project), PutMode::Replace)
            .await
    }

    async fn get(&mut self, number: i64) -> Result<Option<Project>, StoreError> {
        self.client
            .get_item(&self.table, number)
            .await?
            .map(|item| from_item(&item))
            .transpose()
    }

    async fn scan(&mut self, filter: Filter) -> Result<Vec<Project>, StoreError> {
        let condition = filter.condition();
        let mut projects = self
            .client
            .scan(&self.table, condition.as_ref())
            .await?
            .iter()
            .map(from_item)
            .collect::<Result<Vec<_>, _>>()?;
        projects.retain(|project| filter.matches(project));
        Ok(projects)
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub fn to_item(project: &Project) -> Item {
    let mut item = Item::new();
    item.insert(KEY_ATTRIBUTE.to_string(), Value::Number(project.number));
    item.insert("idea".to_string(), Value::Text(project.idea.clone()));
    item.insert("continuous".to_string(), Value::Bool(project.continuous));

    let timestamps = [
        ("created", project.created),
        ("done", project.done),
        ("started_on", project.started_on),
        ("stopped_on", project.stopped_on),
        ("last_modified", project.last_modified),
    ];
    for (name, value) in timestamps {
        if let Some(value) = value {
            item.insert(name.to_string(), Value::Text(dates::to_storage(&value)));
        }
    }

    let texts = [("links", &project.links), ("memoranda", &project.memoranda)];
    for (name, value) in texts {
        if let Some(value) = value {
            item.insert(name.to_string(), Value::Text(value.clone()));
        }
    }
    item
}

pub fn from_item(item: &Item) -> Result<Project, StoreError> {
    let number = match item.get(KEY_ATTRIBUTE) {
        Some(Value::Number(n)) => *n,
        other => return Err(malformed("number", other)),
    };
    let idea = match item.get("idea") {
        Some(Value::Text(idea)) => idea.clone(),
        other => return Err(malformed("idea", other)),
    };
    let continuous = match item.get("continuous") {
        None => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Text(flag)) => dates::parse_flag(flag)
            .map_err(|e| StoreError::Query(format!("project {number}: continuous: {e}")))?,
        other => return Err(malformed("continuous", other)),
    };

    let date = |name: &'static str| -> Result<Option<NaiveDateTime>, StoreError> {
        match item.get(name) {
            None => Ok(None),
            Some(Value::Text(text)) if dates::is_unset(text) => Ok(None),
            Some(Value::Text(text)) => dates::from_storage(text)
                .map(Some)
                .map_err(|e| StoreError::Query(format!("project {number}: {name}: {e}"))),
            other => Err(malformed(name, other)),
        }
    };
    let text = |name: &'static str| -> Result<Option<String>, StoreError> {
        match item.get(name) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            other => Err(malformed(name, other)),
        }
    };

    Ok(Project {
        number,
        idea,
        created: date("created")?,
        done: date("done")?,
        started_on: date("started_on")?,
        stopped_on: date("stopped_on")?,
        continuous,
        links: text("links")?,
        memoranda: text("memoranda")?,
        last_modified: date("last_modified")?,
    })
}

fn malformed(attribute: &str, value: Option<&Value>) -> StoreError {
    match value {
        None => StoreError::Query(format!("item has no {attribute} attribute")),
        Some(value) => StoreError::Query(format!(
            "item attribute {attribute} has unexpected value {value:?}"
        )),
    }
}

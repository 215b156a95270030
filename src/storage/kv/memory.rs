use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    Condition, DocumentClient, Item, PutMode, StoreError, TableDescriptor, TableStatus, Value,
};

/// An in-process table service.
///
/// Tables move through CREATING and DELETING the way a remote service does:
/// each transition completes only after `transition_polls` status checks,
/// and items cannot be read or written until the table is ACTIVE.
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: Mutex<HashMap<String, MemoryTable>>,
    transition_polls: u32,
}

#[derive(Debug)]
struct MemoryTable {
    key: String,
    status: TableStatus,
    pending_polls: u32,
    items: BTreeMap<i64, Item>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transition_polls(transition_polls: u32) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            transition_polls,
        }
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, MemoryTable>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn active<'a>(
    tables: &'a mut HashMap<String, MemoryTable>,
    name: &str,
    error: fn(String) -> StoreError,
) -> Result<&'a mut MemoryTable, StoreError> {
    match tables.get_mut(name) {
        Some(table) if table.status == TableStatus::Active => Ok(table),
        Some(table) => Err(error(format!(
            "table {name} is {:?}, not active",
            table.status
        ))),
        None => Err(error(format!("requested table {name} not found"))),
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>, StoreError> {
        let mut tables = self.tables();
        let Some(entry) = tables.get_mut(table) else {
            return Ok(None);
        };

        if entry.pending_polls > 0 {
            entry.pending_polls -= 1;
            return Ok(Some(entry.status.clone()));
        }
        match entry.status.clone() {
            TableStatus::Creating | TableStatus::Updating => {
                entry.status = TableStatus::Active;
                Ok(Some(TableStatus::Active))
            }
            TableStatus::Deleting => {
                tables.remove(table);
                Ok(None)
            }
            status => Ok(Some(status)),
        }
    }

    async fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
        descriptor.validate()?;
        let mut tables = self.tables();
        if tables.contains_key(&descriptor.table_name) {
            return Err(StoreError::Schema(format!(
                "table {} already exists",
                descriptor.table_name
            )));
        }
        tables.insert(
            descriptor.table_name.clone(),
            MemoryTable {
                key: descriptor.key_schema[0].attribute_name.clone(),
                status: TableStatus::Creating,
                pending_polls: self.transition_polls,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let entry = active(&mut tables, table, StoreError::Schema)?;
        entry.status = TableStatus::Deleting;
        entry.pending_polls = self.transition_polls;
        Ok(())
    }

    async fn put_item(&self, table: &str, item: Item, mode: PutMode) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let entry = active(&mut tables, table, StoreError::Write)?;
        let number = match item.get(&entry.key) {
            Some(Value::Number(n)) => *n,
            _ => {
                return Err(StoreError::Write(format!(
                    "item is missing numeric key {}",
                    entry.key
                )));
            }
        };

        match (mode, entry.items.contains_key(&number)) {
            (PutMode::Create, true) => Err(StoreError::Write(format!(
                "project {number} already exists"
            ))),
            (PutMode::Replace, false) => Err(StoreError::Write(format!("no project {number}"))),
            _ => {
                entry.items.insert(number, item);
                Ok(())
            }
        }
    }

    async fn get_item(&self, table: &str, number: i64) -> Result<Option<Item>, StoreError> {
        let mut tables = self.tables();
        let entry = active(&mut tables, table, StoreError::Query)?;
        Ok(entry.items.get(&number).cloned())
    }

    async fn scan(
        &self,
        table: &str,
        condition: Option<&Condition>,
    ) -> Result<Vec<Item>, StoreError> {
        let mut tables = self.tables();
        let entry = active(&mut tables, table, StoreError::Query)?;
        Ok(entry
            .items
            .values()
            .filter(|item| condition.is_none_or(|c| c.matches(item)))
            .cloned()
            .collect())
    }
}

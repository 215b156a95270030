use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::types::{self as ddb, AttributeValue, BillingMode, ScalarAttributeType};

use super::{
    AttributeType, Condition, DocumentClient, Item, KEY_ATTRIBUTE, KeyType, PutMode, StoreError,
    TableDescriptor, TableStatus, Value,
};

/// DynamoDB through the AWS SDK. Cloning shares the underlying client.
#[derive(Debug, Clone)]
pub struct DynamoClient {
    client: Client,
}

impl DynamoClient {
    /// Credentials come from the usual AWS provider chain. `endpoint_url`
    /// points at DynamoDB Local or another compatible service.
    pub async fn connect(region: &str, endpoint_url: Option<&str>) -> Result<Self, StoreError> {
        if region.trim().is_empty() {
            return Err(StoreError::Connection("AWS region must be set".to_string()));
        }

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&shared);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }

        tracing::debug!("DynamoDB client configured for region {region}");
        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl DocumentClient for DynamoClient {
    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>, StoreError> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(Some(
                output
                    .table()
                    .and_then(|t| t.table_status())
                    .map(table_status)
                    .unwrap_or_else(|| TableStatus::Other("UNKNOWN".to_string())),
            )),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error(err, StoreError::Schema)),
        }
    }

    async fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
        let mut request = self
            .client
            .create_table()
            .table_name(&descriptor.table_name)
            .billing_mode(BillingMode::PayPerRequest);

        for key in &descriptor.key_schema {
            let key_type = match key.key_type {
                KeyType::Hash => ddb::KeyType::Hash,
                KeyType::Range => ddb::KeyType::Range,
            };
            let element = ddb::KeySchemaElement::builder()
                .attribute_name(&key.attribute_name)
                .key_type(key_type)
                .build()
                .map_err(|e| StoreError::Schema(e.to_string()))?;
            request = request.key_schema(element);
        }

        for attribute in &descriptor.attribute_definitions {
            let attribute_type = match attribute.attribute_type {
                AttributeType::S => ScalarAttributeType::S,
                AttributeType::N => ScalarAttributeType::N,
                AttributeType::B => ScalarAttributeType::B,
            };
            let definition = ddb::AttributeDefinition::builder()
                .attribute_name(&attribute.attribute_name)
                .attribute_type(attribute_type)
                .build()
                .map_err(|e| StoreError::Schema(e.to_string()))?;
            request = request.attribute_definitions(definition);
        }

        request
            .send()
            .await
            .map_err(|e| sdk_error(e, StoreError::Schema))?;
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        match self.client.delete_table().table_name(table).send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(())
            }
            Err(err) => Err(sdk_error(err, StoreError::Schema)),
        }
    }

    async fn put_item(&self, table: &str, item: Item, mode: PutMode) -> Result<(), StoreError> {
        let number = match item.get(KEY_ATTRIBUTE) {
            Some(Value::Number(n)) => *n,
            _ => {
                return Err(StoreError::Write(format!(
                    "item is missing numeric key {KEY_ATTRIBUTE}"
                )));
            }
        };
        let condition = match mode {
            PutMode::Create => "attribute_not_exists(#k)",
            PutMode::Replace => "attribute_exists(#k)",
        };
        let attributes: HashMap<String, AttributeValue> = item
            .iter()
            .map(|(name, value)| (name.clone(), to_attribute(value)))
            .collect();

        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(attributes))
            .condition_expression(condition)
            .expression_attribute_names("#k", KEY_ATTRIBUTE)
            .send()
            .await
            .map_err(|err| {
                let rejected = err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception());
                match (rejected, mode) {
                    (true, PutMode::Create) => {
                        StoreError::Write(format!("project {number} already exists"))
                    }
                    (true, PutMode::Replace) => StoreError::Write(format!("no project {number}")),
                    (false, _) => sdk_error(err, StoreError::Write),
                }
            })?;
        Ok(())
    }

    async fn get_item(&self, table: &str, number: i64) -> Result<Option<Item>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(KEY_ATTRIBUTE, AttributeValue::N(number.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| sdk_error(e, StoreError::Query))?;
        output.item().map(from_attributes).transpose()
    }

    async fn scan(
        &self,
        table: &str,
        condition: Option<&Condition>,
    ) -> Result<Vec<Item>, StoreError> {
        let expression = condition.map(Condition::render);
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(table)
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take());

            if let Some(expression) = &expression {
                request = request
                    .filter_expression(&expression.text)
                    .set_expression_attribute_names(Some(
                        expression.names.clone().into_iter().collect(),
                    ));
                if !expression.values.is_empty() {
                    request = request.set_expression_attribute_values(Some(
                        expression
                            .values
                            .iter()
                            .map(|(placeholder, value)| (placeholder.clone(), to_attribute(value)))
                            .collect(),
                    ));
                }
            }

            let output = request
                .send()
                .await
                .map_err(|e| sdk_error(e, StoreError::Query))?;
            for raw in output.items() {
                items.push(from_attributes(raw)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!("Scanned {} items from {table}", items.len());
        Ok(items)
    }
}

fn table_status(status: &ddb::TableStatus) -> TableStatus {
    match status {
        ddb::TableStatus::Active => TableStatus::Active,
        ddb::TableStatus::Creating => TableStatus::Creating,
        ddb::TableStatus::Updating => TableStatus::Updating,
        ddb::TableStatus::Deleting => TableStatus::Deleting,
        other => TableStatus::Other(other.as_str().to_string()),
    }
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::Text(s) => AttributeValue::S(s.clone()),
        Value::Bool(b) => AttributeValue::Bool(*b),
    }
}

fn from_attributes(raw: &HashMap<String, AttributeValue>) -> Result<Item, StoreError> {
    let mut item = Item::new();
    for (name, attribute) in raw {
        let value = match attribute {
            AttributeValue::N(n) => Value::Number(n.parse().map_err(|_| {
                StoreError::Query(format!("attribute {name}: '{n}' is not an integer"))
            })?),
            AttributeValue::S(s) => Value::Text(s.clone()),
            AttributeValue::Bool(b) => Value::Bool(*b),
            // Older items carry explicit nulls; treat them as absent.
            AttributeValue::Null(_) => continue,
            other => {
                return Err(StoreError::Query(format!(
                    "attribute {name} has unsupported type {other:?}"
                )));
            }
        };
        item.insert(name.clone(), value);
    }
    Ok(item)
}

/// Network failures surface as connection errors, everything else as `kind`.
fn sdk_error<E, R>(err: SdkError<E, R>, kind: fn(String) -> StoreError) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => StoreError::Connection(message),
        _ => kind(message),
    }
}

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb as dynamodb;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::error::display::DisplayErrorContext;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{CollectorError, Result};
use crate::model::CostRecord;
use crate::storage::SummaryStore;

/// DynamoDB-backed store for cost summary records.
///
/// The table does not accept native floating point, so every float field is
/// converted to a fixed-point decimal at this boundary, never inside the
/// collectors.
pub struct DynamoSummaryStore {
    client: dynamodb::Client,
    table: String,
}

impl DynamoSummaryStore {
    pub fn new(sdk_config: &SdkConfig, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if table.is_empty() {
            return Err(CollectorError::Config("DynamoDB table not configured".to_string()).into());
        }
        Ok(Self {
            client: dynamodb::Client::new(sdk_config),
            table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl SummaryStore for DynamoSummaryStore {
    async fn put_summary(&self, record: &CostRecord) -> Result<()> {
        let item = to_item(record)?;
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|err| {
                CollectorError::Storage(format!("{}", DisplayErrorContext(err)))
            })?;

        debug!("Stored summary for {} on {}", record.service, record.date);
        Ok(())
    }
}

fn to_item(record: &CostRecord) -> Result<HashMap<String, AttributeValue>> {
    let mut item = HashMap::new();
    item.insert("date".to_string(), AttributeValue::S(record.date.clone()));
    item.insert(
        "service".to_string(),
        AttributeValue::S(record.service.clone()),
    );
    item.insert(
        "resource_id".to_string(),
        AttributeValue::S(record.resource_id.clone()),
    );
    item.insert(
        "amortized_cost".to_string(),
        AttributeValue::N(decimal_string(record.amortized_cost)?),
    );
    item.insert(
        "unblended_cost".to_string(),
        AttributeValue::N(decimal_string(record.unblended_cost)?),
    );
    item.insert(
        "usage_quantity".to_string(),
        AttributeValue::N(decimal_string(record.usage_quantity)?),
    );
    item.insert(
        "timestamp".to_string(),
        AttributeValue::S(record.timestamp.to_rfc3339()),
    );
    Ok(item)
}

// Goes through the shortest decimal rendering of the float so the stored
// number matches what a human would read from the raw response.
fn decimal_string(value: f64) -> Result<String> {
    let decimal = Decimal::from_str(&value.to_string())
        .map_err(|e| CollectorError::Storage(format!("cannot store value {value}: {e}")))?;
    Ok(decimal.to_string())
}

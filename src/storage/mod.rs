//! Persistence boundaries: date-partitioned object storage for raw data and
//! a keyed store for cost summaries.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::model::CostRecord;

pub mod columnar;
pub mod dynamo;
pub mod memory;
pub mod s3;

/// Data domain of a raw blob; fixes both the key segment and the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    CostExplorer,
    CloudwatchMetrics,
    Inventory,
}

impl Domain {
    pub fn segment(&self) -> &'static str {
        match self {
            Domain::CostExplorer => "cost-explorer",
            Domain::CloudwatchMetrics => "cloudwatch-metrics",
            Domain::Inventory => "inventory",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Domain::CostExplorer => "data.json",
            Domain::CloudwatchMetrics => "metrics.parquet",
            Domain::Inventory => "inventory.json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Domain::CloudwatchMetrics => "application/octet-stream",
            _ => "application/json",
        }
    }
}

/// Object key for a raw blob, partitioned by the collection end-date.
///
/// The layout is a compatibility surface for downstream readers and must not
/// change: `raw/<domain>/year=YYYY/month=MM/day=DD/<file>`, with an optional
/// configured prefix in front.
pub fn object_key(prefix: &str, domain: Domain, date: NaiveDate) -> String {
    let key = format!(
        "raw/{}/year={:04}/month={:02}/day={:02}/{}",
        domain.segment(),
        date.year(),
        date.month(),
        date.day(),
        domain.file_name()
    );
    if prefix.is_empty() {
        key
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), key)
    }
}

/// Generic trait for object storage backends
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one object under the given key, overwriting any previous object.
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Generic trait for the keyed summary store
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Store one cost summary record, overwriting any previous record.
    async fn put_summary(&self, record: &CostRecord) -> Result<()>;
}

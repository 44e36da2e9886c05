use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One flattened cost observation for a (date, service, resource) group.
///
/// Produced by flattening the period -> group -> metric structure of a cost
/// and usage response. Immutable once produced; no identity beyond its own
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostRecord {
    pub date: String,
    pub service: String,
    pub resource_id: String,
    pub amortized_cost: f64,
    pub unblended_cost: f64,
    pub usage_quantity: f64,
    pub timestamp: DateTime<Utc>,
}

/// One aggregated statistic value for a metric at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricDatapoint {
    pub resource_type: String,
    pub resource_id: String,
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    pub statistic: String,
}

/// Descriptive statistics over the values of one (resource, metric) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
    pub min: f64,
    pub std: f64,
}

/// Total cost attributed to one service over a query window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceCost {
    pub service: String,
    pub cost: f64,
}

/// Costs grouped by the values of one tag key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaggedCosts {
    pub tag_key: String,
    pub by_tag_value: HashMap<String, f64>,
    pub untagged_cost: f64,
}

/// Running totals parsed out of a cost and usage response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParsedCosts {
    pub total_cost: f64,
    pub by_service: HashMap<String, f64>,
}

/// Cost and quantity for one usage type of a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageTypeCost {
    pub cost: f64,
    pub quantity: f64,
    pub unit_cost: f64,
}

/// A single forward-looking cost estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostForecast {
    pub amount: f64,
    pub period: String,
    pub unit: String,
}

/// Alarm counts by pricing class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AlarmCounts {
    pub total: u64,
    pub standard: u64,
    pub high_resolution: u64,
    pub composite: u64,
}

/// Stored size and retention of one log group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogGroupUsage {
    pub name: String,
    pub stored_gb: f64,
    pub retention_days: Option<i32>,
    pub creation_time: Option<DateTime<Utc>>,
}

/// A (type, id) reference to a monitored resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// One discovered EC2 instance and its static specification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputeRecord {
    pub resource_type: String,
    pub resource_id: String,
    pub instance_type: String,
    pub state: String,
    pub launch_time: String,
    pub availability_zone: String,
    pub platform: String,
    pub architecture: String,
    pub vcpus: Option<u32>,
    pub memory_gb: Option<f64>,
    pub tags: HashMap<String, String>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub monitoring: Option<String>,
    pub scan_timestamp: DateTime<Utc>,
}

/// One discovered RDS instance.
///
/// Tags stay empty: the listing API does not return them and the separate
/// tag lookup is not performed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseRecord {
    pub resource_type: String,
    pub resource_id: String,
    pub instance_class: String,
    pub engine: String,
    pub engine_version: String,
    pub state: String,
    pub allocated_storage_gb: i32,
    pub storage_type: Option<String>,
    pub multi_az: bool,
    pub availability_zone: Option<String>,
    pub vcpus: Option<u32>,
    pub memory_gb: Option<f64>,
    pub backup_retention_days: Option<i32>,
    pub tags: HashMap<String, String>,
    pub scan_timestamp: DateTime<Utc>,
}

/// One discovered Lambda function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionRecord {
    pub resource_type: String,
    pub resource_id: String,
    pub runtime: String,
    pub memory_mb: i32,
    pub timeout_seconds: i32,
    pub code_size_bytes: i64,
    pub last_modified: String,
    pub architecture: String,
    pub ephemeral_storage_mb: i32,
    pub tags: HashMap<String, String>,
    pub scan_timestamp: DateTime<Utc>,
}

/// A full account inventory from one scan.
///
/// Field names are the compatibility surface of the persisted inventory
/// blob; downstream consumers read them by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Inventory {
    pub ec2_instances: Vec<ComputeRecord>,
    pub rds_instances: Vec<DatabaseRecord>,
    pub lambda_functions: Vec<FunctionRecord>,
}

impl Inventory {
    /// Total number of resources across all categories.
    pub fn total(&self) -> usize {
        self.ec2_instances.len() + self.rds_instances.len() + self.lambda_functions.len()
    }
}

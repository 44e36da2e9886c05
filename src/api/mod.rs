//! Seams over the cloud APIs the collectors draw from.
//!
//! Each collaborator is reached through a narrow async trait so the
//! collectors stay testable without credentials; `api::aws` holds the SDK
//! implementations. Response types mirror the wire shape of the billing API
//! (PascalCase member names) so a persisted raw blob matches what the API
//! returned.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::model::CostForecast;

pub mod aws;

/// Time-bucketing of a cost query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
    Hourly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Hourly => "HOURLY",
        }
    }
}

/// A grouping dimension for cost queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
    /// Group by a built-in dimension such as SERVICE or USAGE_TYPE
    Dimension(String),
    /// Group by the values of a cost allocation tag key
    Tag(String),
}

impl GroupBy {
    pub fn key(&self) -> &str {
        match self {
            GroupBy::Dimension(key) | GroupBy::Tag(key) => key,
        }
    }
}

/// Metric a forecast is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastMetric {
    UnblendedCost,
    AmortizedCost,
}

impl ForecastMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMetric::UnblendedCost => "UNBLENDED_COST",
            ForecastMetric::AmortizedCost => "AMORTIZED_COST",
        }
    }
}

/// A cost and usage query over a closed date window.
#[derive(Debug, Clone)]
pub struct CostQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub group_by: Vec<GroupBy>,
}

impl CostQuery {
    /// Daily query grouped by service and resource, the default collection shape.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            granularity: Granularity::Daily,
            group_by: vec![
                GroupBy::Dimension("SERVICE".to_string()),
                GroupBy::Dimension("RESOURCE_ID".to_string()),
            ],
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_group_by(mut self, group_by: Vec<GroupBy>) -> Self {
        self.group_by = group_by;
        self
    }
}

/// A raw cost and usage response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CostAndUsage {
    #[serde(default)]
    pub results_by_time: Vec<ResultByTime>,
}

/// Results for one time bucket of a cost query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: TimePeriod,
    #[serde(default)]
    pub groups: Vec<CostGroup>,
    #[serde(default)]
    pub estimated: bool,
}

/// A closed [start, end) date window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

/// One group of a time bucket; `keys` is positional in request group order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CostGroup {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub metrics: HashMap<String, MetricAmount>,
}

/// A metric value as the billing API reports it: a decimal string plus unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct MetricAmount {
    pub amount: String,
    pub unit: String,
}

/// The billing API seam.
#[async_trait]
pub trait CostApi: Send + Sync {
    /// Fetch cost and usage for the query window, usage records only.
    async fn cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsage>;

    /// Fetch a single forward-looking cost estimate at monthly granularity.
    async fn cost_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        metric: ForecastMetric,
    ) -> Result<CostForecast>;
}

/// The aggregation statistic of a metrics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    Average,
    Sum,
    Maximum,
    Minimum,
    SampleCount,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Average => "Average",
            Statistic::Sum => "Sum",
            Statistic::Maximum => "Maximum",
            Statistic::Minimum => "Minimum",
            Statistic::SampleCount => "SampleCount",
        }
    }
}

/// A metric dimension filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// One statistics query against the metrics API.
#[derive(Debug, Clone)]
pub struct StatisticsQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub period_seconds: i32,
    pub statistics: Vec<Statistic>,
    pub unit: Option<String>,
}

/// One datapoint as returned by the metrics API, in no particular order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDatapoint {
    pub timestamp: DateTime<Utc>,
    pub values: HashMap<Statistic, f64>,
    pub unit: Option<String>,
}

/// One metric known to the metrics API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricListing {
    pub namespace: String,
    pub name: String,
}

/// One configured metric alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricAlarmInfo {
    pub name: String,
    pub period_seconds: i32,
}

/// All alarms configured in the account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlarmListing {
    pub metric_alarms: Vec<MetricAlarmInfo>,
    pub composite_alarms: u64,
}

/// Stored size and retention of one log group, as listed.
#[derive(Debug, Clone, PartialEq)]
pub struct LogGroupInfo {
    pub name: String,
    pub stored_bytes: i64,
    pub retention_days: Option<i32>,
    pub created: Option<DateTime<Utc>>,
}

/// The metrics API seam.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Fetch datapoints for one metric; order is whatever the API returns.
    async fn metric_statistics(&self, query: &StatisticsQuery) -> Result<Vec<RawDatapoint>>;

    /// List every metric in the account, all pages drained.
    async fn list_metrics(&self) -> Result<Vec<MetricListing>>;

    /// List every alarm in the account, all pages drained.
    async fn describe_alarms(&self) -> Result<AlarmListing>;

    /// List every log group in the account, all pages drained.
    async fn describe_log_groups(&self) -> Result<Vec<LogGroupInfo>>;
}

/// One EC2 instance as listed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub instance_type: String,
    pub state: String,
    pub launch_time: Option<DateTime<Utc>>,
    pub availability_zone: Option<String>,
    pub platform: Option<String>,
    pub architecture: Option<String>,
    pub tags: Vec<Tag>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub monitoring: Option<String>,
}

/// One RDS instance as listed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DbInstanceInfo {
    pub identifier: String,
    pub instance_class: String,
    pub engine: String,
    pub engine_version: String,
    pub status: String,
    pub allocated_storage_gb: i32,
    pub storage_type: Option<String>,
    pub multi_az: bool,
    pub availability_zone: Option<String>,
    pub backup_retention_days: Option<i32>,
}

/// One Lambda function as listed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionInfo {
    pub name: String,
    pub runtime: Option<String>,
    pub memory_mb: i32,
    pub timeout_seconds: i32,
    pub code_size_bytes: i64,
    pub last_modified: String,
    pub architecture: Option<String>,
    pub ephemeral_storage_mb: Option<i32>,
}

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// The inventory listing seam; implementations drain pagination before returning.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn describe_instances(&self) -> Result<Vec<InstanceInfo>>;

    async fn describe_db_instances(&self) -> Result<Vec<DbInstanceInfo>>;

    async fn list_functions(&self) -> Result<Vec<FunctionInfo>>;
}

//! Utilization metrics collection.
//!
//! Iterates a static per-category metric table, fetches statistics through
//! the `MetricsApi` seam and flattens datapoints into rows. A failing metric
//! or resource is logged and skipped; sibling fetches continue.

use chrono::{Duration, NaiveDate, Utc};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{Dimension, MetricsApi, RawDatapoint, Statistic, StatisticsQuery};
use crate::error::{CollectorError, Result};
use crate::estimate::bytes_to_gb;
use crate::model::{AlarmCounts, LogGroupUsage, MetricDatapoint, ResourceRef};
use crate::storage::{Domain, ObjectStore, object_key};

pub use crate::stats::summarize as compute_statistics;

/// Statistics period applied when walking the metric table.
pub const DEFAULT_PERIOD_SECONDS: i32 = 3600;

/// One monitored metric: name, aggregation statistic, unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub statistic: Statistic,
    pub unit: &'static str,
}

/// The monitored metrics of one resource category.
#[derive(Debug, Clone, Copy)]
pub struct ResourceMetrics {
    pub namespace: &'static str,
    pub dimension: &'static str,
    pub metrics: &'static [MetricSpec],
}

// The table content is load-bearing for downstream consumers; the exact
// name/statistic/unit triples must be kept as they are.
static EC2_METRICS: ResourceMetrics = ResourceMetrics {
    namespace: "AWS/EC2",
    dimension: "InstanceId",
    metrics: &[
        MetricSpec { name: "CPUUtilization", statistic: Statistic::Average, unit: "Percent" },
        MetricSpec { name: "NetworkIn", statistic: Statistic::Sum, unit: "Bytes" },
        MetricSpec { name: "NetworkOut", statistic: Statistic::Sum, unit: "Bytes" },
        MetricSpec { name: "DiskReadBytes", statistic: Statistic::Sum, unit: "Bytes" },
        MetricSpec { name: "DiskWriteBytes", statistic: Statistic::Sum, unit: "Bytes" },
    ],
};

static RDS_METRICS: ResourceMetrics = ResourceMetrics {
    namespace: "AWS/RDS",
    dimension: "DBInstanceIdentifier",
    metrics: &[
        MetricSpec { name: "CPUUtilization", statistic: Statistic::Average, unit: "Percent" },
        MetricSpec { name: "DatabaseConnections", statistic: Statistic::Average, unit: "Count" },
        MetricSpec { name: "FreeStorageSpace", statistic: Statistic::Average, unit: "Bytes" },
        MetricSpec { name: "ReadLatency", statistic: Statistic::Average, unit: "Seconds" },
        MetricSpec { name: "WriteLatency", statistic: Statistic::Average, unit: "Seconds" },
    ],
};

static LAMBDA_METRICS: ResourceMetrics = ResourceMetrics {
    namespace: "AWS/Lambda",
    dimension: "FunctionName",
    metrics: &[
        MetricSpec { name: "Duration", statistic: Statistic::Average, unit: "Milliseconds" },
        MetricSpec { name: "Invocations", statistic: Statistic::Sum, unit: "Count" },
        MetricSpec { name: "Errors", statistic: Statistic::Sum, unit: "Count" },
        MetricSpec { name: "ConcurrentExecutions", statistic: Statistic::Maximum, unit: "Count" },
    ],
};

/// Metric table for a resource category, or `None` for an unknown category.
pub fn resource_metrics(resource_type: &str) -> Option<&'static ResourceMetrics> {
    match resource_type {
        "EC2" => Some(&EC2_METRICS),
        "RDS" => Some(&RDS_METRICS),
        "Lambda" => Some(&LAMBDA_METRICS),
        _ => None,
    }
}

/// Collects utilization metrics from the metrics API.
pub struct MetricsCollector<M: MetricsApi> {
    api: M,
    object_store: Option<Arc<dyn ObjectStore>>,
    key_prefix: String,
    period_seconds: i32,
}

impl<M: MetricsApi> MetricsCollector<M> {
    pub fn new(api: M) -> Self {
        Self {
            api,
            object_store: None,
            key_prefix: String::new(),
            period_seconds: DEFAULT_PERIOD_SECONDS,
        }
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_period_seconds(mut self, period_seconds: i32) -> Self {
        self.period_seconds = period_seconds;
        self
    }

    /// Fetch datapoints for one metric, sorted ascending by timestamp
    /// regardless of the order the API returned them in.
    pub async fn fetch_statistics(&self, query: &StatisticsQuery) -> Result<Vec<RawDatapoint>> {
        let mut datapoints = self.api.metric_statistics(query).await?;
        datapoints.sort_by_key(|dp| dp.timestamp);
        info!(
            "Retrieved {} datapoints for {}",
            datapoints.len(),
            query.metric_name
        );
        Ok(datapoints)
    }

    /// Collect every monitored metric for one resource.
    ///
    /// An unknown resource type fails immediately; a failing metric fetch is
    /// logged and skipped so sibling metrics still get collected.
    pub async fn collect_resource_metrics(
        &self,
        resource_type: &str,
        resource_id: &str,
        days_back: i64,
    ) -> Result<Vec<MetricDatapoint>> {
        let table = resource_metrics(resource_type).ok_or_else(|| {
            CollectorError::Validation(format!("Unsupported resource type: {resource_type}"))
        })?;

        let end_time = Utc::now();
        let start_time = end_time - Duration::days(days_back);
        let dimensions = vec![Dimension {
            name: table.dimension.to_string(),
            value: resource_id.to_string(),
        }];

        let mut rows = Vec::new();

        for spec in table.metrics {
            let query = StatisticsQuery {
                namespace: table.namespace.to_string(),
                metric_name: spec.name.to_string(),
                dimensions: dimensions.clone(),
                start_time,
                end_time,
                period_seconds: self.period_seconds,
                statistics: vec![spec.statistic],
                unit: Some(spec.unit.to_string()),
            };

            match self.fetch_statistics(&query).await {
                Ok(datapoints) => {
                    for dp in datapoints {
                        rows.push(MetricDatapoint {
                            resource_type: resource_type.to_string(),
                            resource_id: resource_id.to_string(),
                            metric_name: spec.name.to_string(),
                            timestamp: dp.timestamp,
                            value: dp.values.get(&spec.statistic).copied().unwrap_or(0.0),
                            unit: dp.unit.clone().unwrap_or_else(|| spec.unit.to_string()),
                            statistic: spec.statistic.as_str().to_string(),
                        });
                    }
                }
                Err(e) => {
                    warn!("Failed to collect {} for {}: {}", spec.name, resource_id, e);
                    continue;
                }
            }
        }

        info!(
            "Collected {} metric datapoints for {}",
            rows.len(),
            resource_id
        );
        Ok(rows)
    }

    /// Collect metrics for a batch of resources, one at a time.
    ///
    /// A failing resource is logged and skipped; an all-failed batch yields
    /// an empty result, not an error.
    pub async fn collect_batch_metrics(
        &self,
        resources: &[ResourceRef],
        days_back: i64,
    ) -> Result<Vec<MetricDatapoint>> {
        let mut all_rows = Vec::new();

        for resource in resources {
            match self
                .collect_resource_metrics(&resource.resource_type, &resource.resource_id, days_back)
                .await
            {
                Ok(mut rows) => all_rows.append(&mut rows),
                Err(e) => {
                    error!(
                        "Failed to collect metrics for {}: {}",
                        resource.resource_id, e
                    );
                    continue;
                }
            }
        }

        if all_rows.is_empty() {
            warn!("No metrics collected");
        } else {
            info!("Total metrics collected: {} datapoints", all_rows.len());
        }
        Ok(all_rows)
    }

    /// Store rows as a date-partitioned parquet blob. An empty row set skips
    /// the upload and returns an empty key.
    pub async fn store_metrics(
        &self,
        rows: &[MetricDatapoint],
        end_date: NaiveDate,
    ) -> Result<String> {
        let store = self
            .object_store
            .as_ref()
            .ok_or_else(|| CollectorError::Config("object store not configured".to_string()))?;

        if rows.is_empty() {
            warn!("No datapoints to store, skipping upload");
            return Ok(String::new());
        }

        let key = object_key(&self.key_prefix, Domain::CloudwatchMetrics, end_date);
        let body = crate::storage::columnar::encode_datapoints(rows)?;
        store
            .put_object(&key, body, Domain::CloudwatchMetrics.content_type())
            .await?;

        info!("Stored {} datapoints at {}", rows.len(), key);
        Ok(key)
    }

    /// Count custom metrics per namespace; AWS-owned namespaces are excluded.
    pub async fn custom_metric_counts(&self) -> Result<HashMap<String, u64>> {
        let metrics = self.api.list_metrics().await?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for metric in metrics {
            if !metric.namespace.starts_with("AWS/") {
                *counts.entry(metric.namespace).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Count alarms by pricing class. A metric alarm with a sub-minute
    /// period is high-resolution.
    pub async fn alarm_counts(&self) -> Result<AlarmCounts> {
        let listing = self.api.describe_alarms().await?;
        let mut counts = AlarmCounts::default();

        for alarm in &listing.metric_alarms {
            if alarm.period_seconds < 60 {
                counts.high_resolution += 1;
            } else {
                counts.standard += 1;
            }
        }
        counts.composite = listing.composite_alarms;
        counts.total = counts.standard + counts.high_resolution + counts.composite;
        Ok(counts)
    }

    /// Stored size per log group, largest first.
    pub async fn log_group_usage(&self) -> Result<Vec<LogGroupUsage>> {
        let groups = self.api.describe_log_groups().await?;
        let mut usage: Vec<LogGroupUsage> = groups
            .into_iter()
            .map(|group| LogGroupUsage {
                name: group.name,
                stored_gb: bytes_to_gb(group.stored_bytes),
                retention_days: group.retention_days,
                creation_time: group.created,
            })
            .collect();
        usage.sort_by(|a, b| b.stored_gb.total_cmp(&a.stored_gb));
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AlarmListing, LogGroupInfo, MetricAlarmInfo, MetricListing};
    use crate::storage::memory::MemoryObjectStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    /// Fake metrics API returning three out-of-order datapoints per metric,
    /// with optional failure triggers on resource id or metric name.
    struct FakeMetricsApi {
        fail_resource: Option<String>,
        fail_metric: Option<String>,
    }

    impl FakeMetricsApi {
        fn healthy() -> Self {
            Self {
                fail_resource: None,
                fail_metric: None,
            }
        }
    }

    #[async_trait]
    impl MetricsApi for FakeMetricsApi {
        async fn metric_statistics(&self, query: &StatisticsQuery) -> Result<Vec<RawDatapoint>> {
            if let Some(bad) = &self.fail_resource {
                if query.dimensions.iter().any(|d| &d.value == bad) {
                    return Err(CollectorError::Api("simulated outage".to_string()).into());
                }
            }
            if let Some(bad) = &self.fail_metric {
                if &query.metric_name == bad {
                    return Err(CollectorError::Api("simulated throttle".to_string()).into());
                }
            }

            let statistic = query.statistics[0];
            let datapoints = [(ts(2), 30.0), (ts(0), 10.0), (ts(1), 20.0)]
                .into_iter()
                .map(|(timestamp, value)| RawDatapoint {
                    timestamp,
                    values: HashMap::from([(statistic, value)]),
                    unit: query.unit.clone(),
                })
                .collect();
            Ok(datapoints)
        }

        async fn list_metrics(&self) -> Result<Vec<MetricListing>> {
            Ok(vec![
                MetricListing { namespace: "AWS/EC2".to_string(), name: "CPUUtilization".to_string() },
                MetricListing { namespace: "MyApp".to_string(), name: "QueueDepth".to_string() },
                MetricListing { namespace: "MyApp".to_string(), name: "Latency".to_string() },
                MetricListing { namespace: "Batch".to_string(), name: "JobsFailed".to_string() },
            ])
        }

        async fn describe_alarms(&self) -> Result<AlarmListing> {
            Ok(AlarmListing {
                metric_alarms: vec![
                    MetricAlarmInfo { name: "cpu-high".to_string(), period_seconds: 300 },
                    MetricAlarmInfo { name: "cpu-spike".to_string(), period_seconds: 10 },
                    MetricAlarmInfo { name: "disk-full".to_string(), period_seconds: 60 },
                ],
                composite_alarms: 1,
            })
        }

        async fn describe_log_groups(&self) -> Result<Vec<LogGroupInfo>> {
            Ok(vec![
                LogGroupInfo {
                    name: "/aws/lambda/small".to_string(),
                    stored_bytes: 1024 * 1024 * 1024,
                    retention_days: Some(30),
                    created: Some(ts(0)),
                },
                LogGroupInfo {
                    name: "/aws/lambda/large".to_string(),
                    stored_bytes: 5 * 1024 * 1024 * 1024,
                    retention_days: None,
                    created: Some(ts(0)),
                },
            ])
        }
    }

    fn query(metric_name: &str, resource_id: &str) -> StatisticsQuery {
        StatisticsQuery {
            namespace: "AWS/EC2".to_string(),
            metric_name: metric_name.to_string(),
            dimensions: vec![Dimension {
                name: "InstanceId".to_string(),
                value: resource_id.to_string(),
            }],
            start_time: ts(0),
            end_time: ts(3),
            period_seconds: 3600,
            statistics: vec![Statistic::Average],
            unit: Some("Percent".to_string()),
        }
    }

    #[tokio::test]
    async fn fetch_statistics_sorts_by_timestamp() {
        let collector = MetricsCollector::new(FakeMetricsApi::healthy());
        let datapoints = collector
            .fetch_statistics(&query("CPUUtilization", "i-1"))
            .await
            .unwrap();

        assert_eq!(datapoints.len(), 3);
        for pair in datapoints.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn unknown_resource_type_fails_fast() {
        let collector = MetricsCollector::new(FakeMetricsApi::healthy());
        let err = collector
            .collect_resource_metrics("EKS", "cluster-1", 15)
            .await
            .unwrap_err();

        let err = err.downcast_ref::<CollectorError>().unwrap();
        assert!(matches!(err, CollectorError::Validation(_)));
        assert!(err.to_string().contains("Unsupported resource type"));
    }

    #[tokio::test]
    async fn resource_rows_carry_the_metric_table_shape() {
        let collector = MetricsCollector::new(FakeMetricsApi::healthy());
        let rows = collector
            .collect_resource_metrics("EC2", "i-1", 15)
            .await
            .unwrap();

        // 5 monitored metrics, 3 datapoints each
        assert_eq!(rows.len(), 15);
        let cpu: Vec<_> = rows
            .iter()
            .filter(|r| r.metric_name == "CPUUtilization")
            .collect();
        assert_eq!(cpu.len(), 3);
        assert_eq!(cpu[0].statistic, "Average");
        assert_eq!(cpu[0].unit, "Percent");
        assert_eq!(cpu[0].resource_type, "EC2");

        let network: Vec<_> = rows
            .iter()
            .filter(|r| r.metric_name == "NetworkIn")
            .collect();
        assert_eq!(network[0].statistic, "Sum");
        assert_eq!(network[0].unit, "Bytes");
    }

    #[tokio::test]
    async fn failing_metric_does_not_abort_siblings() {
        let collector = MetricsCollector::new(FakeMetricsApi {
            fail_resource: None,
            fail_metric: Some("NetworkIn".to_string()),
        });
        let rows = collector
            .collect_resource_metrics("EC2", "i-1", 15)
            .await
            .unwrap();

        // 4 of the 5 metrics survive
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|r| r.metric_name != "NetworkIn"));
    }

    #[tokio::test]
    async fn failing_resource_is_skipped_in_batch() {
        let collector = MetricsCollector::new(FakeMetricsApi {
            fail_resource: Some("i-2".to_string()),
            fail_metric: None,
        });
        let resources = vec![
            ResourceRef::new("EC2", "i-1"),
            ResourceRef::new("EC2", "i-2"),
            ResourceRef::new("EC2", "i-3"),
        ];

        let rows = collector.collect_batch_metrics(&resources, 15).await.unwrap();
        assert!(rows.iter().any(|r| r.resource_id == "i-1"));
        assert!(rows.iter().any(|r| r.resource_id == "i-3"));
        assert!(rows.iter().all(|r| r.resource_id != "i-2"));
    }

    #[tokio::test]
    async fn all_failed_batch_is_empty_not_an_error() {
        let collector = MetricsCollector::new(FakeMetricsApi {
            fail_resource: None,
            fail_metric: None,
        });
        // unknown types fail per-resource and are caught
        let resources = vec![
            ResourceRef::new("EKS", "cluster-1"),
            ResourceRef::new("EKS", "cluster-2"),
        ];

        let rows = collector.collect_batch_metrics(&resources, 15).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn store_metrics_skips_empty_rows() {
        let store = Arc::new(MemoryObjectStore::new());
        let collector =
            MetricsCollector::new(FakeMetricsApi::healthy()).with_object_store(store.clone());

        let key = collector
            .store_metrics(&[], "2026-03-01".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(key, "");
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_metrics_writes_parquet_at_the_partition_key() {
        let store = Arc::new(MemoryObjectStore::new());
        let collector =
            MetricsCollector::new(FakeMetricsApi::healthy()).with_object_store(store.clone());

        let rows = collector
            .collect_resource_metrics("Lambda", "fn-1", 15)
            .await
            .unwrap();
        let key = collector
            .store_metrics(&rows, "2026-03-01".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(
            key,
            "raw/cloudwatch-metrics/year=2026/month=03/day=01/metrics.parquet"
        );
        let object = store.get(&key).unwrap().unwrap();
        assert_eq!(object.content_type, "application/octet-stream");
        assert_eq!(&object.body[..4], b"PAR1");
    }

    #[tokio::test]
    async fn custom_metric_counts_exclude_aws_namespaces() {
        let collector = MetricsCollector::new(FakeMetricsApi::healthy());
        let counts = collector.custom_metric_counts().await.unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts["MyApp"], 2);
        assert_eq!(counts["Batch"], 1);
        assert!(!counts.contains_key("AWS/EC2"));
    }

    #[tokio::test]
    async fn alarms_classify_by_period() {
        let collector = MetricsCollector::new(FakeMetricsApi::healthy());
        let counts = collector.alarm_counts().await.unwrap();

        assert_eq!(counts.standard, 2);
        assert_eq!(counts.high_resolution, 1);
        assert_eq!(counts.composite, 1);
        assert_eq!(counts.total, 4);
    }

    #[tokio::test]
    async fn log_groups_sort_largest_first() {
        let collector = MetricsCollector::new(FakeMetricsApi::healthy());
        let usage = collector.log_group_usage().await.unwrap();

        assert_eq!(usage[0].name, "/aws/lambda/large");
        assert_eq!(usage[0].stored_gb, 5.0);
        assert_eq!(usage[1].stored_gb, 1.0);
        assert_eq!(usage[1].retention_days, Some(30));
    }
}

//! Cost and usage collection.
//!
//! Fetches billing time series through the `CostApi` seam, flattens them
//! into [`CostRecord`]s and persists both the raw response and the
//! per-record summaries.

use chrono::{Duration, NaiveDate, Utc};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{CostAndUsage, CostApi, CostGroup, CostQuery, ForecastMetric};
use crate::error::{CollectorError, Result};
use crate::model::{CostForecast, CostRecord, ParsedCosts, ServiceCost, TaggedCosts, UsageTypeCost};
use crate::storage::{Domain, ObjectStore, SummaryStore, object_key};

/// Collects cost data from the billing API.
pub struct CostCollector<C: CostApi> {
    api: C,
    object_store: Option<Arc<dyn ObjectStore>>,
    summary_store: Option<Arc<dyn SummaryStore>>,
    key_prefix: String,
}

impl<C: CostApi> CostCollector<C> {
    pub fn new(api: C) -> Self {
        Self {
            api,
            object_store: None,
            summary_store: None,
            key_prefix: String::new(),
        }
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_summary_store(mut self, store: Arc<dyn SummaryStore>) -> Self {
        self.summary_store = Some(store);
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Fetch cost and usage for the query window. Transport and
    /// authorization errors propagate unmodified; there is no retry.
    pub async fn fetch_cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsage> {
        info!("Fetching cost data from {} to {}", query.start, query.end);
        let response = self.api.cost_and_usage(query).await?;
        info!("Retrieved {} time periods", response.results_by_time.len());
        Ok(response)
    }

    /// Fetch a cost forecast; granularity is fixed to monthly.
    pub async fn fetch_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        metric: ForecastMetric,
    ) -> Result<CostForecast> {
        info!("Fetching cost forecast from {} to {}", start, end);
        self.api.cost_forecast(start, end, metric).await
    }

    /// Store a raw response as a date-partitioned blob.
    pub async fn store_raw(&self, raw: &CostAndUsage, end_date: NaiveDate) -> Result<String> {
        let store = self
            .object_store
            .as_ref()
            .ok_or_else(|| CollectorError::Config("object store not configured".to_string()))?;

        let key = object_key(&self.key_prefix, Domain::CostExplorer, end_date);
        let body =
            serde_json::to_vec(raw).map_err(|e| CollectorError::Encode(e.to_string()))?;
        store
            .put_object(&key, body, Domain::CostExplorer.content_type())
            .await?;

        info!("Stored raw cost data at {}", key);
        Ok(key)
    }

    /// Write each record to the keyed summary store, one put per record.
    pub async fn store_summaries(&self, records: &[CostRecord]) -> Result<usize> {
        let store = self
            .summary_store
            .as_ref()
            .ok_or_else(|| CollectorError::Config("summary store not configured".to_string()))?;

        for record in records {
            store.put_summary(record).await?;
        }
        info!("Stored {} cost summaries", records.len());
        Ok(records.len())
    }

    /// Collect cost data for the last `days` days: fetch, persist the raw
    /// response, flatten, persist the summaries.
    pub async fn collect_last_n_days(&self, days: i64) -> Result<Vec<CostRecord>> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days);

        let raw = self.fetch_cost_and_usage(&CostQuery::new(start, end)).await?;

        if self.object_store.is_some() {
            self.store_raw(&raw, end).await?;
        }

        let records = process_cost_data(&raw);

        if self.summary_store.is_some() {
            self.store_summaries(&records).await?;
        }

        Ok(records)
    }
}

/// Flatten a raw response into one record per (period, group).
///
/// The flattening is positional: the first group key lands in `service`, the
/// second in `resource_id`, whatever dimensions the request named. Missing
/// keys fall back to "Unknown"/"N/A".
pub fn process_cost_data(raw: &CostAndUsage) -> Vec<CostRecord> {
    let now = Utc::now();
    let mut records = Vec::new();

    for period in &raw.results_by_time {
        let date = &period.time_period.start;
        for group in &period.groups {
            let service = group
                .keys
                .first()
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let resource_id = group
                .keys
                .get(1)
                .cloned()
                .unwrap_or_else(|| "N/A".to_string());

            records.push(CostRecord {
                date: date.clone(),
                service,
                resource_id,
                amortized_cost: metric_amount(group, "AmortizedCost"),
                unblended_cost: metric_amount(group, "UnblendedCost"),
                usage_quantity: metric_amount(group, "UsageQuantity"),
                timestamp: now,
            });
        }
    }

    records
}

/// Total cost per service, ordered descending by cost.
///
/// The sort is stable, so services with equal cost keep their response order.
pub fn aggregate_by_service(raw: &CostAndUsage) -> Vec<ServiceCost> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for period in &raw.results_by_time {
        for group in &period.groups {
            let service = group
                .keys
                .first()
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let cost = metric_amount(group, "UnblendedCost");
            if !totals.contains_key(&service) {
                order.push(service.clone());
            }
            *totals.entry(service).or_insert(0.0) += cost;
        }
    }

    let mut services: Vec<ServiceCost> = order
        .into_iter()
        .map(|service| {
            let cost = totals.get(&service).copied().unwrap_or(0.0);
            ServiceCost { service, cost }
        })
        .collect();
    services.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    services
}

/// Costs grouped by tag value. An empty or literal "untagged" key folds into
/// `untagged_cost` instead of creating a mapping entry.
pub fn parse_tagged_costs(raw: &CostAndUsage, tag_key: &str) -> TaggedCosts {
    let mut tagged = TaggedCosts {
        tag_key: tag_key.to_string(),
        by_tag_value: HashMap::new(),
        untagged_cost: 0.0,
    };

    for period in &raw.results_by_time {
        for group in &period.groups {
            let value = group.keys.first().map(String::as_str).unwrap_or("untagged");
            let cost = metric_amount(group, "UnblendedCost");

            if value.is_empty() || value == "untagged" {
                tagged.untagged_cost += cost;
            } else {
                *tagged.by_tag_value.entry(value.to_string()).or_insert(0.0) += cost;
            }
        }
    }

    tagged
}

/// Running total and per-service sums across all periods.
pub fn parse_cost_response(raw: &CostAndUsage) -> ParsedCosts {
    let mut parsed = ParsedCosts::default();

    for period in &raw.results_by_time {
        for group in &period.groups {
            let service = group
                .keys
                .first()
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let cost = metric_amount(group, "UnblendedCost");
            *parsed.by_service.entry(service).or_insert(0.0) += cost;
            parsed.total_cost += cost;
        }
    }

    parsed
}

/// Per-usage-type cost and quantity for a single-service response.
pub fn usage_by_type(raw: &CostAndUsage) -> HashMap<String, UsageTypeCost> {
    let mut usage = HashMap::new();

    for period in &raw.results_by_time {
        for group in &period.groups {
            let usage_type = group
                .keys
                .first()
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let cost = metric_amount(group, "UnblendedCost");
            let quantity = metric_amount(group, "UsageQuantity");
            let unit_cost = if quantity > 0.0 { cost / quantity } else { 0.0 };

            usage.insert(
                usage_type,
                UsageTypeCost {
                    cost,
                    quantity,
                    unit_cost,
                },
            );
        }
    }

    usage
}

fn metric_amount(group: &CostGroup, metric: &str) -> f64 {
    group
        .metrics
        .get(metric)
        .and_then(|value| value.amount.parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> CostAndUsage {
        serde_json::from_value(value).unwrap()
    }

    fn group(keys: Vec<&str>, unblended: &str) -> serde_json::Value {
        json!({
            "Keys": keys,
            "Metrics": {
                "UnblendedCost": {"Amount": unblended, "Unit": "USD"},
            }
        })
    }

    fn two_period_response() -> CostAndUsage {
        response(json!({
            "ResultsByTime": [
                {
                    "TimePeriod": {"Start": "2026-01-01", "End": "2026-01-02"},
                    "Groups": [
                        {
                            "Keys": ["Amazon EC2", "i-001"],
                            "Metrics": {
                                "AmortizedCost": {"Amount": "1.5", "Unit": "USD"},
                                "UnblendedCost": {"Amount": "1.4", "Unit": "USD"},
                                "UsageQuantity": {"Amount": "24", "Unit": "N/A"}
                            }
                        },
                        {
                            "Keys": ["Amazon RDS", "db-1"],
                            "Metrics": {
                                "AmortizedCost": {"Amount": "3.25", "Unit": "USD"},
                                "UnblendedCost": {"Amount": "3.0", "Unit": "USD"},
                                "UsageQuantity": {"Amount": "12", "Unit": "N/A"}
                            }
                        }
                    ]
                },
                {
                    "TimePeriod": {"Start": "2026-01-02", "End": "2026-01-03"},
                    "Groups": [
                        {
                            "Keys": ["Amazon EC2", "i-001"],
                            "Metrics": {
                                "AmortizedCost": {"Amount": "1.75", "Unit": "USD"},
                                "UnblendedCost": {"Amount": "1.6", "Unit": "USD"},
                                "UsageQuantity": {"Amount": "24", "Unit": "N/A"}
                            }
                        },
                        {
                            "Keys": ["Amazon RDS", "db-1"],
                            "Metrics": {
                                "AmortizedCost": {"Amount": "3.25", "Unit": "USD"},
                                "UnblendedCost": {"Amount": "3.0", "Unit": "USD"},
                                "UsageQuantity": {"Amount": "12", "Unit": "N/A"}
                            }
                        }
                    ]
                }
            ]
        }))
    }

    #[test]
    fn two_periods_two_groups_yield_four_records() {
        let records = process_cost_data(&two_period_response());
        assert_eq!(records.len(), 4);

        let first = &records[0];
        assert_eq!(first.date, "2026-01-01");
        assert_eq!(first.service, "Amazon EC2");
        assert_eq!(first.resource_id, "i-001");
        assert_eq!(first.amortized_cost, 1.5);
        assert_eq!(first.unblended_cost, 1.4);
        assert_eq!(first.usage_quantity, 24.0);

        let last = &records[3];
        assert_eq!(last.date, "2026-01-02");
        assert_eq!(last.service, "Amazon RDS");
        assert_eq!(last.resource_id, "db-1");
        assert_eq!(last.amortized_cost, 3.25);
    }

    #[test]
    fn missing_keys_fall_back_to_sentinels() {
        let raw = response(json!({
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2026-01-01", "End": "2026-01-02"},
                "Groups": [
                    {
                        "Keys": ["Amazon S3"],
                        "Metrics": {"AmortizedCost": {"Amount": "0.5", "Unit": "USD"}}
                    },
                    {
                        "Keys": [],
                        "Metrics": {"AmortizedCost": {"Amount": "0.1", "Unit": "USD"}}
                    }
                ]
            }]
        }));

        let records = process_cost_data(&raw);
        assert_eq!(records[0].service, "Amazon S3");
        assert_eq!(records[0].resource_id, "N/A");
        assert_eq!(records[1].service, "Unknown");
        assert_eq!(records[1].resource_id, "N/A");
        // absent metric converts to zero rather than failing the record
        assert_eq!(records[0].unblended_cost, 0.0);
    }

    #[test]
    fn aggregate_orders_by_descending_cost() {
        let raw = response(json!({
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2026-01-01", "End": "2026-02-01"},
                "Groups": [
                    group(vec!["A"], "10"),
                    group(vec!["B"], "30"),
                    group(vec!["C"], "20"),
                ]
            }]
        }));

        let services = aggregate_by_service(&raw);
        let names: Vec<&str> = services.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert_eq!(services[0].cost, 30.0);
    }

    #[test]
    fn aggregate_sums_across_periods_with_stable_ties() {
        let raw = response(json!({
            "ResultsByTime": [
                {
                    "TimePeriod": {"Start": "2026-01-01", "End": "2026-02-01"},
                    "Groups": [group(vec!["A"], "5"), group(vec!["B"], "10")]
                },
                {
                    "TimePeriod": {"Start": "2026-02-01", "End": "2026-03-01"},
                    "Groups": [group(vec!["A"], "5")]
                }
            ]
        }));

        let services = aggregate_by_service(&raw);
        // A and B both total 10; A appeared first in the response
        assert_eq!(services[0].service, "A");
        assert_eq!(services[1].service, "B");
    }

    #[test]
    fn empty_tag_key_folds_into_untagged() {
        let raw = response(json!({
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2026-01-01", "End": "2026-02-01"},
                "Groups": [group(vec![""], "5.0")]
            }]
        }));

        let tagged = parse_tagged_costs(&raw, "Environment");
        assert_eq!(tagged.untagged_cost, 5.0);
        assert!(tagged.by_tag_value.is_empty());
    }

    #[test]
    fn tag_values_accumulate_per_value() {
        let raw = response(json!({
            "ResultsByTime": [
                {
                    "TimePeriod": {"Start": "2026-01-01", "End": "2026-02-01"},
                    "Groups": [group(vec!["prod"], "7.5"), group(vec![""], "1.0")]
                },
                {
                    "TimePeriod": {"Start": "2026-02-01", "End": "2026-03-01"},
                    "Groups": [group(vec!["prod"], "2.5"), group(vec!["dev"], "1.0")]
                }
            ]
        }));

        let tagged = parse_tagged_costs(&raw, "Environment");
        assert_eq!(tagged.tag_key, "Environment");
        assert_eq!(tagged.by_tag_value["prod"], 10.0);
        assert_eq!(tagged.by_tag_value["dev"], 1.0);
        assert_eq!(tagged.untagged_cost, 1.0);
    }

    #[test]
    fn parse_cost_response_totals() {
        let parsed = parse_cost_response(&two_period_response());
        assert_eq!(parsed.by_service["Amazon EC2"], 3.0);
        assert_eq!(parsed.by_service["Amazon RDS"], 6.0);
        assert_eq!(parsed.total_cost, 9.0);
    }

    #[test]
    fn usage_by_type_guards_zero_quantity() {
        let raw = response(json!({
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2026-01-01", "End": "2026-02-01"},
                "Groups": [
                    {
                        "Keys": ["CW:MetricMonitorUsage"],
                        "Metrics": {
                            "UnblendedCost": {"Amount": "3.0", "Unit": "USD"},
                            "UsageQuantity": {"Amount": "10", "Unit": "N/A"}
                        }
                    },
                    {
                        "Keys": ["CW:Requests"],
                        "Metrics": {
                            "UnblendedCost": {"Amount": "1.0", "Unit": "USD"},
                            "UsageQuantity": {"Amount": "0", "Unit": "N/A"}
                        }
                    }
                ]
            }]
        }));

        let usage = usage_by_type(&raw);
        assert_eq!(usage["CW:MetricMonitorUsage"].unit_cost, 0.3);
        assert_eq!(usage["CW:Requests"].unit_cost, 0.0);
    }

    mod persistence {
        use super::*;
        use crate::model::CostForecast;
        use crate::storage::memory::{MemoryObjectStore, MemorySummaryStore};
        use async_trait::async_trait;
        use chrono::NaiveDate;

        struct FakeCostApi {
            response: CostAndUsage,
        }

        #[async_trait]
        impl CostApi for FakeCostApi {
            async fn cost_and_usage(&self, _query: &CostQuery) -> Result<CostAndUsage> {
                Ok(self.response.clone())
            }

            async fn cost_forecast(
                &self,
                start: NaiveDate,
                end: NaiveDate,
                _metric: ForecastMetric,
            ) -> Result<CostForecast> {
                Ok(CostForecast {
                    amount: 100.0,
                    period: format!("{start} to {end}"),
                    unit: "USD".to_string(),
                })
            }
        }

        #[tokio::test]
        async fn raw_blob_lands_at_the_partition_key() {
            let store = Arc::new(MemoryObjectStore::new());
            let collector = CostCollector::new(FakeCostApi {
                response: two_period_response(),
            })
            .with_object_store(store.clone());

            let raw = collector
                .fetch_cost_and_usage(&CostQuery::new(
                    "2026-01-01".parse().unwrap(),
                    "2026-01-03".parse().unwrap(),
                ))
                .await
                .unwrap();
            let key = collector
                .store_raw(&raw, "2026-01-03".parse().unwrap())
                .await
                .unwrap();

            assert_eq!(key, "raw/cost-explorer/year=2026/month=01/day=03/data.json");
            let object = store.get(&key).unwrap().unwrap();
            assert_eq!(object.content_type, "application/json");
            let body: CostAndUsage = serde_json::from_slice(&object.body).unwrap();
            assert_eq!(body, raw);
        }

        #[tokio::test]
        async fn store_raw_without_store_is_a_config_error() {
            let collector = CostCollector::new(FakeCostApi {
                response: CostAndUsage::default(),
            });
            let err = collector
                .store_raw(&CostAndUsage::default(), "2026-01-03".parse().unwrap())
                .await
                .unwrap_err();
            let err = err.downcast_ref::<CollectorError>().unwrap();
            assert!(matches!(err, CollectorError::Config(_)));
        }

        #[tokio::test]
        async fn collect_writes_one_summary_per_record() {
            let objects = Arc::new(MemoryObjectStore::new());
            let summaries = Arc::new(MemorySummaryStore::new());
            let collector = CostCollector::new(FakeCostApi {
                response: two_period_response(),
            })
            .with_object_store(objects.clone())
            .with_summary_store(summaries.clone());

            let records = collector.collect_last_n_days(90).await.unwrap();
            assert_eq!(records.len(), 4);
            assert_eq!(summaries.records().unwrap(), records);
            assert_eq!(objects.keys().unwrap().len(), 1);
        }
    }
}

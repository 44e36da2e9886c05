//! AWS SDK implementations of the collection API seams.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudwatch as cloudwatch;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use aws_sdk_costexplorer as costexplorer;
use aws_sdk_ec2 as ec2;
use aws_sdk_lambda as lambda;
use aws_sdk_rds as rds;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::api::{
    AlarmListing, CostAndUsage, CostApi, CostGroup, CostQuery, DbInstanceInfo, ForecastMetric,
    FunctionInfo, Granularity, GroupBy, InstanceInfo, InventoryApi, LogGroupInfo, MetricAlarmInfo,
    MetricAmount, MetricListing, MetricsApi, RawDatapoint, ResultByTime, Statistic,
    StatisticsQuery, Tag, TimePeriod,
};
use crate::error::{CollectorError, Result};
use crate::model::CostForecast;

/// Cost Explorer is only served out of us-east-1.
const COST_EXPLORER_REGION: &str = "us-east-1";

/// Build an SDK configuration for the given region.
pub async fn sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

fn api_err(err: impl std::error::Error) -> CollectorError {
    CollectorError::Api(format!("{}", DisplayErrorContext(err)))
}

fn to_smithy_time(time: DateTime<Utc>) -> aws_smithy_types::DateTime {
    aws_smithy_types::DateTime::from_millis(time.timestamp_millis())
}

fn from_smithy_time(time: &aws_smithy_types::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos()).unwrap_or_default()
}

/// Billing API backed by Cost Explorer.
pub struct AwsCostApi {
    client: costexplorer::Client,
}

impl AwsCostApi {
    /// Create a client pinned to the Cost Explorer home region.
    pub async fn new() -> Self {
        let sdk = sdk_config(COST_EXPLORER_REGION).await;
        Self {
            client: costexplorer::Client::new(&sdk),
        }
    }
}

fn ce_granularity(granularity: Granularity) -> costexplorer::types::Granularity {
    match granularity {
        Granularity::Daily => costexplorer::types::Granularity::Daily,
        Granularity::Monthly => costexplorer::types::Granularity::Monthly,
        Granularity::Hourly => costexplorer::types::Granularity::Hourly,
    }
}

fn convert_cost_and_usage(results: &[costexplorer::types::ResultByTime]) -> CostAndUsage {
    let results_by_time = results
        .iter()
        .map(|result| {
            let time_period = result
                .time_period()
                .map(|period| TimePeriod {
                    start: period.start().to_string(),
                    end: period.end().to_string(),
                })
                .unwrap_or_default();

            let groups = result
                .groups()
                .iter()
                .map(|group| {
                    let metrics = group
                        .metrics()
                        .map(|metrics| {
                            metrics
                                .iter()
                                .map(|(name, value)| {
                                    (
                                        name.clone(),
                                        MetricAmount {
                                            amount: value.amount().unwrap_or_default().to_string(),
                                            unit: value.unit().unwrap_or_default().to_string(),
                                        },
                                    )
                                })
                                .collect()
                        })
                        .unwrap_or_default();

                    CostGroup {
                        keys: group.keys().to_vec(),
                        metrics,
                    }
                })
                .collect();

            ResultByTime {
                time_period,
                groups,
                estimated: result.estimated().unwrap_or_default(),
            }
        })
        .collect();

    CostAndUsage { results_by_time }
}

#[async_trait]
impl CostApi for AwsCostApi {
    async fn cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsage> {
        use costexplorer::types::{
            DateInterval, Dimension, DimensionValues, Expression, GroupDefinition,
            GroupDefinitionType,
        };

        let period = DateInterval::builder()
            .start(query.start.to_string())
            .end(query.end.to_string())
            .build()
            .map_err(api_err)?;

        // usage records only: credits and refunds stay out of the data set
        let usage_only = Expression::builder()
            .dimensions(
                DimensionValues::builder()
                    .key(Dimension::RecordType)
                    .values("Usage")
                    .build(),
            )
            .build();

        let mut request = self
            .client
            .get_cost_and_usage()
            .time_period(period)
            .granularity(ce_granularity(query.granularity))
            .metrics("AmortizedCost")
            .metrics("UsageQuantity")
            .metrics("UnblendedCost")
            .filter(usage_only);

        for group in &query.group_by {
            let definition = match group {
                GroupBy::Dimension(key) => GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key(key)
                    .build(),
                GroupBy::Tag(key) => GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Tag)
                    .key(key)
                    .build(),
            };
            request = request.group_by(definition);
        }

        let response = request.send().await.map_err(api_err)?;
        Ok(convert_cost_and_usage(response.results_by_time()))
    }

    async fn cost_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        metric: ForecastMetric,
    ) -> Result<CostForecast> {
        use costexplorer::types::{DateInterval, Metric};

        let period = DateInterval::builder()
            .start(start.to_string())
            .end(end.to_string())
            .build()
            .map_err(api_err)?;
        let metric = match metric {
            ForecastMetric::UnblendedCost => Metric::UnblendedCost,
            ForecastMetric::AmortizedCost => Metric::AmortizedCost,
        };

        let response = self
            .client
            .get_cost_forecast()
            .time_period(period)
            .metric(metric)
            .granularity(costexplorer::types::Granularity::Monthly)
            .send()
            .await
            .map_err(api_err)?;

        let amount = response
            .total()
            .and_then(|total| total.amount())
            .and_then(|amount| amount.parse().ok())
            .unwrap_or(0.0);
        let unit = response
            .total()
            .and_then(|total| total.unit())
            .unwrap_or("USD")
            .to_string();

        Ok(CostForecast {
            amount,
            period: format!("{start} to {end}"),
            unit,
        })
    }
}

/// Metrics API backed by CloudWatch and CloudWatch Logs.
pub struct AwsMetricsApi {
    cloudwatch: cloudwatch::Client,
    logs: cloudwatchlogs::Client,
}

impl AwsMetricsApi {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            cloudwatch: cloudwatch::Client::new(sdk_config),
            logs: cloudwatchlogs::Client::new(sdk_config),
        }
    }
}

fn cw_statistic(statistic: Statistic) -> cloudwatch::types::Statistic {
    match statistic {
        Statistic::Average => cloudwatch::types::Statistic::Average,
        Statistic::Sum => cloudwatch::types::Statistic::Sum,
        Statistic::Maximum => cloudwatch::types::Statistic::Maximum,
        Statistic::Minimum => cloudwatch::types::Statistic::Minimum,
        Statistic::SampleCount => cloudwatch::types::Statistic::SampleCount,
    }
}

#[async_trait]
impl MetricsApi for AwsMetricsApi {
    async fn metric_statistics(&self, query: &StatisticsQuery) -> Result<Vec<RawDatapoint>> {
        use cloudwatch::types::{Dimension, StandardUnit};

        let mut request = self
            .cloudwatch
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(&query.metric_name)
            .start_time(to_smithy_time(query.start_time))
            .end_time(to_smithy_time(query.end_time))
            .period(query.period_seconds);

        for dimension in &query.dimensions {
            let dimension = Dimension::builder()
                .name(&dimension.name)
                .value(&dimension.value)
                .build()
                .map_err(api_err)?;
            request = request.dimensions(dimension);
        }
        for statistic in &query.statistics {
            request = request.statistics(cw_statistic(*statistic));
        }
        if let Some(unit) = &query.unit {
            request = request.unit(StandardUnit::from(unit.as_str()));
        }

        let response = request.send().await.map_err(api_err)?;

        let datapoints = response
            .datapoints()
            .iter()
            .map(|dp| {
                let mut values = HashMap::new();
                if let Some(value) = dp.average() {
                    values.insert(Statistic::Average, value);
                }
                if let Some(value) = dp.sum() {
                    values.insert(Statistic::Sum, value);
                }
                if let Some(value) = dp.maximum() {
                    values.insert(Statistic::Maximum, value);
                }
                if let Some(value) = dp.minimum() {
                    values.insert(Statistic::Minimum, value);
                }
                if let Some(value) = dp.sample_count() {
                    values.insert(Statistic::SampleCount, value);
                }
                RawDatapoint {
                    timestamp: dp.timestamp().map(from_smithy_time).unwrap_or_default(),
                    values,
                    unit: dp.unit().map(|unit| unit.as_str().to_string()),
                }
            })
            .collect();

        Ok(datapoints)
    }

    async fn list_metrics(&self) -> Result<Vec<MetricListing>> {
        let mut listings = Vec::new();
        let mut pages = self.cloudwatch.list_metrics().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(api_err)?;
            for metric in page.metrics() {
                listings.push(MetricListing {
                    namespace: metric.namespace().unwrap_or_default().to_string(),
                    name: metric.metric_name().unwrap_or_default().to_string(),
                });
            }
        }

        Ok(listings)
    }

    async fn describe_alarms(&self) -> Result<AlarmListing> {
        use cloudwatch::types::AlarmType;

        let mut listing = AlarmListing::default();
        let mut pages = self
            .cloudwatch
            .describe_alarms()
            .alarm_types(AlarmType::MetricAlarm)
            .alarm_types(AlarmType::CompositeAlarm)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(api_err)?;
            for alarm in page.metric_alarms() {
                listing.metric_alarms.push(MetricAlarmInfo {
                    name: alarm.alarm_name().unwrap_or_default().to_string(),
                    period_seconds: alarm.period().unwrap_or(60),
                });
            }
            listing.composite_alarms += page.composite_alarms().len() as u64;
        }

        Ok(listing)
    }

    async fn describe_log_groups(&self) -> Result<Vec<LogGroupInfo>> {
        let mut groups = Vec::new();
        let mut pages = self.logs.describe_log_groups().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(api_err)?;
            for group in page.log_groups() {
                groups.push(LogGroupInfo {
                    name: group.log_group_name().unwrap_or_default().to_string(),
                    stored_bytes: group.stored_bytes().unwrap_or(0),
                    retention_days: group.retention_in_days(),
                    created: group
                        .creation_time()
                        .and_then(DateTime::from_timestamp_millis),
                });
            }
        }

        Ok(groups)
    }
}

/// Inventory listing backed by the EC2, RDS and Lambda APIs.
pub struct AwsInventoryApi {
    ec2: ec2::Client,
    rds: rds::Client,
    lambda: lambda::Client,
}

impl AwsInventoryApi {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            ec2: ec2::Client::new(sdk_config),
            rds: rds::Client::new(sdk_config),
            lambda: lambda::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl InventoryApi for AwsInventoryApi {
    async fn describe_instances(&self) -> Result<Vec<InstanceInfo>> {
        let mut instances = Vec::new();
        let mut pages = self.ec2.describe_instances().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(api_err)?;
            for reservation in page.reservations() {
                for instance in reservation.instances() {
                    instances.push(InstanceInfo {
                        instance_id: instance.instance_id().unwrap_or_default().to_string(),
                        instance_type: instance
                            .instance_type()
                            .map(|t| t.as_str().to_string())
                            .unwrap_or_default(),
                        state: instance
                            .state()
                            .and_then(|state| state.name())
                            .map(|name| name.as_str().to_string())
                            .unwrap_or_default(),
                        launch_time: instance.launch_time().map(from_smithy_time),
                        availability_zone: instance
                            .placement()
                            .and_then(|placement| placement.availability_zone())
                            .map(str::to_string),
                        platform: instance.platform().map(|p| p.as_str().to_string()),
                        architecture: instance.architecture().map(|a| a.as_str().to_string()),
                        tags: instance
                            .tags()
                            .iter()
                            .map(|tag| Tag {
                                key: tag.key().unwrap_or_default().to_string(),
                                value: tag.value().unwrap_or_default().to_string(),
                            })
                            .collect(),
                        private_ip: instance.private_ip_address().map(str::to_string),
                        public_ip: instance.public_ip_address().map(str::to_string),
                        vpc_id: instance.vpc_id().map(str::to_string),
                        subnet_id: instance.subnet_id().map(str::to_string),
                        monitoring: instance
                            .monitoring()
                            .and_then(|monitoring| monitoring.state())
                            .map(|state| state.as_str().to_string()),
                    });
                }
            }
        }

        Ok(instances)
    }

    async fn describe_db_instances(&self) -> Result<Vec<DbInstanceInfo>> {
        let mut instances = Vec::new();
        let mut pages = self.rds.describe_db_instances().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(api_err)?;
            for db in page.db_instances() {
                instances.push(DbInstanceInfo {
                    identifier: db.db_instance_identifier().unwrap_or_default().to_string(),
                    instance_class: db.db_instance_class().unwrap_or_default().to_string(),
                    engine: db.engine().unwrap_or_default().to_string(),
                    engine_version: db.engine_version().unwrap_or_default().to_string(),
                    status: db.db_instance_status().unwrap_or_default().to_string(),
                    allocated_storage_gb: db.allocated_storage().unwrap_or(0),
                    storage_type: db.storage_type().map(str::to_string),
                    multi_az: db.multi_az().unwrap_or(false),
                    availability_zone: db.availability_zone().map(str::to_string),
                    backup_retention_days: db.backup_retention_period(),
                });
            }
        }

        Ok(instances)
    }

    async fn list_functions(&self) -> Result<Vec<FunctionInfo>> {
        let mut functions = Vec::new();
        let mut pages = self.lambda.list_functions().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(api_err)?;
            for function in page.functions() {
                functions.push(FunctionInfo {
                    name: function.function_name().unwrap_or_default().to_string(),
                    runtime: function.runtime().map(|r| r.as_str().to_string()),
                    memory_mb: function.memory_size().unwrap_or_default(),
                    timeout_seconds: function.timeout().unwrap_or_default(),
                    code_size_bytes: function.code_size().unwrap_or_default(),
                    last_modified: function.last_modified().unwrap_or_default().to_string(),
                    architecture: function
                        .architectures()
                        .first()
                        .map(|a| a.as_str().to_string()),
                    ephemeral_storage_mb: function.ephemeral_storage().map(|e| e.size()),
                });
            }
        }

        Ok(functions)
    }
}

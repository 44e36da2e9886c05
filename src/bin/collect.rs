// Data-collection entry point: one subcommand per collector.

use anyhow::Result;
use clap::{Parser, Subcommand};
use chrono::Utc;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use costwatch::api::aws::{AwsCostApi, AwsInventoryApi, AwsMetricsApi, sdk_config};
use costwatch::collector::cost::CostCollector;
use costwatch::collector::inventory::InventoryCollector;
use costwatch::collector::metrics::{MetricsCollector, compute_statistics};
use costwatch::config::CollectorConfig;
use costwatch::error::CollectorError;
use costwatch::estimate;
use costwatch::model::ResourceRef;
use costwatch::specs::StaticSpecs;
use costwatch::storage::dynamo::DynamoSummaryStore;
use costwatch::storage::s3::S3ObjectStore;
use costwatch::util::logging;

/// Command line arguments for the collection runner
#[derive(Parser, Debug)]
#[command(name = "collect", about = "AWS cost and utilization data collection")]
struct Args {
    /// Path to an optional configuration file; the environment overrides it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect cost and usage data, persisting raw and summary views
    Cost {
        /// Lookback window in days (defaults to the configured window)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Collect utilization metrics for the given resources
    Metrics {
        /// Resources to collect, as TYPE:ID (e.g. EC2:i-0abc, RDS:orders-db)
        #[arg(long = "resource", value_name = "TYPE:ID", required = true)]
        resources: Vec<String>,

        /// Lookback window in days (defaults to the configured window)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Scan the account inventory and persist it
    Inventory,
    /// Report CloudWatch usage-driven costs: custom metrics, alarms, log storage
    CloudwatchUsage,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CollectorConfig::load(path)?,
        None => CollectorConfig::from_env()?,
    };
    logging::init(&config.log_level);
    config.validate()?;

    match args.command {
        Command::Cost { days } => {
            run_cost(&config, days.unwrap_or(config.cost_collection_days)).await
        }
        Command::Metrics { resources, days } => {
            run_metrics(
                &config,
                &resources,
                days.unwrap_or(config.metrics_collection_days),
            )
            .await
        }
        Command::Inventory => run_inventory(&config).await,
        Command::CloudwatchUsage => run_cloudwatch_usage(&config).await,
    }
}

async fn run_cost(config: &CollectorConfig, days: i64) -> Result<()> {
    let sdk = sdk_config(&config.aws_region).await;
    let collector = CostCollector::new(AwsCostApi::new().await)
        .with_object_store(Arc::new(S3ObjectStore::new(&sdk, &config.s3_bucket)?))
        .with_summary_store(Arc::new(DynamoSummaryStore::new(
            &sdk,
            &config.dynamodb_table,
        )?))
        .with_key_prefix(&config.s3_prefix);

    let records = collector.collect_last_n_days(days).await?;
    info!("Cost collection finished");
    println!(
        "Collected {} cost records over the last {days} days",
        records.len()
    );
    Ok(())
}

async fn run_metrics(config: &CollectorConfig, resources: &[String], days: i64) -> Result<()> {
    let resources = resources
        .iter()
        .map(|arg| parse_resource(arg))
        .collect::<Result<Vec<_>>>()?;

    let sdk = sdk_config(&config.aws_region).await;
    let collector = MetricsCollector::new(AwsMetricsApi::new(&sdk))
        .with_object_store(Arc::new(S3ObjectStore::new(&sdk, &config.s3_bucket)?))
        .with_key_prefix(&config.s3_prefix)
        .with_period_seconds(config.metrics_period_seconds);

    let rows = collector.collect_batch_metrics(&resources, days).await?;
    let key = collector
        .store_metrics(&rows, Utc::now().date_naive())
        .await?;

    println!("Collected {} datapoints from {} resources", rows.len(), resources.len());
    if !key.is_empty() {
        println!("Stored metrics at {key}");
    }

    let stats = compute_statistics(&rows);
    for (resource_id, metrics) in &stats {
        println!("{resource_id}:");
        for (metric_name, summary) in metrics {
            println!(
                "  {metric_name}: mean={:.2} p95={:.2} max={:.2}",
                summary.mean, summary.p95, summary.max
            );
        }
    }
    Ok(())
}

async fn run_inventory(config: &CollectorConfig) -> Result<()> {
    let sdk = sdk_config(&config.aws_region).await;
    let collector = InventoryCollector::new(AwsInventoryApi::new(&sdk), StaticSpecs)
        .with_object_store(Arc::new(S3ObjectStore::new(&sdk, &config.s3_bucket)?))
        .with_key_prefix(&config.s3_prefix);

    let inventory = collector.collect_full_inventory().await?;
    let key = collector
        .store_inventory(&inventory, Utc::now().date_naive())
        .await?;

    println!("Scanned {} resources:", inventory.total());
    println!("  EC2 instances: {}", inventory.ec2_instances.len());
    println!("  RDS instances: {}", inventory.rds_instances.len());
    println!("  Lambda functions: {}", inventory.lambda_functions.len());
    println!("Stored inventory at {key}");
    Ok(())
}

async fn run_cloudwatch_usage(config: &CollectorConfig) -> Result<()> {
    let sdk = sdk_config(&config.aws_region).await;
    let collector = MetricsCollector::new(AwsMetricsApi::new(&sdk));

    let custom_metrics = collector.custom_metric_counts().await?;
    let total_custom: u64 = custom_metrics.values().sum();
    let metric_cost = estimate::custom_metric_monthly_cost(total_custom);

    println!("Custom metrics: {total_custom}");
    let mut by_namespace: Vec<_> = custom_metrics.iter().collect();
    by_namespace.sort_by(|a, b| b.1.cmp(a.1));
    for (namespace, count) in by_namespace {
        println!("  {namespace}: {count} metrics");
    }
    println!("Estimated monthly cost for custom metrics: ${metric_cost:.2}");

    let alarms = collector.alarm_counts().await?;
    let alarm_cost = estimate::alarm_monthly_cost(&alarms);
    println!("\nAlarms: {} total", alarms.total);
    println!("  Standard: {}", alarms.standard);
    println!("  High-resolution: {}", alarms.high_resolution);
    println!("  Composite: {}", alarms.composite);
    println!("Estimated monthly alarm cost: ${alarm_cost:.2}");

    let log_groups = collector.log_group_usage().await?;
    let total_storage_gb: f64 = log_groups.iter().map(|group| group.stored_gb).sum();
    let storage_cost = estimate::log_storage_monthly_cost(total_storage_gb);
    println!("\nLog groups: {}", log_groups.len());
    println!("Total log storage: {total_storage_gb:.2} GB");
    println!("Estimated monthly storage cost: ${storage_cost:.2}");
    println!("Top 5 largest log groups:");
    for group in log_groups.iter().take(5) {
        let retention = match group.retention_days {
            Some(days) => format!("{days} days"),
            None => "never expires".to_string(),
        };
        println!(
            "  {} ({:.2} GB, retention: {retention})",
            group.name, group.stored_gb
        );
    }

    let total = metric_cost + alarm_cost + storage_cost;
    println!("\nEstimated total monthly CloudWatch cost: ${total:.2}");
    Ok(())
}

fn parse_resource(arg: &str) -> Result<ResourceRef> {
    match arg.split_once(':') {
        Some((resource_type, resource_id)) if !resource_type.is_empty() && !resource_id.is_empty() => {
            Ok(ResourceRef::new(resource_type, resource_id))
        }
        _ => Err(CollectorError::Validation(format!("expected TYPE:ID, got: {arg}")).into()),
    }
}

use config::{self, Environment, File};
use log::{debug, error};
use serde::Deserialize;
use std::path::Path;

use crate::error::{CollectorError, Result};

/// Collector configuration.
///
/// Every setting can be supplied through the environment (`AWS_REGION`,
/// `S3_BUCKET`, `DYNAMODB_TABLE`, ...); an optional configuration file may
/// provide a baseline that the environment overrides. The configuration is
/// passed to each collector at construction rather than read as process-wide
/// state.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// AWS region for the regional API clients
    #[serde(default = "default_region")]
    pub aws_region: String,
    /// S3 bucket for raw data storage
    #[serde(default = "default_bucket")]
    pub s3_bucket: String,
    /// Optional key prefix prepended to every object key
    #[serde(default)]
    pub s3_prefix: String,
    /// DynamoDB table for cost summaries
    #[serde(default = "default_table")]
    pub dynamodb_table: String,
    /// Cost collection window in days
    #[serde(default = "default_cost_days")]
    pub cost_collection_days: i64,
    /// Metrics collection window in days
    #[serde(default = "default_metrics_days")]
    pub metrics_collection_days: i64,
    /// CloudWatch statistics period in seconds
    #[serde(default = "default_period_seconds")]
    pub metrics_period_seconds: i32,
    /// Minimum resource age before metrics are considered meaningful
    #[serde(default = "default_min_age_days")]
    pub min_resource_age_days: i64,
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket() -> String {
    "aws-cost-optimizer-data".to_string()
}

fn default_table() -> String {
    "cost-optimizer-summaries".to_string()
}

fn default_cost_days() -> i64 {
    90
}

fn default_metrics_days() -> i64 {
    15
}

fn default_period_seconds() -> i32 {
    3600
}

fn default_min_age_days() -> i64 {
    15
}

/// Logging level
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    #[serde(alias = "ERROR")]
    Error,
    /// Warning level
    #[serde(alias = "WARN", alias = "WARNING")]
    Warn,
    /// Info level
    #[serde(alias = "INFO")]
    Info,
    /// Debug level
    #[serde(alias = "DEBUG")]
    Debug,
    /// Trace level
    #[serde(alias = "TRACE")]
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl CollectorConfig {
    /// Load configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        build_config(None)
    }

    /// Load configuration from a file, overlaid with the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        build_config(Some(path.as_ref()))
    }

    /// Validate the configuration before any collector is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.s3_bucket.is_empty() {
            return Err(CollectorError::Config("S3 bucket must be configured".to_string()).into());
        }
        if self.dynamodb_table.is_empty() {
            return Err(
                CollectorError::Config("DynamoDB table must be configured".to_string()).into(),
            );
        }
        if self.cost_collection_days <= 0 || self.metrics_collection_days <= 0 {
            return Err(CollectorError::Config(
                "collection windows must be positive".to_string(),
            )
            .into());
        }
        if self.metrics_period_seconds <= 0 {
            return Err(
                CollectorError::Config("metrics period must be positive".to_string()).into(),
            );
        }
        Ok(())
    }
}

fn build_config(path: Option<&Path>) -> Result<CollectorConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        debug!("Loading configuration from {}", path.display());

        if !path.exists() {
            error!("Configuration file {} does not exist", path.display());
            return Err(CollectorError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            ))
            .into());
        }

        let extension = match path.extension() {
            Some(ext) => ext.to_string_lossy().to_lowercase(),
            None => {
                error!("Configuration file has no extension");
                return Err(CollectorError::Config(format!(
                    "Configuration file has no extension: {}",
                    path.display()
                ))
                .into());
            }
        };

        let format = match extension.as_str() {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            "yaml" | "yml" => config::FileFormat::Yaml,
            format => {
                error!("Unsupported configuration format: {}", format);
                return Err(
                    CollectorError::Config(format!("Unsupported config format: {}", format)).into(),
                );
            }
        };

        builder = builder.add_source(File::from(path).format(format));
    }

    // The environment always wins over file contents
    builder = builder.add_source(Environment::default().try_parsing(true));

    let config = builder
        .build()
        .map_err(|e| CollectorError::Config(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| CollectorError::Config(e.to_string()).into())
}

//! Monthly cost estimators for CloudWatch usage.
//!
//! Pricing follows the published per-month rates: custom metrics are tiered
//! (first 10,000 at $0.30, the remainder at $0.10), alarms are flat per
//! class, log storage is flat per stored GB.

use crate::model::AlarmCounts;

const CUSTOM_METRIC_TIER_LIMIT: u64 = 10_000;
const CUSTOM_METRIC_TIER_RATE: f64 = 0.30;
const CUSTOM_METRIC_OVERAGE_RATE: f64 = 0.10;

const STANDARD_ALARM_RATE: f64 = 0.10;
const HIGH_RESOLUTION_ALARM_RATE: f64 = 0.30;
const COMPOSITE_ALARM_RATE: f64 = 0.50;

const LOG_STORAGE_RATE_PER_GB: f64 = 0.03;

// 365 days * 24 hours / 12 months
const HOURS_PER_MONTH: f64 = 730.0;

/// Estimated monthly cost of the given number of custom metrics.
pub fn custom_metric_monthly_cost(total_metrics: u64) -> f64 {
    if total_metrics <= CUSTOM_METRIC_TIER_LIMIT {
        total_metrics as f64 * CUSTOM_METRIC_TIER_RATE
    } else {
        CUSTOM_METRIC_TIER_LIMIT as f64 * CUSTOM_METRIC_TIER_RATE
            + (total_metrics - CUSTOM_METRIC_TIER_LIMIT) as f64 * CUSTOM_METRIC_OVERAGE_RATE
    }
}

/// Estimated monthly cost of the given alarm counts.
pub fn alarm_monthly_cost(counts: &AlarmCounts) -> f64 {
    counts.standard as f64 * STANDARD_ALARM_RATE
        + counts.high_resolution as f64 * HIGH_RESOLUTION_ALARM_RATE
        + counts.composite as f64 * COMPOSITE_ALARM_RATE
}

/// Estimated monthly cost of log storage for the given stored size.
pub fn log_storage_monthly_cost(stored_gb: f64) -> f64 {
    stored_gb * LOG_STORAGE_RATE_PER_GB
}

/// Convert a stored byte count to GB.
pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// Convert a monthly cost to an hourly cost.
pub fn cost_per_hour(monthly_cost: f64) -> f64 {
    monthly_cost / HOURS_PER_MONTH
}

/// Weighted utilization score over CPU, memory and network averages.
///
/// Weights: CPU 50%, memory 40%, network 10%. Clamped to 0..=100.
pub fn utilization_score(cpu_avg: f64, memory_avg: f64, network_avg: f64) -> f64 {
    let score = cpu_avg * 0.5 + memory_avg * 0.4 + network_avg * 0.1;
    score.clamp(0.0, 100.0)
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn custom_metrics_within_first_tier() {
        assert!(close(custom_metric_monthly_cost(0), 0.0));
        assert!(close(custom_metric_monthly_cost(100), 30.0));
        assert!(close(custom_metric_monthly_cost(10_000), 3000.0));
    }

    #[test]
    fn custom_metrics_over_first_tier() {
        // first 10k at $0.30, remaining 2k at $0.10
        assert!(close(custom_metric_monthly_cost(12_000), 3200.0));
        assert!(close(custom_metric_monthly_cost(10_001), 3000.10));
    }

    #[test]
    fn alarm_cost_by_class() {
        let counts = AlarmCounts {
            total: 9,
            standard: 5,
            high_resolution: 3,
            composite: 1,
        };
        // 5 * 0.10 + 3 * 0.30 + 1 * 0.50
        assert!(close(alarm_monthly_cost(&counts), 1.90));
    }

    #[test]
    fn log_storage_cost() {
        assert!(close(log_storage_monthly_cost(100.0), 3.00));
        assert!(close(log_storage_monthly_cost(50.0), 1.50));
        let gb = bytes_to_gb(5 * 1024 * 1024 * 1024);
        assert!(close(log_storage_monthly_cost(gb), 0.15));
    }

    #[test]
    fn bytes_to_gb_is_exact_on_whole_gb() {
        assert!(close(bytes_to_gb(1_073_741_824), 1.0));
        assert!(close(bytes_to_gb(0), 0.0));
    }

    #[test]
    fn hourly_cost_uses_730_hours() {
        assert!(close(cost_per_hour(730.0), 1.0));
    }

    #[test]
    fn utilization_score_weights_and_clamps() {
        assert!(close(utilization_score(50.0, 50.0, 50.0), 50.0));
        assert!(close(utilization_score(100.0, 100.0, 0.0), 90.0));
        assert!(close(utilization_score(200.0, 200.0, 200.0), 100.0));
        assert!(close(utilization_score(0.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512.0), "512.00 B");
        assert_eq!(format_bytes(1536.0), "1.50 KB");
        assert_eq!(format_bytes(1.5 * 1024.0 * 1024.0 * 1024.0), "1.50 GB");
    }
}

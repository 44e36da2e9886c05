use std::collections::HashMap;

use crate::model::{MetricDatapoint, SummaryStatistics};

/// Compute summary statistics per (resource, metric) pair.
///
/// Each pair is summarized independently over whatever datapoints exist for
/// it. An empty input yields an empty mapping rather than an error.
pub fn summarize(rows: &[MetricDatapoint]) -> HashMap<String, HashMap<String, SummaryStatistics>> {
    let mut grouped: HashMap<(String, String), Vec<f64>> = HashMap::new();
    for row in rows {
        grouped
            .entry((row.resource_id.clone(), row.metric_name.clone()))
            .or_default()
            .push(row.value);
    }

    let mut stats: HashMap<String, HashMap<String, SummaryStatistics>> = HashMap::new();
    for ((resource_id, metric_name), values) in grouped {
        if let Some(summary) = describe(&values) {
            stats
                .entry(resource_id)
                .or_default()
                .insert(metric_name, summary);
        }
    }
    stats
}

/// Describe a series of values; `None` for an empty series.
///
/// The standard deviation is the population deviation, and quantiles use
/// linear interpolation between the two nearest order statistics.
pub fn describe(values: &[f64]) -> Option<SummaryStatistics> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(SummaryStatistics {
        mean,
        median: quantile(&sorted, 0.5),
        p95: quantile(&sorted, 0.95),
        p99: quantile(&sorted, 0.99),
        max: sorted[sorted.len() - 1],
        min: sorted[0],
        std: variance.sqrt(),
    })
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

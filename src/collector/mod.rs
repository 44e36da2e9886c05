pub mod cost;
pub mod inventory;
pub mod metrics;

pub use cost::CostCollector;
pub use inventory::InventoryCollector;
pub use metrics::MetricsCollector;

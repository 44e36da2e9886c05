//! A core library for building AWS cost and utilization collection agents

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod estimate;
pub mod model;
pub mod specs;
pub mod stats;
pub mod storage;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::api::{CostApi, CostQuery, InventoryApi, MetricsApi, StatisticsQuery};
    pub use crate::collector::{CostCollector, InventoryCollector, MetricsCollector};
    pub use crate::config::CollectorConfig;
    pub use crate::error::{CollectorError, Result};
    pub use crate::model::{CostRecord, Inventory, MetricDatapoint, ResourceRef, SummaryStatistics};
    pub use crate::specs::{SpecsProvider, StaticSpecs};
    pub use crate::storage::{Domain, ObjectStore, SummaryStore, object_key};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

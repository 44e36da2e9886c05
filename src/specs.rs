//! Static instance specifications.
//!
//! The lookup table stands in for the pricing/specification API; collectors
//! depend only on the `SpecsProvider` trait so a real lookup can replace it
//! without touching collector logic.

/// Approximate hardware specification of an instance class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceSpecs {
    pub vcpus: u32,
    pub memory_gb: f64,
}

/// Capability that resolves an instance class to its specification.
pub trait SpecsProvider: Send + Sync {
    /// Specs for the class, or `None` when the class is unknown.
    fn specs_for(&self, instance_class: &str) -> Option<InstanceSpecs>;
}

/// Built-in table covering the common EC2 and RDS instance classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSpecs;

impl SpecsProvider for StaticSpecs {
    fn specs_for(&self, instance_class: &str) -> Option<InstanceSpecs> {
        let (vcpus, memory_gb) = match instance_class {
            "t2.micro" => (1, 1.0),
            "t2.small" => (1, 2.0),
            "t2.medium" => (2, 4.0),
            "t2.large" => (2, 8.0),
            "t3.micro" => (2, 1.0),
            "t3.small" => (2, 2.0),
            "t3.medium" => (2, 4.0),
            "t3.large" => (2, 8.0),
            "m5.large" => (2, 8.0),
            "m5.xlarge" => (4, 16.0),
            "m5.2xlarge" => (8, 32.0),
            "c5.large" => (2, 4.0),
            "c5.xlarge" => (4, 8.0),
            "c5.2xlarge" => (8, 16.0),
            "db.t3.micro" => (2, 1.0),
            "db.t3.small" => (2, 2.0),
            "db.t3.medium" => (2, 4.0),
            "db.m5.large" => (2, 8.0),
            "db.m5.xlarge" => (4, 16.0),
            "db.m5.2xlarge" => (8, 32.0),
            _ => return None,
        };
        Some(InstanceSpecs { vcpus, memory_gb })
    }
}

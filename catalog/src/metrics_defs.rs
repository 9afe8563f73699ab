//! Metrics definitions for the catalog.

use shared::metrics_defs::{MetricDef, MetricType};

pub const CATALOG_REQUESTS: MetricDef = MetricDef {
    name: "catalog.requests",
    metric_type: MetricType::Counter,
    description: "Catalog API requests, tagged by endpoint and status",
};

pub const ALL_METRICS: &[MetricDef] = &[CATALOG_REQUESTS];

//! Metrics definitions for the gateway.

use shared::metrics_defs::{MetricDef, MetricType};

pub const GATEWAY_REQUESTS: MetricDef = MetricDef {
    name: "gateway.requests",
    metric_type: MetricType::Counter,
    description: "Handled requests, tagged by operation and outcome",
};

pub const ALL_METRICS: &[MetricDef] = &[GATEWAY_REQUESTS];

//! Metrics definitions for the batch collector.

use shared::metrics_defs::{MetricDef, MetricType};

pub const COLLECT_RUNS: MetricDef = MetricDef {
    name: "collector.runs",
    metric_type: MetricType::Counter,
    description: "Completed collection runs, tagged by outcome",
};

pub const COLLECT_DURATION: MetricDef = MetricDef {
    name: "collector.run.duration",
    metric_type: MetricType::Histogram,
    description: "Wall time of one collection run in seconds",
};

pub const COLLECT_CASES: MetricDef = MetricDef {
    name: "collector.cases",
    metric_type: MetricType::Gauge,
    description: "Cases written by the last successful run",
};

pub const ENRICH_SEARCHES: MetricDef = MetricDef {
    name: "collector.enrich.searches",
    metric_type: MetricType::Counter,
    description: "Case law searches issued, tagged by outcome",
};

pub const ALL_METRICS: &[MetricDef] = &[
    COLLECT_RUNS,
    COLLECT_DURATION,
    COLLECT_CASES,
    ENRICH_SEARCHES,
];

//! Metrics definitions for the Notion client.

use shared::metrics_defs::{MetricDef, MetricType};

pub const NOTION_REQUESTS: MetricDef = MetricDef {
    name: "notion.requests",
    metric_type: MetricType::Counter,
    description: "Requests sent to the Notion API, tagged by outcome",
};

pub const NOTION_REQUEST_DURATION: MetricDef = MetricDef {
    name: "notion.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a Notion API request in seconds",
};

pub const NOTION_PAGES_FETCHED: MetricDef = MetricDef {
    name: "notion.pages_fetched",
    metric_type: MetricType::Counter,
    description: "Result pages fetched while paginating a database query",
};

pub const ALL_METRICS: &[MetricDef] = &[
    NOTION_REQUESTS,
    NOTION_REQUEST_DURATION,
    NOTION_PAGES_FETCHED,
];

//! Metrics definitions for the PROJUDI automation.

use shared::metrics_defs::{MetricDef, MetricType};

pub const SESSIONS: MetricDef = MetricDef {
    name: "projudi.session",
    metric_type: MetricType::Counter,
    description: "Browser sessions run for a lookup. Tagged with outcome.",
};

pub const SKIPPED: MetricDef = MetricDef {
    name: "projudi.skipped",
    metric_type: MetricType::Counter,
    description: "Lookups answered without a browser session because credentials were missing.",
};

pub const MOVEMENTS_TABLE_RETRIES: MetricDef = MetricDef {
    name: "projudi.movements_table.retry",
    metric_type: MetricType::Counter,
    description: "Repeated attempts at reading the movements table.",
};

pub const SESSION_DURATION: MetricDef = MetricDef {
    name: "projudi.session.duration",
    metric_type: MetricType::Histogram,
    description: "Wall time of a browser session in seconds, launch to close.",
};

pub const ALL_METRICS: &[MetricDef] =
    &[SESSIONS, SKIPPED, MOVEMENTS_TABLE_RETRIES, SESSION_DURATION];

//! Metrics definitions for the SAJ client.

use shared::metrics_defs::{MetricDef, MetricType};

pub const LOOKUPS: MetricDef = MetricDef {
    name: "saj.lookup",
    metric_type: MetricType::Counter,
    description: "SAJ lookups. Tagged with outcome (terminal, escalate).",
};

pub const ESCALATIONS: MetricDef = MetricDef {
    name: "saj.escalation",
    metric_type: MetricType::Counter,
    description: "SAJ lookups handed over to PROJUDI. Tagged with reason.",
};

pub const ALL_METRICS: &[MetricDef] = &[LOOKUPS, ESCALATIONS];

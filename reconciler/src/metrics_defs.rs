//! Metrics definitions for resolution and batch runs.

use shared::metrics_defs::{MetricDef, MetricType};

pub const RESOLUTIONS: MetricDef = MetricDef {
    name: "reconciler.resolution",
    metric_type: MetricType::Counter,
    description: "Process numbers resolved. Tagged with tier (saj, projudi, none).",
};

pub const BATCH_ITEMS: MetricDef = MetricDef {
    name: "batch.item",
    metric_type: MetricType::Counter,
    description: "Batch inputs. Tagged with validity (valid, invalid, cancelled).",
};

pub const BATCH_REMAINING: MetricDef = MetricDef {
    name: "batch.remaining",
    metric_type: MetricType::Gauge,
    description: "Inputs of the running batch not yet processed.",
};

pub const ALL_METRICS: &[MetricDef] = &[RESOLUTIONS, BATCH_ITEMS, BATCH_REMAINING];

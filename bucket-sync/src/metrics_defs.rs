//! Metrics definitions for bucket-sync.

use shared::metrics_defs::{MetricDef, MetricType};

pub const DELIVERIES_RECEIVED: MetricDef = MetricDef {
    name: "deliveries.received",
    metric_type: MetricType::Counter,
    description: "Number of notifications delivered by the relay",
};

pub const DELIVERIES_REJECTED: MetricDef = MetricDef {
    name: "deliveries.rejected",
    metric_type: MetricType::Counter,
    description: "Deliveries aborted before routing because of missing configuration or a malformed body",
};

pub const RECORDS_SKIPPED: MetricDef = MetricDef {
    name: "records.skipped",
    metric_type: MetricType::Counter,
    description: "Records ignored because of their source, bucket or event name",
};

pub const COPY_SUCCEEDED: MetricDef = MetricDef {
    name: "copy.succeeded",
    metric_type: MetricType::Counter,
    description: "Objects copied to the target bucket",
};

pub const COPY_FAILED: MetricDef = MetricDef {
    name: "copy.failed",
    metric_type: MetricType::Counter,
    description: "Copies that failed in the download, upload or cleanup step",
};

pub const COPY_DURATION: MetricDef = MetricDef {
    name: "copy.duration",
    metric_type: MetricType::Histogram,
    description: "Time to download, upload and clean up one object in seconds",
};

pub const COPY_BYTES: MetricDef = MetricDef {
    name: "copy.bytes",
    metric_type: MetricType::Histogram,
    description: "Size of each replicated object in bytes",
};

pub const DELETE_SUCCEEDED: MetricDef = MetricDef {
    name: "delete.succeeded",
    metric_type: MetricType::Counter,
    description: "Replicas deleted and confirmed absent",
};

pub const DELETE_FAILED: MetricDef = MetricDef {
    name: "delete.failed",
    metric_type: MetricType::Counter,
    description: "Deletes that were rejected or could not be confirmed",
};

pub const ALL_METRICS: &[MetricDef] = &[
    DELIVERIES_RECEIVED,
    DELIVERIES_REJECTED,
    RECORDS_SKIPPED,
    COPY_SUCCEEDED,
    COPY_FAILED,
    COPY_DURATION,
    COPY_BYTES,
    DELETE_SUCCEEDED,
    DELETE_FAILED,
];

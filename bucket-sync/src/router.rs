use crate::config::{FailurePolicy, ReplicationConfig};
use crate::errors::ActionError;
use crate::executor::Executor;
use crate::metrics_defs::RECORDS_SKIPPED;
use crate::notification::{ChangeNotification, ChangeRecord, EventName, STORAGE_EVENT_SOURCE};
use shared::counter;

/// Why a record produced no action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotStorageEvent(String),
    OtherBucket(String),
    UnrecognizedEvent(String),
}

/// What a single record asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Copy,
    Delete,
    Skip(SkipReason),
}

pub fn route(record: &ChangeRecord, config: &ReplicationConfig) -> Route {
    if record.event_source != STORAGE_EVENT_SOURCE {
        return Route::Skip(SkipReason::NotStorageEvent(record.event_source.clone()));
    }
    if record.bucket() != config.source_bucket {
        return Route::Skip(SkipReason::OtherBucket(record.bucket().to_string()));
    }
    match &record.event_name {
        EventName::Created => Route::Copy,
        EventName::Removed => Route::Delete,
        EventName::Unrecognized(name) => Route::Skip(SkipReason::UnrecognizedEvent(name.clone())),
    }
}

#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record in the notification
    pub index: usize,
    pub bucket: String,
    pub key: String,
    pub error: ActionError,
}

/// Outcome of processing every record of one notification.
#[derive(Debug, Default)]
pub struct ProcessReport {
    pub copied: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
    /// Records left untouched because processing halted on a failure
    pub not_attempted: usize,
}

impl ProcessReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Routes each record of a notification to a copy, a delete, or nothing.
#[derive(Clone)]
pub struct Router {
    executor: Executor,
    policy: FailurePolicy,
}

impl Router {
    pub fn new(executor: Executor, policy: FailurePolicy) -> Self {
        Router { executor, policy }
    }

    /// Records are handled one at a time, in the order they were delivered.
    pub async fn process(
        &self,
        notification: &ChangeNotification,
        config: &ReplicationConfig,
    ) -> ProcessReport {
        let mut report = ProcessReport::default();

        for (index, record) in notification.records.iter().enumerate() {
            let bucket = record.bucket();
            let key = record.key();

            let result = match route(record, config) {
                Route::Skip(reason) => {
                    log_skip(&reason);
                    counter!(RECORDS_SKIPPED).increment(1);
                    report.skipped += 1;
                    continue;
                }
                Route::Copy => {
                    tracing::info!(
                        key,
                        source_bucket = bucket,
                        target_bucket = %config.target_bucket,
                        "Copying file"
                    );
                    self.executor
                        .copy(bucket, key, config)
                        .await
                        .map(|bytes| {
                            tracing::info!(
                                key,
                                source_bucket = bucket,
                                target_bucket = %config.target_bucket,
                                bytes,
                                "Finished copying file"
                            );
                            report.copied += 1;
                        })
                        .map_err(ActionError::from)
                }
                Route::Delete => {
                    tracing::info!(key, target_bucket = %config.target_bucket, "Deleting copy of file");
                    self.executor
                        .delete(key, config)
                        .await
                        .map(|()| {
                            tracing::info!(
                                key,
                                target_bucket = %config.target_bucket,
                                "Finished deleting copy of file"
                            );
                            report.deleted += 1;
                        })
                        .map_err(ActionError::from)
                }
            };

            if let Err(error) = result {
                tracing::error!(
                    bucket,
                    key,
                    target_bucket = %config.target_bucket,
                    error = %error,
                    "Replication action failed"
                );
                report.failures.push(RecordFailure {
                    index,
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    error,
                });

                if self.policy == FailurePolicy::Halt {
                    report.not_attempted = notification.records.len() - index - 1;
                    if report.not_attempted > 0 {
                        tracing::warn!(
                            remaining = report.not_attempted,
                            "Halting, remaining records are not processed"
                        );
                    }
                    break;
                }
            }
        }

        report
    }
}

fn log_skip(reason: &SkipReason) {
    match reason {
        SkipReason::NotStorageEvent(source) => {
            tracing::info!(event_source = %source, "Not S3 event, skip")
        }
        SkipReason::OtherBucket(bucket) => {
            tracing::info!(bucket = %bucket, "Not interested in bucket")
        }
        SkipReason::UnrecognizedEvent(name) => {
            tracing::warn!(event_name = %name, "Unrecognized event")
        }
    }
}

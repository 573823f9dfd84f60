//! Storage change notifications as delivered in the queue message body.

use crate::errors::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Event source tag of records emitted by object storage.
pub const STORAGE_EVENT_SOURCE: &str = "aws:s3";

const OBJECT_CREATED_PUT: &str = "ObjectCreated:Put";
const OBJECT_REMOVED_DELETE: &str = "ObjectRemoved:Delete";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ChangeNotification {
    // Test events sent when the notification is first configured carry no records.
    #[serde(rename = "Records", default, deserialize_with = "null_as_empty")]
    pub records: Vec<ChangeRecord>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ChangeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ChangeRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    #[serde(default)]
    pub event_version: String,
    pub event_source: String,
    #[serde(default)]
    pub aws_region: String,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    pub event_name: EventName,
    pub s3: StorageEntity,
}

impl ChangeRecord {
    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    pub fn key(&self) -> &str {
        &self.s3.object.key
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BucketRef {
    pub name: String,
    #[serde(default)]
    pub arn: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ObjectRef {
    pub key: String,
    // Removal events omit size and eTag.
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "eTag")]
    pub etag: String,
    #[serde(default)]
    pub sequencer: String,
}

/// The kinds of change the replicator acts on. Everything else is kept verbatim for logging.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(from = "String")]
pub enum EventName {
    Created,
    Removed,
    Unrecognized(String),
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        match name.as_str() {
            OBJECT_CREATED_PUT => EventName::Created,
            OBJECT_REMOVED_DELETE => EventName::Removed,
            _ => EventName::Unrecognized(name),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventName::Created => f.write_str(OBJECT_CREATED_PUT),
            EventName::Removed => f.write_str(OBJECT_REMOVED_DELETE),
            EventName::Unrecognized(name) => f.write_str(name),
        }
    }
}

/// Decodes a notification document. There is no partial decode: any malformed record fails
/// the whole notification.
pub fn parse(raw: &[u8]) -> Result<ChangeNotification, ParseError> {
    Ok(serde_json::from_slice(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{notification_json, record_json};
    use chrono::TimeZone;

    #[test]
    fn test_parse_put_event() {
        let raw = r#"{
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-west-2",
                "eventTime": "2019-02-05T21:04:39.123Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": {"principalId": "AWS:AIDAJDPLRKLG7UEXAMPLE"},
                "requestParameters": {"sourceIPAddress": "127.0.0.1"},
                "responseElements": {
                    "x-amz-request-id": "C3D13FE58DE4C810",
                    "x-amz-id-2": "FMyUVURIY8/IgAtTv8xRjskZQpcIZ9KG4V5Wp6S7S/JRWeUWerMUE5JgHvANOjpD"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "replicate",
                    "bucket": {
                        "name": "uploads",
                        "ownerIdentity": {"principalId": "A3NL1KOZZKExample"},
                        "arn": "arn:aws:s3:::uploads"
                    },
                    "object": {
                        "key": "reports/a.txt",
                        "size": 1024,
                        "eTag": "d41d8cd98f00b204e9800998ecf8427e",
                        "sequencer": "0055AED6DCD90281E5"
                    }
                }
            }]
        }"#;

        let notification = parse(raw.as_bytes()).unwrap();
        assert_eq!(notification.records.len(), 1);

        let record = &notification.records[0];
        assert_eq!(record.event_source, STORAGE_EVENT_SOURCE);
        assert_eq!(record.event_name, EventName::Created);
        assert_eq!(record.aws_region, "us-west-2");
        assert_eq!(
            record.event_time,
            Some(
                Utc.with_ymd_and_hms(2019, 2, 5, 21, 4, 39).unwrap()
                    + chrono::Duration::milliseconds(123)
            )
        );
        assert_eq!(record.bucket(), "uploads");
        assert_eq!(record.key(), "reports/a.txt");
        assert_eq!(record.s3.bucket.arn, "arn:aws:s3:::uploads");
        assert_eq!(record.s3.object.size, 1024);
        assert_eq!(record.s3.object.etag, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(record.s3.object.sequencer, "0055AED6DCD90281E5");
    }

    #[test]
    fn test_parse_delete_event_without_size() {
        let raw = r#"{"Records": [{
            "eventSource": "aws:s3",
            "eventTime": "2019-02-05T21:04:39Z",
            "eventName": "ObjectRemoved:Delete",
            "s3": {"bucket": {"name": "uploads"}, "object": {"key": "a.txt", "sequencer": "01"}}
        }]}"#;

        let record = &parse(raw.as_bytes()).unwrap().records[0];
        assert_eq!(record.event_name, EventName::Removed);
        assert_eq!(record.s3.object.size, 0);
        assert_eq!(record.s3.object.etag, "");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventName::from("ObjectCreated:Put".to_string()), EventName::Created);
        assert_eq!(
            EventName::from("ObjectRemoved:Delete".to_string()),
            EventName::Removed
        );

        let multipart = EventName::from("ObjectCreated:CompleteMultipartUpload".to_string());
        assert_eq!(
            multipart,
            EventName::Unrecognized("ObjectCreated:CompleteMultipartUpload".into())
        );
        assert_eq!(multipart.to_string(), "ObjectCreated:CompleteMultipartUpload");
        assert_eq!(EventName::Created.to_string(), "ObjectCreated:Put");
    }

    #[test]
    fn test_parse_preserves_order() {
        let raw = notification_json(&[
            record_json("aws:s3", "ObjectCreated:Put", "uploads", "first"),
            record_json("aws:s3", "ObjectRemoved:Delete", "uploads", "second"),
            record_json("aws:sqs", "ObjectCreated:Put", "uploads", "third"),
        ]);
        let keys: Vec<_> = parse(raw.as_bytes())
            .unwrap()
            .records
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(keys, ["first", "second", "third"]);
    }

    #[test]
    fn test_parse_without_records() {
        let raw = r#"{"Service": "Amazon S3", "Event": "s3:TestEvent", "Bucket": "uploads"}"#;
        assert!(parse(raw.as_bytes()).unwrap().records.is_empty());
    }

    #[test]
    fn test_parse_null_records() {
        let notification = parse(br#"{"Records": null}"#).unwrap();
        assert!(notification.records.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let raw = notification_json(&[record_json(
            "aws:s3",
            "ObjectCreated:Put",
            "uploads",
            "a.txt",
        )]);

        // Truncated document
        assert!(parse(&raw.as_bytes()[..raw.len() / 2]).is_err());
        // Not UTF-8
        assert!(parse(&[0xff, 0xfe, 0x7b]).is_err());
        // Wrong shape
        assert!(parse(br#"{"Records": {"eventName": "ObjectCreated:Put"}}"#).is_err());
        assert!(parse(br#"{"Records": [{"eventSource": "aws:s3"}]}"#).is_err());
        // Bad timestamp
        assert!(
            parse(
                br#"{"Records": [{"eventSource": "aws:s3", "eventTime": "noon",
                "eventName": "ObjectCreated:Put",
                "s3": {"bucket": {"name": "b"}, "object": {"key": "k"}}}]}"#
            )
            .is_err()
        );
        assert!(parse(b"").is_err());
    }
}

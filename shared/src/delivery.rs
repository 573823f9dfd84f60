//! Delivery metadata and payload extraction for messages pushed by the queue relay.
//!
//! The relay speaks CloudEvents in binary mode: event attributes travel as `ce-*`
//! headers and the HTTP body is the queue message, whose `Body` field carries the
//! storage notification document.

use chrono::{DateTime, SecondsFormat, Utc};
use http::HeaderMap;
use hyper::body::Bytes;
use serde::Deserialize;

pub const CE_ID: &str = "ce-id";
pub const CE_SOURCE: &str = "ce-source";
pub const CE_TIME: &str = "ce-time";
pub const CE_TYPE: &str = "ce-type";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeliveryMetadata {
    pub id: Option<String>,
    pub source: Option<String>,
    pub event_type: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

impl DeliveryMetadata {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        DeliveryMetadata {
            id: header(CE_ID),
            source: header(CE_SOURCE),
            event_type: header(CE_TYPE),
            time: header(CE_TIME).and_then(|t| {
                DateTime::parse_from_rfc3339(&t)
                    .ok()
                    .map(|t| t.with_timezone(&Utc))
            }),
        }
    }

    pub fn time_rfc3339(&self) -> String {
        self.time
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }

    pub fn source_or_empty(&self) -> &str {
        self.source.as_deref().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct QueueMessage {
    #[serde(rename = "Body")]
    body: String,
}

/// Returns the message body carried by a queue message envelope. Payloads that are not
/// an envelope are returned untouched so the caller's own decoding reports the problem.
pub fn message_body(raw: Bytes) -> Bytes {
    match serde_json::from_slice::<QueueMessage>(&raw) {
        Ok(message) => Bytes::from(message.body),
        Err(_) => raw,
    }
}

//! Inbound records and the object stored for each of them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One queued message as delivered by the invoker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRecord {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub body: String,
}

impl InboundRecord {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
        }
    }
}

/// JSON document written for every persisted record.
///
/// Field names match the objects already present in the bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage<'a> {
    pub message_id: &'a str,
    #[serde(rename = "timestamp", serialize_with = "serialize_millis")]
    pub received_at: DateTime<Utc>,
    #[serde(rename = "originalMessage")]
    pub original_payload: &'a Value,
    pub processed_by: &'a str,
}

impl StoredMessage<'_> {
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&crate::key::iso_timestamp(*at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_inbound_record_from_sqs_shape() {
        let record: InboundRecord = serde_json::from_value(json!({
            "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
            "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
            "body": "{\"order\": 1}",
            "eventSource": "aws:sqs"
        }))
        .unwrap();
        assert_eq!(record.message_id, "059f36b4-87a3-44ab-83d2-661975830a7d");
        assert_eq!(record.body, "{\"order\": 1}");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let record: InboundRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record, InboundRecord::new("", ""));
    }

    #[test]
    fn test_stored_message_wire_format() {
        let payload = json!({"user": "ana", "items": [1, 2]});
        let stored = StoredMessage {
            message_id: "m-1",
            received_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            original_payload: &payload,
            processed_by: "lambda-message-processor",
        };

        let bytes = stored.to_pretty_json().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains('\n'), "expected pretty-printed output");

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "messageId": "m-1",
                "timestamp": "2024-01-02T03:04:05.000Z",
                "originalMessage": {"user": "ana", "items": [1, 2]},
                "processedBy": "lambda-message-processor"
            })
        );
    }
}

//! Object key layout
//!
//! Layout: `messages/{timestamp}-{uuid}.json`, index at `index.html`.
//! The timestamp is ISO-8601 with `:` and `.` replaced so the key only
//! contains characters that are safe in every backend.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

pub const MESSAGE_PREFIX: &str = "messages/";
pub const MESSAGE_SUFFIX: &str = ".json";
pub const INDEX_KEY: &str = "index.html";

/// Key for a message processed at `at`, using a fresh random id
pub fn new_message_key(at: DateTime<Utc>) -> String {
    message_key(at, Uuid::new_v4())
}

pub fn message_key(at: DateTime<Utc>, id: Uuid) -> String {
    format!(
        "{}{}-{}{}",
        MESSAGE_PREFIX,
        key_timestamp(at),
        id,
        MESSAGE_SUFFIX
    )
}

/// Millisecond ISO-8601 timestamp, e.g. `2024-05-01T09:30:00.123Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn key_timestamp(at: DateTime<Utc>) -> String {
    iso_timestamp(at).replace([':', '.'], "-")
}

/// Whether a listed key is a stored message (not the prefix marker or a stray file)
pub fn is_message_key(key: &str) -> bool {
    key.len() > MESSAGE_PREFIX.len() + MESSAGE_SUFFIX.len()
        && key.starts_with(MESSAGE_PREFIX)
        && key.ends_with(MESSAGE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap() + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn test_key_layout() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let key = message_key(fixed_time(), id);
        assert_eq!(
            key,
            "messages/2024-05-01T09-30-00-123Z-67e55044-10b1-426f-9247-bb680e5fe0c8.json"
        );
        assert!(!key["messages/".len()..].contains(':'));
        assert!(is_message_key(&key));
    }

    #[test]
    fn test_same_millisecond_keys_differ() {
        let at = fixed_time();
        let first = new_message_key(at);
        let second = new_message_key(at);
        assert_ne!(first, second);
        assert!(first.starts_with("messages/2024-05-01T09-30-00-123Z-"));
        assert!(second.starts_with("messages/2024-05-01T09-30-00-123Z-"));
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(fixed_time()), "2024-05-01T09:30:00.123Z");
    }

    #[test]
    fn test_is_message_key() {
        assert!(!is_message_key("messages/"));
        assert!(!is_message_key("messages/.json"));
        assert!(!is_message_key("messages/readme.txt"));
        assert!(!is_message_key("index.html"));
        assert!(!is_message_key("archive/x.json"));
        assert!(is_message_key("messages/x.json"));
    }
}

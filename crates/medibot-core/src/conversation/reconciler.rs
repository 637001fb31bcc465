//! Maps remote history into the local message model.

use super::client::RemoteMessage;
use super::message::{Message, MessageIdGenerator, MessageMetadata, MessageRole};
use chrono::{DateTime, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Stateless history reconciler.
///
/// Output order equals input order, every record yields exactly one message,
/// and each message gets a fresh local id. Feedback is never carried over
/// because the server does not store it.
pub struct HistoryReconciler;

impl HistoryReconciler {
    pub fn reconcile(records: &[RemoteMessage], ids: &MessageIdGenerator) -> Vec<Message> {
        let now = Utc::now();
        records
            .iter()
            .map(|record| Self::reconcile_one(record, ids.next_id(), now))
            .collect()
    }

    fn reconcile_one(record: &RemoteMessage, id: u64, fallback: DateTime<Utc>) -> Message {
        let role = parse_role(&record.role);
        let metadata = match role {
            MessageRole::User => None,
            MessageRole::Assistant => Some(
                record
                    .metadata
                    .as_ref()
                    .map(|m| MessageMetadata {
                        has_context: m.has_context,
                        sources: m.sources.clone(),
                        generation_time: m.generation_time,
                    })
                    .unwrap_or_default(),
            ),
        };

        Message {
            id,
            role,
            text: record.content.clone(),
            timestamp: record
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or(fallback),
            metadata,
            feedback: None,
            is_error: false,
        }
    }
}

/// Anything the server does not call "user" was authored on the bot side.
fn parse_role(role: &str) -> MessageRole {
    if role.eq_ignore_ascii_case("user") {
        MessageRole::User
    } else {
        MessageRole::Assistant
    }
}

/// Parses RFC 3339, falling back to naive ISO-8601 interpreted as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::client::RemoteMetadata;
    use chrono::TimeZone;

    fn record(role: &str, content: &str, timestamp: Option<&str>) -> RemoteMessage {
        RemoteMessage {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: timestamp.map(str::to_string),
            metadata: None,
        }
    }

    #[test]
    fn test_preserves_order_and_assigns_increasing_ids() {
        let ids = MessageIdGenerator::starting_at(100);
        let records = vec![
            record("user", "I have a headache", None),
            record("assistant", "How long has it lasted?", None),
            record("user", "Two days", None),
        ];

        let messages = HistoryReconciler::reconcile(&records, &ids);

        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["I have a headache", "How long has it lasted?", "Two days"]);
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(messages[0].id, 100);
    }

    #[test]
    fn test_missing_metadata_defaults_on_assistant_only() {
        let ids = MessageIdGenerator::starting_at(1);
        let messages = HistoryReconciler::reconcile(
            &[record("user", "hi", None), record("assistant", "hello", None)],
            &ids,
        );

        assert_eq!(messages[0].role, MessageRole::User);
        assert!(messages[0].metadata.is_none());
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].metadata, Some(MessageMetadata::default()));
        assert!(messages.iter().all(|m| m.feedback.is_none() && !m.is_error));
    }

    #[test]
    fn test_metadata_is_carried_over() {
        let ids = MessageIdGenerator::starting_at(1);
        let mut reply = record("assistant", "Drink water.", None);
        reply.metadata = Some(RemoteMetadata {
            has_context: true,
            sources: vec!["WHO".to_string(), "NHS".to_string()],
            generation_time: Some(0.8),
        });

        let messages = HistoryReconciler::reconcile(&[reply], &ids);
        let metadata = messages[0].metadata.as_ref().unwrap();
        assert!(metadata.has_context);
        assert_eq!(metadata.sources, vec!["WHO".to_string(), "NHS".to_string()]);
        assert_eq!(metadata.generation_time, Some(0.8));
    }

    #[test]
    fn test_unknown_role_maps_to_assistant() {
        let ids = MessageIdGenerator::starting_at(1);
        let messages = HistoryReconciler::reconcile(&[record("bot", "hey", None)], &ids);
        assert_eq!(messages[0].role, MessageRole::Assistant);
    }

    #[test]
    fn test_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:30:00.000000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);

        let ids = MessageIdGenerator::starting_at(1);
        let messages =
            HistoryReconciler::reconcile(&[record("user", "hi", Some("2024-05-01T12:30:00"))], &ids);
        assert_eq!(messages[0].timestamp, expected);
    }

    #[test]
    fn test_empty_history() {
        let ids = MessageIdGenerator::starting_at(1);
        assert!(HistoryReconciler::reconcile(&[], &ids).is_empty());
    }
}

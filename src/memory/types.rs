use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::vector_store::CollectionEntry;

/// One stored conversational exchange, validated at construction.
///
/// Records only exist in fully-formed states: a missing question, response,
/// or timestamp in the underlying entry is a hard error, never a
/// default-filled record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Deterministic key derived from the normalized exchange.
    pub id: String,
    pub question: String,
    pub response: String,
    /// Importance is sticky: once true it never reverts.
    pub important: bool,
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    /// Rebuild a record from a stored collection entry.
    pub fn from_entry(entry: &CollectionEntry) -> Result<Self, AppError> {
        let question = entry
            .meta_str("question")
            .ok_or_else(|| missing("question"))?
            .to_string();
        let response = entry
            .meta_str("response")
            .ok_or_else(|| missing("response"))?
            .to_string();
        let raw_timestamp = entry.meta_str("timestamp").ok_or_else(|| missing("timestamp"))?;
        let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| AppError::InvalidRecord {
            field: "timestamp".to_string(),
            reason: format!("unparseable timestamp '{raw_timestamp}'"),
        })?;

        Ok(Self {
            id: entry.id.clone(),
            question,
            response,
            important: entry.meta_bool("important"),
            timestamp,
        })
    }

    /// Age of this record relative to `now`, in fractional days. Clock skew
    /// can make stored timestamps sit slightly in the future; clamp to zero.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.timestamp).num_seconds();
        (seconds.max(0) as f64) / 86_400.0
    }
}

/// A record paired with its retrieval score.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub score: f64,
}

fn missing(field: &str) -> AppError {
    AppError::InvalidRecord {
        field: field.to_string(),
        reason: "missing from stored metadata".to_string(),
    }
}

/// RFC 3339 first, then naive `YYYY-MM-DDTHH:MM:SS[.ffff]` assumed UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::Metadata;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry_with(question: &str, response: &str, timestamp: &str) -> CollectionEntry {
        let mut metadata = Metadata::new();
        metadata.insert("question".to_string(), json!(question));
        metadata.insert("response".to_string(), json!(response));
        metadata.insert("timestamp".to_string(), json!(timestamp));
        metadata.insert("important".to_string(), json!(true));
        CollectionEntry::new(format!("User: {question}\nAI: {response}"), metadata)
    }

    #[test]
    fn test_from_entry_roundtrip() {
        let entry = entry_with("What is Rust?", "A language.", "2026-01-15T10:30:00+00:00");
        let record = MemoryRecord::from_entry(&entry).expect("valid record");
        assert_eq!(record.question, "What is Rust?");
        assert_eq!(record.response, "A language.");
        assert!(record.important);
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_from_entry_naive_timestamp_assumed_utc() {
        let entry = entry_with("q", "r", "2026-01-15T10:30:00.123456");
        let record = MemoryRecord::from_entry(&entry).expect("valid record");
        assert_eq!(record.timestamp.date_naive().to_string(), "2026-01-15");
    }

    #[test]
    fn test_from_entry_rejects_missing_field() {
        let mut metadata = Metadata::new();
        metadata.insert("question".to_string(), json!("q"));
        let entry = CollectionEntry::new("doc".to_string(), metadata);
        let err = MemoryRecord::from_entry(&entry).expect_err("missing response");
        assert!(matches!(err, AppError::InvalidRecord { .. }));
    }

    #[test]
    fn test_from_entry_rejects_bad_timestamp() {
        let entry = entry_with("q", "r", "yesterday");
        assert!(MemoryRecord::from_entry(&entry).is_err());
    }

    #[test]
    fn test_age_days_clamps_future_timestamps() {
        let now = Utc::now();
        let record = MemoryRecord {
            id: "k".to_string(),
            question: "q".to_string(),
            response: "r".to_string(),
            important: false,
            timestamp: now + chrono::Duration::hours(2),
        };
        assert_eq!(record.age_days(now), 0.0);
    }

    #[test]
    fn test_age_days_three_days() {
        let now = Utc::now();
        let record = MemoryRecord {
            id: "k".to_string(),
            question: "q".to_string(),
            response: "r".to_string(),
            important: false,
            timestamp: now - chrono::Duration::days(3),
        };
        assert!((record.age_days(now) - 3.0).abs() < 0.01);
    }
}

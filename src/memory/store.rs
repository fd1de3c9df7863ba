//! Memory persistence
//!
//! Writes go through a single `MemoryStore` so the check-then-write on the
//! deduplication key is serialized. Everything else (retrieval, sweeping) is
//! read-mostly and talks to the collection directly.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::{AppError, Result};
use crate::memory::normalize::{memory_key, normalize_text};
use crate::memory::types::MemoryRecord;
use crate::vector_store::{CollectionEntry, Metadata, VectorCollection};

/// What `save` did with the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new record was written.
    Stored,
    /// The exchange existed unimportant and was re-marked important.
    Upgraded,
    /// The exchange already existed; nothing changed.
    Duplicate,
}

pub struct MemoryStore {
    collection: Arc<dyn VectorCollection>,
    /// Questions are truncated to this many characters before keying.
    max_query_length: usize,
    /// Serializes the lookup-then-insert in `save`.
    write_guard: Mutex<()>,
}

impl MemoryStore {
    pub fn new(collection: Arc<dyn VectorCollection>, max_query_length: usize) -> Self {
        Self {
            collection,
            max_query_length,
            write_guard: Mutex::new(()),
        }
    }

    /// Persist one exchange in normalized form. Identity is the normalized
    /// memory key, so formatting variants of an already-saved exchange are
    /// duplicates. Importance only ever moves false -> true; saving an
    /// important duplicate of an unimportant record upgrades it in place,
    /// keeping the original timestamp.
    pub fn save(&self, question: &str, response: &str, important: bool) -> Result<SaveOutcome> {
        let truncated: String = question.chars().take(self.max_query_length).collect();
        let question = normalize_text(&truncated);
        let response = normalize_text(response);
        if question.is_empty() || response.is_empty() {
            return Err(AppError::InvalidRecord {
                field: if question.is_empty() { "question" } else { "response" }.to_string(),
                reason: "empty exchange is not storable".to_string(),
            });
        }
        let (question, response) = (question.as_str(), response.as_str());

        let _guard = self.write_guard.lock();
        let key = memory_key(question, response);

        match self.find(&key)? {
            Some(existing) if existing.important || !important => {
                debug!("Memory {} already stored. Skipping.", key);
                Ok(SaveOutcome::Duplicate)
            }
            Some(existing) => {
                // Re-add under the same id with the original timestamp so
                // the upgrade does not look like a fresh exchange.
                let entry = build_entry(
                    &key,
                    &existing.question,
                    &existing.response,
                    true,
                    &existing.timestamp.to_rfc3339(),
                );
                self.collection.add(vec![entry])?;
                info!("Memory {} upgraded to important.", key);
                Ok(SaveOutcome::Upgraded)
            }
            None => {
                let entry = build_entry(&key, question, response, important, &Utc::now().to_rfc3339());
                self.collection.add(vec![entry])?;
                info!("Stored memory {} (important: {}).", key, important);
                Ok(SaveOutcome::Stored)
            }
        }
    }

    /// Look up one record by its memory key.
    pub fn find(&self, key: &str) -> Result<Option<MemoryRecord>> {
        let entry = self.collection.get_all()?.into_iter().find(|e| e.id == key);
        match entry {
            Some(entry) => Ok(Some(MemoryRecord::from_entry(&entry)?)),
            None => Ok(None),
        }
    }

    /// Every valid record, newest first. Malformed stored entries are
    /// logged and skipped rather than failing the whole listing.
    pub fn fetch_all(&self) -> Result<Vec<MemoryRecord>> {
        let mut records: Vec<MemoryRecord> = self
            .collection
            .get_all()?
            .iter()
            .filter_map(|entry| match MemoryRecord::from_entry(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed memory entry {}: {}", entry.id, e);
                    None
                }
            })
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Delete records by memory key. Absent keys are a no-op.
    pub fn delete(&self, keys: &[String]) -> Result<()> {
        self.collection.delete(keys)?;
        Ok(())
    }
}

fn build_entry(
    key: &str,
    question: &str,
    response: &str,
    important: bool,
    timestamp: &str,
) -> CollectionEntry {
    let mut metadata = Metadata::new();
    metadata.insert("question".to_string(), json!(question));
    metadata.insert("response".to_string(), json!(response));
    metadata.insert("important".to_string(), json!(important));
    metadata.insert("timestamp".to_string(), json!(timestamp));
    CollectionEntry::with_id(key, format!("User: {question}\nAI: {response}"), metadata)
}

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::Result;
use crate::memory::types::MemoryRecord;
use crate::vector_store::VectorCollection;

/// Expires unimportant memories older than the retention window.
///
/// Important records are exempt for as long as they stay important, which
/// is forever. Entries whose metadata cannot be parsed are left alone: a
/// sweeper should never destroy data it cannot positively age.
pub struct RetentionSweeper {
    collection: Arc<dyn VectorCollection>,
    retention_days: i64,
}

impl RetentionSweeper {
    pub fn new(collection: Arc<dyn VectorCollection>, retention_days: i64) -> Self {
        Self {
            collection,
            retention_days,
        }
    }

    /// Run one sweep. Returns how many records were expired.
    pub fn sweep(&self) -> Result<usize> {
        let now = Utc::now();
        let cutoff = self.retention_days as f64;

        let expired: Vec<String> = self
            .collection
            .get_all()?
            .iter()
            .filter_map(|entry| match MemoryRecord::from_entry(entry) {
                Ok(record) if !record.important && record.age_days(now) > cutoff => {
                    Some(record.id)
                }
                Ok(_) => None,
                Err(e) => {
                    warn!("Sweep skipping unparseable memory entry {}: {}", entry.id, e);
                    None
                }
            })
            .collect();

        if expired.is_empty() {
            info!("Memory sweep found nothing to expire.");
            return Ok(0);
        }

        self.collection.delete(&expired)?;
        info!(
            "Memory sweep expired {} records older than {} days.",
            expired.len(),
            self.retention_days
        );
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::normalize::memory_key;
    use crate::vector_store::{CollectionEntry, EmbeddedStore, Metadata, CHAT_MEMORY};
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    fn seed(
        collection: &dyn VectorCollection,
        question: &str,
        important: bool,
        age_days: i64,
    ) -> String {
        let key = memory_key(question, "answer");
        let timestamp = (Utc::now() - Duration::days(age_days)).to_rfc3339();
        let mut metadata = Metadata::new();
        metadata.insert("question".to_string(), json!(question));
        metadata.insert("response".to_string(), json!("answer"));
        metadata.insert("important".to_string(), json!(important));
        metadata.insert("timestamp".to_string(), json!(timestamp));
        collection
            .add(vec![CollectionEntry::with_id(
                key.clone(),
                format!("User: {question}\nAI: answer"),
                metadata,
            )])
            .expect("seed");
        key
    }

    fn collection() -> (TempDir, Arc<dyn VectorCollection>) {
        let dir = TempDir::new().expect("temp dir");
        let db = EmbeddedStore::open(dir.path()).expect("open store");
        let collection: Arc<dyn VectorCollection> = Arc::new(db.collection(CHAT_MEMORY));
        (dir, collection)
    }

    #[test]
    fn test_sweep_expires_only_old_unimportant() {
        let (_dir, collection) = collection();
        let old_unimportant = seed(collection.as_ref(), "old trivia", false, 4);
        let old_important = seed(collection.as_ref(), "old fact", true, 400);
        let fresh = seed(collection.as_ref(), "fresh note", false, 1);

        let sweeper = RetentionSweeper::new(Arc::clone(&collection), 3);
        assert_eq!(sweeper.sweep().expect("sweep"), 1);

        let remaining: Vec<String> = collection
            .get_all()
            .expect("get_all")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert!(!remaining.contains(&old_unimportant));
        assert!(remaining.contains(&old_important));
        assert!(remaining.contains(&fresh));
    }

    #[test]
    fn test_sweep_record_within_window_survives() {
        let (_dir, collection) = collection();
        seed(collection.as_ref(), "recent note", false, 2);

        let sweeper = RetentionSweeper::new(Arc::clone(&collection), 3);
        assert_eq!(sweeper.sweep().expect("sweep"), 0);
    }

    #[test]
    fn test_sweep_leaves_unparseable_entries_alone() {
        let (_dir, collection) = collection();
        let mut metadata = Metadata::new();
        metadata.insert("question".to_string(), json!("q"));
        metadata.insert("response".to_string(), json!("r"));
        metadata.insert("timestamp".to_string(), json!("not-a-timestamp"));
        collection
            .add(vec![CollectionEntry::with_id("broken", "doc", metadata)])
            .expect("seed");

        let sweeper = RetentionSweeper::new(Arc::clone(&collection), 3);
        assert_eq!(sweeper.sweep().expect("sweep"), 0);
        assert_eq!(collection.get_all().expect("get_all").len(), 1);
    }

    #[test]
    fn test_sweep_on_empty_collection() {
        let (_dir, collection) = collection();
        let sweeper = RetentionSweeper::new(collection, 3);
        assert_eq!(sweeper.sweep().expect("sweep"), 0);
    }
}

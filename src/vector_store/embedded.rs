//! Embedded store backend
//!
//! A rocksdb-backed implementation of [`VectorCollection`] used as the
//! default collaborator when no external engine is wired in. Entries are
//! bincode-encoded under `collection:id` keys; `query` ranks by token
//! frequency cosine overlap. Retrieval quality is explicitly out of scope
//! for this crate, so a lexical score is all the default backend provides.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rocksdb::{IteratorMode, WriteBatch, DB};
use serde::{Deserialize, Serialize};

use super::{CollectionEntry, Metadata, ScoredEntry, VectorCollection};

/// Iterator adapter that drops per-item rocksdb errors after logging them,
/// so one corrupt entry cannot abort a full-collection scan.
trait LogErrors<T> {
    fn log_errors(self) -> impl Iterator<Item = T>;
}

impl<I, T, E> LogErrors<T> for I
where
    I: Iterator<Item = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    fn log_errors(self) -> impl Iterator<Item = T> {
        self.filter_map(|item| match item {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Skipping unreadable store entry: {}", e);
                None
            }
        })
    }
}

/// On-disk representation of an entry.
///
/// Metadata is stored as a JSON string: bincode cannot round-trip
/// `serde_json::Value` (it needs a self-describing format).
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    document: String,
    metadata_json: String,
}

impl StoredEntry {
    fn from_entry(entry: &CollectionEntry) -> Result<Self> {
        Ok(Self {
            id: entry.id.clone(),
            document: entry.document.clone(),
            metadata_json: serde_json::to_string(&entry.metadata)?,
        })
    }

    fn into_entry(self) -> Result<CollectionEntry> {
        let metadata: Metadata = serde_json::from_str(&self.metadata_json)
            .with_context(|| format!("corrupt metadata for entry '{}'", self.id))?;
        Ok(CollectionEntry {
            id: self.id,
            document: self.document,
            metadata,
        })
    }
}

/// One rocksdb database holding every collection, addressed by key prefix
pub struct EmbeddedStore {
    db: Arc<DB>,
}

impl EmbeddedStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let db = DB::open_default(path)
            .with_context(|| format!("failed to open embedded store at {path:?}"))?;
        tracing::info!("Embedded store ready at {:?}", path);
        Ok(Self { db: Arc::new(db) })
    }

    /// Handle to a named collection. Collections are created lazily on first
    /// write; opening one is free.
    pub fn collection(&self, name: &str) -> EmbeddedCollection {
        EmbeddedCollection {
            db: Arc::clone(&self.db),
            prefix: format!("{name}:"),
        }
    }
}

/// A named collection within an [`EmbeddedStore`]
pub struct EmbeddedCollection {
    db: Arc<DB>,
    prefix: String,
}

impl EmbeddedCollection {
    fn key_for(&self, id: &str) -> Vec<u8> {
        format!("{}{}", self.prefix, id).into_bytes()
    }
}

impl VectorCollection for EmbeddedCollection {
    fn add(&self, entries: Vec<CollectionEntry>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for entry in &entries {
            let stored = StoredEntry::from_entry(entry)?;
            let encoded = bincode::serialize(&stored).context("failed to encode entry")?;
            batch.put(self.key_for(&entry.id), encoded);
        }
        self.db.write(batch).context("failed to write batch")?;
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<CollectionEntry>> {
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(self.prefix.as_bytes(), rocksdb::Direction::Forward));

        for (key, value) in iter.log_errors() {
            if !key.starts_with(self.prefix.as_bytes()) {
                break;
            }
            match bincode::deserialize::<StoredEntry>(&value) {
                Ok(stored) => match stored.into_entry() {
                    Ok(entry) => entries.push(entry),
                    Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
                },
                Err(e) => tracing::warn!("Skipping undecodable entry: {}", e),
            }
        }
        Ok(entries)
    }

    fn query(&self, text: &str, top_k: usize, cutoff: f32) -> Result<Vec<ScoredEntry>> {
        let query_freqs = token_frequencies(text);
        if query_freqs.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredEntry> = self
            .get_all()?
            .into_iter()
            .filter_map(|entry| {
                let score = cosine_overlap(&query_freqs, &token_frequencies(&entry.document));
                (score >= cutoff).then_some(ScoredEntry { entry, score })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn delete(&self, ids: &[String]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for id in ids {
            batch.delete(self.key_for(id));
        }
        self.db.write(batch).context("failed to delete entries")?;
        Ok(())
    }
}

/// Lowercased word frequencies for lexical scoring
fn token_frequencies(text: &str) -> HashMap<String, f32> {
    let mut freqs = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *freqs.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    freqs
}

/// Cosine similarity between two sparse frequency vectors
fn cosine_overlap(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f32 = a
        .iter()
        .filter_map(|(token, fa)| b.get(token).map(|fb| fa * fb))
        .sum();
    let norm_a: f32 = a.values().map(|f| f * f).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|f| f * f).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

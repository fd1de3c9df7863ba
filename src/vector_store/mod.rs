//! Vector store collaborator interface
//!
//! The embedding and similarity-search engine is an external collaborator:
//! this module only fixes the seam the pipeline consumes. Components receive
//! an `Arc<dyn VectorCollection>` by injection so nothing in the crate
//! depends on a particular backing engine, and tests can swap in a
//! throwaway store.
//!
//! Metadata stays map-shaped at this boundary because it is the
//! collaborator's wire format; typed records (`DocumentChunk`,
//! `MemoryRecord`) are validated at construction on our side of the seam.

pub mod embedded;

use anyhow::Result;
use serde_json::{Map, Value};

pub use embedded::{EmbeddedCollection, EmbeddedStore};

/// Collection name for indexed document chunks
pub const DOC_INDEX: &str = "doc_index";

/// Collection name for conversational memory records
pub const CHAT_MEMORY: &str = "chat_memory";

/// Metadata map as exchanged with the store
pub type Metadata = Map<String, Value>;

/// One stored entry: a document string plus its metadata
#[derive(Debug, Clone)]
pub struct CollectionEntry {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
}

impl CollectionEntry {
    pub fn new(document: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document: document.into(),
            metadata,
        }
    }

    /// Build an entry under a caller-chosen id, for collections keyed by a
    /// deterministic identity rather than a random one.
    pub fn with_id(id: impl Into<String>, document: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata,
        }
    }

    /// Fetch a metadata field as a string, if present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Fetch a metadata field as a bool, defaulting to false.
    pub fn meta_bool(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A query candidate with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: CollectionEntry,
    pub score: f32,
}

/// The opaque store interface the pipeline consumes.
///
/// `add` upserts by entry id; it is the Content Deduplicator's job to
/// prevent duplicate adds of identical content, not the store's.
pub trait VectorCollection: Send + Sync {
    /// Insert or replace entries by id.
    fn add(&self, entries: Vec<CollectionEntry>) -> Result<()>;

    /// Enumerate every entry in the collection.
    fn get_all(&self) -> Result<Vec<CollectionEntry>>;

    /// Ranked candidates for a query text, best first. Entries scoring below
    /// `cutoff` are omitted.
    fn query(&self, text: &str, top_k: usize, cutoff: f32) -> Result<Vec<ScoredEntry>>;

    /// Delete entries by id. Deleting an absent id is a no-op.
    fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Remove every chunk of a document from the index by its source filename.
pub fn delete_document_by_filename(
    collection: &dyn VectorCollection,
    file_name: &str,
) -> Result<usize> {
    let ids: Vec<String> = collection
        .get_all()?
        .into_iter()
        .filter(|e| e.meta_str("file_name") == Some(file_name))
        .map(|e| e.id)
        .collect();

    let count = ids.len();
    if count > 0 {
        collection.delete(&ids)?;
        tracing::info!("Removed {} chunks of '{}' from the index", count, file_name);
    }
    Ok(count)
}

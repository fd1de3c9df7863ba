//! Document ingestion pipeline
//!
//! Turns files dropped into the inbox directory into deduplicated,
//! content-addressed chunks in the document index:
//!
//! 1. [`stability`] — has the file finished being written?
//! 2. [`loader`] — extract plain text by format (pdf/csv/json/jsonl/txt/md)
//! 3. [`chunker`] — split into overlapping, token-budgeted segments
//! 4. [`dedup`] — classify the file as new, duplicate, or skipped
//! 5. [`watcher`] — orchestrate the above and archive processed files
//!
//! The persisted chunk-hash set in the document index is the sole source of
//! truth for "already ingested"; no in-process state survives a restart, so
//! a crash between archiving and recording cannot re-admit a file.

pub mod chunker;
pub mod dedup;
pub mod loader;
pub mod stability;
pub mod watcher;

pub use chunker::{chunk_document, ChunkPolicy, DocumentChunk};
pub use dedup::{classify, compute_file_hash, Classification};
pub use loader::{load_document, ExtractedText, SourceKind};
pub use watcher::IngestWatcher;

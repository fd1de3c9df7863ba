//! ChatRAGi document ingestion and conversational memory
//!
//! Two cooperating services over one embedded vector store:
//!
//! - **Ingestion**: watches an inbox directory, extracts text from PDF, CSV,
//!   JSON, and plain-text files, chunks it on sentence boundaries with
//!   overlap, deduplicates by content hash, indexes the chunks, and archives
//!   the source file.
//! - **Memory**: persists question/answer exchanges keyed by their
//!   normalized content, retrieves them ranked by importance and recency,
//!   and expires stale unimportant ones.
//!
//! Both services receive their vector collection by injection through the
//! [`vector_store::VectorCollection`] trait.

pub mod config;
pub mod constants;
pub mod errors;
pub mod ingest;
pub mod memory;
pub mod vector_store;

pub use config::Config;
pub use errors::{AppError, Result};

//! Content-hash deduplication
//!
//! Decides whether a candidate file is new or already known to the index.
//! Membership is tested per chunk (MD5) against the persisted chunk-hash
//! set; the whole-file SHA-256 exists for audit logging. The policy is
//! whole-file rejection: one colliding chunk marks the entire file as
//! duplicate, because partially indexing a resubmitted file would leave its
//! provenance split across two ingestions.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::constants::FILE_HASH_BLOCK_SIZE;
use crate::errors::{AppError, Result};
use crate::ingest::chunker::DocumentChunk;
use crate::vector_store::VectorCollection;

/// Outcome of classifying a candidate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No chunk hash is present in the store; proceed to indexing.
    New,
    /// At least one chunk hash is already stored; archive without indexing.
    Duplicate,
    /// Neither new nor duplicate: the file could not be evaluated.
    /// It stays in the inbox, eligible for retry.
    Skipped(String),
}

/// Compute the whole-file SHA-256, streamed in fixed-size blocks so large
/// files never load into memory at once.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| AppError::IoFailure {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; FILE_HASH_BLOCK_SIZE];
    loop {
        let read = file.read(&mut buffer).map_err(|e| AppError::IoFailure {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Enumerate every chunk hash currently persisted in the document index.
pub fn stored_chunk_hashes(collection: &dyn VectorCollection) -> anyhow::Result<HashSet<String>> {
    Ok(collection
        .get_all()?
        .iter()
        .filter_map(|entry| entry.meta_str("hash").map(str::to_string))
        .collect())
}

/// Classify a chunked file against the stored chunk-hash set.
pub fn classify(chunks: &[DocumentChunk], existing: &HashSet<String>) -> Classification {
    if chunks.is_empty() {
        return Classification::Skipped("no chunks produced".to_string());
    }
    if chunks
        .iter()
        .any(|chunk| existing.contains(&chunk.chunk_hash))
    {
        Classification::Duplicate
    } else {
        Classification::New
    }
}

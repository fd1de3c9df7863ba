//! Ingestion watcher service
//!
//! Owns the whole per-file pipeline: discovery, stability, extraction,
//! chunking, deduplication, indexing, and archival. Discovery happens in two
//! phases: a startup scan over everything already sitting in the inbox, then
//! a live phase reacting to filesystem creation events. The filesystem
//! watcher is registered before the scan so files arriving mid-scan land in
//! the event channel and are drained afterwards; events are handled one at a
//! time in arrival order.
//!
//! Failure policy per file: I/O failures leave the file in the inbox for the
//! next scan; parse failures and empty extractions archive the file so bad
//! content is never retried forever; duplicates archive without indexing.
//! No failure on one file stops the loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::ingest::chunker::{chunk_document, ChunkPolicy, DocumentChunk};
use crate::ingest::dedup::{classify, compute_file_hash, stored_chunk_hashes, Classification};
use crate::ingest::loader::load_document;
use crate::ingest::stability::is_file_stable;
use crate::vector_store::{CollectionEntry, Metadata, VectorCollection};

/// Hidden and system files are never ingested.
fn is_valid_file(file_name: &str) -> bool {
    !file_name.starts_with('.')
}

/// Orchestrates ingestion for one inbox directory
pub struct IngestWatcher {
    config: Config,
    doc_index: Arc<dyn VectorCollection>,
}

impl IngestWatcher {
    pub fn new(config: Config, doc_index: Arc<dyn VectorCollection>) -> Self {
        Self { config, doc_index }
    }

    /// Run the watcher: register for events, sweep preexisting files, then
    /// drain events until the process shuts down.
    pub async fn run(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<PathBuf>(EVENT_CHANNEL_CAPACITY);

        let mut watcher: RecommendedWatcher = notify::recommended_watcher(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_)) {
                        for path in event.paths {
                            // A full channel drops the event; the file stays
                            // in the inbox until the next startup scan
                            let _ = tx.try_send(path);
                        }
                    }
                }
                Err(e) => warn!("Filesystem watch error: {}", e),
            },
        )
        .context("failed to create filesystem watcher")?;

        watcher
            .watch(&self.config.data_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {:?}", self.config.data_dir))?;

        self.process_existing_files().await;
        info!("Watching {:?} for new files...", self.config.data_dir);

        while let Some(path) = rx.recv().await {
            info!("New file detected: {:?}", path);
            self.handle_path(&path).await;
        }
        Ok(())
    }

    /// Startup sweep over every file already in the inbox.
    pub async fn process_existing_files(&self) {
        info!("Checking for unprocessed files in the inbox...");

        let entries = match std::fs::read_dir(&self.config.data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Cannot read inbox {:?}: {}", self.config.data_dir, e);
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        for path in paths {
            self.handle_path(&path).await;
        }

        match self.doc_index.get_all() {
            Ok(all) => info!("Document index now contains {} indexed chunks.", all.len()),
            Err(e) => warn!("Cannot count indexed chunks: {}", e),
        }
    }

    /// Run the per-file state machine:
    /// `discovered -> stable -> classified(new|duplicate) -> archived`.
    async fn handle_path(&self, path: &Path) {
        if !path.is_file() {
            return;
        }
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return,
        };
        if !is_valid_file(&file_name) {
            return;
        }

        let wait = Duration::from_secs(self.config.stability_wait_secs);
        if !is_file_stable(path, wait).await {
            warn!("Skipping file '{}' as it may still be copying.", file_name);
            return;
        }

        if let Err(e) = self.process_file(path, &file_name).await {
            warn!("Error processing file '{}': {}", file_name, e);
        }
    }

    /// Extract, chunk, classify, and index one stable file.
    async fn process_file(&self, path: &Path, file_name: &str) -> Result<()> {
        info!("Processing file: {}", file_name);

        let file_hash = match compute_file_hash(path) {
            Ok(hash) => hash,
            Err(e) => {
                // Skipped: neither new nor duplicate; stays in the inbox
                warn!("Hash computation failed for '{}': {}. Skipping.", file_name, e);
                return Ok(());
            }
        };

        let extracted = match load_document(path) {
            Ok(Some(extracted)) => extracted,
            Ok(None) => {
                // Unsupported, empty, or unparseable: archive so it is not
                // retried forever
                warn!("No valid content found in '{}'. Archiving.", file_name);
                self.move_to_archive(file_name)?;
                return Ok(());
            }
            Err(e) => {
                warn!("Read failure on '{}': {}. Leaving in place for retry.", file_name, e);
                return Ok(());
            }
        };

        let policy = if self.config.adaptive_chunking {
            ChunkPolicy::adaptive(&extracted.text)
        } else {
            ChunkPolicy::new(self.config.chunk_max_tokens, self.config.overlap_ratio)
        };
        let chunks = chunk_document(
            &extracted.text,
            file_name,
            extracted.kind,
            &file_hash,
            policy,
        );

        let existing = stored_chunk_hashes(self.doc_index.as_ref())
            .context("failed to enumerate stored chunk hashes")?;

        match classify(&chunks, &existing) {
            Classification::Duplicate => {
                warn!(
                    "Duplicate document detected: {} (file hash {}). Skipping indexing.",
                    file_name, file_hash
                );
                self.move_to_archive(file_name)?;
            }
            Classification::Skipped(reason) => {
                warn!("Skipping '{}': {}. Archiving.", file_name, reason);
                self.move_to_archive(file_name)?;
            }
            Classification::New => {
                let count = chunks.len();
                match self.doc_index.add(chunks.into_iter().map(to_entry).collect()) {
                    Ok(()) => {
                        info!(
                            "Successfully indexed {} chunks from '{}' (file hash {}).",
                            count, file_name, file_hash
                        );
                        self.move_to_archive(file_name)?;
                    }
                    Err(e) => {
                        // Not archived: the file stays eligible for retry
                        error!("Error indexing document '{}': {}", file_name, e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Move a processed file into the archive directory, resolving name
    /// collisions with an incrementing numeric suffix.
    fn move_to_archive(&self, file_name: &str) -> Result<()> {
        let src = self.config.data_dir.join(file_name);
        if !src.exists() {
            warn!("File '{}' not found in the inbox. Skipping archive.", file_name);
            return Ok(());
        }

        let dest = archive_destination(&self.config.archive_dir, file_name);
        move_file(&src, &dest)
            .with_context(|| format!("failed to archive '{file_name}' to {dest:?}"))?;
        info!("Moved file '{}' to archive.", file_name);
        Ok(())
    }
}

/// First free destination path: `name.ext`, then `name_1.ext`, `name_2.ext`, …
fn archive_destination(archive_dir: &Path, file_name: &str) -> PathBuf {
    let dest = archive_dir.join(file_name);
    if !dest.exists() {
        return dest;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (file_name.to_string(), String::new()),
    };

    let mut counter = 1;
    loop {
        let candidate = archive_dir.join(format!("{stem}_{counter}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Rename, falling back to copy+remove across filesystems.
fn move_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(src, dest)?;
            std::fs::remove_file(src)
        }
    }
}

fn to_entry(chunk: DocumentChunk) -> CollectionEntry {
    let mut metadata = Metadata::new();
    metadata.insert("file_name".to_string(), json!(chunk.file_name));
    metadata.insert("source".to_string(), json!(chunk.source.as_str()));
    metadata.insert("hash".to_string(), json!(chunk.chunk_hash));
    metadata.insert("file_hash".to_string(), json!(chunk.file_hash));
    CollectionEntry::new(chunk.text, metadata)
}

//! Documented constants for the ingestion and memory pipeline
//!
//! All tunable parameters live here with justification for their values.
//! Centralizing constants prevents magic numbers and makes tuning easier.
//! Runtime overrides go through `config::Config::from_env`.

// =============================================================================
// CHUNKING
// =============================================================================

/// Default maximum tokens per chunk
///
/// Matches the context window of the downstream model (phi4 supports 16K;
/// 8192 is a balanced default that leaves room for the prompt and output).
/// Tokens are estimated as whitespace-separated words; no sub-word
/// tokenization is performed.
pub const DEFAULT_CONTEXT_WINDOW: usize = 8192;

/// Default overlap between consecutive chunks, as a fraction of the budget
///
/// The overlap is measured in *sentences*: `floor(budget * ratio)` sentences
/// of a closed chunk are carried into the next one so that related content
/// near a boundary is never split without shared context.
pub const DEFAULT_OVERLAP_RATIO: f32 = 0.2;

/// Word-count thresholds for adaptive chunk sizing
///
/// Short documents get small chunks with heavy overlap (little content to
/// lose, context continuity matters most); long documents get large chunks
/// with light overlap (index size matters most).
pub const ADAPTIVE_WORD_THRESHOLDS: [usize; 3] = [500, 2000, 5000];

/// Chunk token budgets corresponding to the adaptive thresholds
pub const ADAPTIVE_CHUNK_SIZES: [usize; 4] = [256, 512, 1024, 1536];

/// Overlap ratios corresponding to the adaptive thresholds
pub const ADAPTIVE_OVERLAP_RATIOS: [f32; 4] = [0.5, 0.3, 0.2, 0.1];

// =============================================================================
// DEDUPLICATION
// =============================================================================

/// Block size for streamed whole-file hashing
///
/// 8 KiB bounds memory use while keeping syscall overhead low; whole-file
/// hashes are computed for audit logging, so throughput is not critical.
pub const FILE_HASH_BLOCK_SIZE: usize = 8192;

// =============================================================================
// INGESTION WATCHER
// =============================================================================

/// Default wait between the two size samples of the stability check (seconds)
///
/// Two seconds is long enough for typical copy tools to make progress on any
/// file still being written, and short enough not to stall the pipeline.
pub const DEFAULT_STABILITY_WAIT_SECS: u64 = 2;

/// Capacity of the filesystem-event channel
///
/// Events beyond this are dropped by the notify callback; dropped files are
/// picked up by the next startup scan, so a bounded channel is safe.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// MEMORY SCORING
// =============================================================================

/// Score weight for memories flagged important
pub const MEMORY_IMPORTANT_WEIGHT: f64 = 2.0;

/// Score weight for ordinary memories
pub const MEMORY_BASE_WEIGHT: f64 = 1.0;

/// Number of memories returned to the caller after re-scoring
pub const MEMORY_RESULTS: usize = 3;

// =============================================================================
// RETENTION & LIMITS
// =============================================================================

/// Default retention window for non-important memories (days)
///
/// Three days keeps conversational context across a working session without
/// letting the memory collection grow unboundedly. Important memories are
/// never swept.
pub const DEFAULT_TIME_DECAY_DAYS: i64 = 3;

/// Default maximum stored query length (characters)
///
/// Queries are truncated before keying so a pathological paste does not
/// bloat the store or produce a key no follow-up query can ever match.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1500;

// =============================================================================
// SIMILARITY RETRIEVAL
// =============================================================================

/// Default top-k for candidate retrieval from the vector store
pub const DEFAULT_SIMILARITY_TOP_K: usize = 5;

/// Default minimum similarity for a candidate to be considered
pub const DEFAULT_SIMILARITY_CUTOFF: f32 = 0.8;

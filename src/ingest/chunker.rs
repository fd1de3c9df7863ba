//! Sentence-aware overlapping chunker
//!
//! Splits extracted text into token-budgeted chunks for indexing. Sentences
//! are the unit of accumulation: a chunk never ends mid-sentence, and
//! consecutive chunks share a verbatim sentence-level overlap of
//! `floor(budget * overlap_ratio)` sentences so the retrieval layer never
//! loses context at a chunk boundary.
//!
//! Tokens are estimated as whitespace-separated words. No sub-word
//! tokenization is performed; the budget exists to bound chunk size, not to
//! match a tokenizer exactly.

use std::sync::LazyLock;

use md5::Md5;
use regex::Regex;
use sha2::Digest;

use crate::constants::{
    ADAPTIVE_CHUNK_SIZES, ADAPTIVE_OVERLAP_RATIOS, ADAPTIVE_WORD_THRESHOLDS,
};
use crate::ingest::loader::SourceKind;

/// A sentence ends at `.`, `!` or `?` followed by whitespace.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

/// One indexable segment of a document, paired with its provenance
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// Chunk text; never empty
    pub text: String,
    /// Source filename
    pub file_name: String,
    /// Source format
    pub source: SourceKind,
    /// MD5 of the chunk text, the membership key for deduplication
    pub chunk_hash: String,
    /// SHA-256 of the whole source file, for audit logging
    pub file_hash: String,
}

impl DocumentChunk {
    /// Build a chunk, computing its content hash. Empty text is rejected.
    fn new(
        text: String,
        file_name: &str,
        source: SourceKind,
        file_hash: &str,
    ) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let chunk_hash = hex::encode(Md5::digest(text.as_bytes()));
        Some(Self {
            text,
            file_name: file_name.to_string(),
            source,
            chunk_hash,
            file_hash: file_hash.to_string(),
        })
    }
}

/// Chunk budget and overlap for one document
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    /// Maximum tokens per chunk
    pub max_tokens: usize,
    /// Overlap fraction of the budget, carried as whole sentences
    pub overlap_ratio: f32,
}

impl ChunkPolicy {
    pub fn new(max_tokens: usize, overlap_ratio: f32) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
            overlap_ratio: overlap_ratio.clamp(0.0, 0.9),
        }
    }

    /// Pick a budget and overlap from the document's word count.
    ///
    /// Short documents chunk small with heavy overlap; long documents chunk
    /// large with light overlap.
    pub fn adaptive(text: &str) -> Self {
        let words = estimate_tokens(text);
        let tier = ADAPTIVE_WORD_THRESHOLDS
            .iter()
            .position(|&threshold| words < threshold)
            .unwrap_or(ADAPTIVE_WORD_THRESHOLDS.len());
        Self::new(ADAPTIVE_CHUNK_SIZES[tier], ADAPTIVE_OVERLAP_RATIOS[tier])
    }

    /// Sentences carried from a closed chunk into the next one
    fn overlap_sentences(&self) -> usize {
        (self.max_tokens as f32 * self.overlap_ratio) as usize
    }
}

/// Estimate token count as whitespace-separated words.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentences on `[.!?]` followed by whitespace.
///
/// The terminating punctuation stays with its sentence; trailing text
/// without a terminator forms the final sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // The punctuation char is ASCII, so +1 lands on a char boundary
        let end = boundary.start() + 1;
        let sentence = text[last..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        last = boundary.end();
    }

    if last < text.len() {
        let tail = text[last..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }
    sentences
}

/// Split text into overlapping chunks under the policy's token budget.
///
/// Sentences accumulate greedily; on overflow the chunk closes and the next
/// one is seeded with the last `overlap_sentences` sentences of the closed
/// chunk (the whole chunk when it has fewer). A sentence larger than the
/// budget becomes its own chunk rather than being dropped.
pub fn split_into_chunks(text: &str, policy: ChunkPolicy) -> Vec<String> {
    let sentences = split_sentences(text);
    let overlap = policy.overlap_sentences();

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in sentences {
        let sentence_tokens = estimate_tokens(sentence);

        if current.is_empty() || current_tokens + sentence_tokens <= policy.max_tokens {
            current.push(sentence);
            current_tokens += sentence_tokens;
        } else {
            chunks.push(current.join(" "));

            let carry = overlap.min(current.len());
            current = current.split_off(current.len() - carry);
            current.push(sentence);
            current_tokens = current.iter().map(|s| estimate_tokens(s)).sum();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Chunk a document and pair every chunk with its provenance metadata.
pub fn chunk_document(
    text: &str,
    file_name: &str,
    source: SourceKind,
    file_hash: &str,
    policy: ChunkPolicy,
) -> Vec<DocumentChunk> {
    split_into_chunks(text, policy)
        .into_iter()
        .filter_map(|chunk| DocumentChunk::new(chunk, file_name, source, file_hash))
        .collect()
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Config;
use crate::constants::{MEMORY_BASE_WEIGHT, MEMORY_IMPORTANT_WEIGHT, MEMORY_RESULTS};
use crate::memory::types::{MemoryRecord, ScoredMemory};
use crate::vector_store::VectorCollection;

/// Re-ranks similarity candidates by importance and recency.
///
/// Retrieval is best-effort context for a response already being generated:
/// any failure degrades to an empty result instead of propagating.
pub struct MemoryRanker {
    collection: Arc<dyn VectorCollection>,
    max_query_length: usize,
    /// Candidates fetched from the store per query.
    candidate_top_k: usize,
    /// Minimum similarity a candidate needs to enter re-ranking.
    similarity_cutoff: f32,
}

impl MemoryRanker {
    pub fn new(
        collection: Arc<dyn VectorCollection>,
        max_query_length: usize,
        candidate_top_k: usize,
        similarity_cutoff: f32,
    ) -> Self {
        Self {
            collection,
            max_query_length,
            candidate_top_k: candidate_top_k.max(1),
            similarity_cutoff,
        }
    }

    /// A ranker tuned by the configuration's similarity knobs.
    pub fn from_config(collection: Arc<dyn VectorCollection>, config: &Config) -> Self {
        Self::new(
            collection,
            config.max_query_length,
            config.similarity_top_k,
            config.similarity_cutoff,
        )
    }

    /// The most relevant stored exchanges for `query`, best first.
    pub fn retrieve(&self, query: &str) -> Vec<ScoredMemory> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let query: String = query.chars().take(self.max_query_length).collect();

        let candidates =
            match self
                .collection
                .query(&query, self.candidate_top_k, self.similarity_cutoff)
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("Memory retrieval failed: {}. Continuing without memories.", e);
                    return Vec::new();
                }
            };

        let now = Utc::now();
        let mut scored: Vec<ScoredMemory> = candidates
            .iter()
            .filter_map(|candidate| match MemoryRecord::from_entry(&candidate.entry) {
                Ok(record) => Some(ScoredMemory {
                    score: score(&record, now),
                    record,
                }),
                Err(e) => {
                    warn!("Skipping malformed memory candidate {}: {}", candidate.entry.id, e);
                    None
                }
            })
            .collect();

        // Stable sort: equal scores keep similarity order from the store.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(MEMORY_RESULTS);
        scored
    }
}

/// Importance weight plus a recency bonus decaying with age in whole days:
/// `weight + 1 / (1 + age_days)`. A same-day important record scores 3.0,
/// an old unimportant one approaches 1.0.
fn score(record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    let weight = if record.important {
        MEMORY_IMPORTANT_WEIGHT
    } else {
        MEMORY_BASE_WEIGHT
    };
    weight + 1.0 / (1.0 + record.age_days(now).floor())
}

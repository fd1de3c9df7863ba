//! Conversational memory
//!
//! Persists question/answer exchanges in the `chat_memory` collection and
//! retrieves the most relevant ones for a new query. Storage is normalized
//! and deduplicated by a deterministic key; retrieval re-ranks vector
//! candidates with an importance and recency score; a retention sweeper
//! expires unimportant exchanges after a configurable number of days.

pub mod normalize;
pub mod ranker;
pub mod store;
pub mod sweeper;
pub mod types;

pub use normalize::{memory_key, normalize_text, strip_sources};
pub use ranker::MemoryRanker;
pub use store::{MemoryStore, SaveOutcome};
pub use sweeper::RetentionSweeper;
pub use types::{MemoryRecord, ScoredMemory};

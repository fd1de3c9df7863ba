//! Configuration for the ingestion and memory pipeline
//!
//! All configurable parameters in one place with environment variable
//! overrides. Follows the principle: sensible defaults, configurable in
//! production. Bad values are logged and replaced with defaults rather than
//! aborting startup.

use std::env;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::constants::{
    DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_QUERY_LENGTH, DEFAULT_OVERLAP_RATIO,
    DEFAULT_SIMILARITY_CUTOFF, DEFAULT_SIMILARITY_TOP_K, DEFAULT_STABILITY_WAIT_SECS,
    DEFAULT_TIME_DECAY_DAYS,
};

/// Pipeline configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct Config {
    /// Watched inbox directory for new documents (default: ./data)
    pub data_dir: PathBuf,

    /// Archive directory for processed and duplicate files (default: ./archive)
    pub archive_dir: PathBuf,

    /// On-disk state for the embedded vector store (default: ./chroma_db)
    pub db_path: PathBuf,

    /// Maximum tokens per chunk; tokens are estimated as words (default: 8192)
    pub chunk_max_tokens: usize,

    /// Overlap between consecutive chunks as a fraction of the budget
    /// (default: 0.2)
    pub overlap_ratio: f32,

    /// Whether chunk budget and overlap adapt to document length
    /// (default: true)
    pub adaptive_chunking: bool,

    /// Top-k matching entries fetched per similarity query (default: 5)
    pub similarity_top_k: usize,

    /// Minimum similarity threshold for query candidates (default: 0.8)
    pub similarity_cutoff: f32,

    /// Retention window for non-important memories, in days (default: 3)
    pub retention_days: i64,

    /// Maximum stored query length in characters (default: 1500)
    pub max_query_length: usize,

    /// Wait between the two size samples of the stability check, in seconds
    /// (default: 2)
    pub stability_wait_secs: u64,

    /// Re-run the retention sweeper on this interval, in seconds;
    /// 0 means sweep at startup only (default: 0)
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            archive_dir: PathBuf::from("./archive"),
            db_path: PathBuf::from("./chroma_db"),
            chunk_max_tokens: DEFAULT_CONTEXT_WINDOW,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            adaptive_chunking: true,
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
            similarity_cutoff: DEFAULT_SIMILARITY_CUTOFF,
            retention_days: DEFAULT_TIME_DECAY_DAYS,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            stability_wait_secs: DEFAULT_STABILITY_WAIT_SECS,
            sweep_interval_secs: 0,
        }
    }
}

/// Parse an env var, falling back to the current value on a bad parse.
fn parse_env<T: std::str::FromStr>(name: &str, current: T) -> T {
    match env::var(name) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring unparseable {name}='{val}', keeping default");
                current
            }
        },
        Err(_) => current,
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("CHATRAGI_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CHATRAGI_ARCHIVE_DIR") {
            config.archive_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CHATRAGI_DB_PATH") {
            config.db_path = PathBuf::from(val);
        }

        config.chunk_max_tokens =
            parse_env("CHATRAGI_CONTEXT_WINDOW", config.chunk_max_tokens).max(1);
        config.overlap_ratio =
            parse_env("CHATRAGI_OVERLAP_RATIO", config.overlap_ratio).clamp(0.0, 0.9);

        if let Ok(val) = env::var("CHATRAGI_ADAPTIVE_CHUNKING") {
            config.adaptive_chunking = val.to_lowercase() == "true" || val == "1";
        }

        config.similarity_top_k =
            parse_env("CHATRAGI_SIMILARITY_TOP_K", config.similarity_top_k).max(1);
        config.similarity_cutoff =
            parse_env("CHATRAGI_SIMILARITY_CUTOFF", config.similarity_cutoff).clamp(0.0, 1.0);
        config.retention_days = parse_env("CHATRAGI_TIME_DECAY_DAYS", config.retention_days).max(0);
        config.max_query_length =
            parse_env("CHATRAGI_MAX_QUERY_LENGTH", config.max_query_length).max(1);
        config.stability_wait_secs =
            parse_env("CHATRAGI_STABILITY_WAIT_SECS", config.stability_wait_secs);
        config.sweep_interval_secs =
            parse_env("CHATRAGI_SWEEP_INTERVAL_SECS", config.sweep_interval_secs);

        config
    }

    /// Create the inbox, archive, and store directories if absent.
    ///
    /// A creation failure is logged but does not abort the others; the
    /// component that actually needs the directory will surface the error.
    pub fn ensure_dirs(&self) {
        for dir in [&self.data_dir, &self.archive_dir, &self.db_path] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                error!("Failed to create directory {:?}: {}", dir, e);
            }
        }
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!("   Inbox: {:?}", self.data_dir);
        info!("   Archive: {:?}", self.archive_dir);
        info!("   Store: {:?}", self.db_path);
        info!(
            "   Chunking: {} tokens, {:.0}% overlap{}",
            self.chunk_max_tokens,
            self.overlap_ratio * 100.0,
            if self.adaptive_chunking {
                " (adaptive)"
            } else {
                ""
            }
        );
        info!(
            "   Similarity: top-{} at cutoff {:.2}",
            self.similarity_top_k, self.similarity_cutoff
        );
        info!("   Memory retention: {} days", self.retention_days);
        info!("   Max stored query length: {}", self.max_query_length);
        info!("   Stability wait: {}s", self.stability_wait_secs);
        if self.sweep_interval_secs > 0 {
            info!("   Sweep interval: {}s", self.sweep_interval_secs);
        } else {
            info!("   Sweep: at startup only");
        }
    }
}

/// Environment variable documentation
#[allow(unused)] // Public API - available for CLI help output
pub fn print_env_help() {
    println!("ChatRagi Configuration Environment Variables:");
    println!();
    println!("  CHATRAGI_DATA_DIR             - Watched inbox directory (default: ./data)");
    println!("  CHATRAGI_ARCHIVE_DIR          - Archive directory (default: ./archive)");
    println!("  CHATRAGI_DB_PATH              - Vector store directory (default: ./chroma_db)");
    println!("  CHATRAGI_CONTEXT_WINDOW       - Max tokens per chunk (default: 8192)");
    println!("  CHATRAGI_OVERLAP_RATIO        - Chunk overlap fraction (default: 0.2)");
    println!("  CHATRAGI_ADAPTIVE_CHUNKING    - Adapt chunk size to document length (default: true)");
    println!("  CHATRAGI_SIMILARITY_TOP_K     - Top-K matching chunks (default: 5)");
    println!("  CHATRAGI_SIMILARITY_CUTOFF    - Minimum similarity threshold (default: 0.8)");
    println!("  CHATRAGI_TIME_DECAY_DAYS      - Memory retention window in days (default: 3)");
    println!("  CHATRAGI_MAX_QUERY_LENGTH     - Max stored query length (default: 1500)");
    println!("  CHATRAGI_STABILITY_WAIT_SECS  - File stability check wait (default: 2)");
    println!("  CHATRAGI_SWEEP_INTERVAL_SECS  - Periodic sweep interval, 0 = startup only");
    println!();
    println!("  RUST_LOG                      - Log level (e.g., info, debug, trace)");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_max_tokens, 8192);
        assert_eq!(config.retention_days, 3);
        assert_eq!(config.similarity_top_k, 5);
        assert!(config.adaptive_chunking);
    }

    #[test]
    fn test_env_override() {
        env::set_var("CHATRAGI_TIME_DECAY_DAYS", "7");
        env::set_var("CHATRAGI_SIMILARITY_TOP_K", "10");

        let config = Config::from_env();
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.similarity_top_k, 10);

        env::remove_var("CHATRAGI_TIME_DECAY_DAYS");
        env::remove_var("CHATRAGI_SIMILARITY_TOP_K");
    }

    #[test]
    fn test_bad_value_falls_back_to_default() {
        env::set_var("CHATRAGI_OVERLAP_RATIO", "lots");
        let config = Config::from_env();
        assert!((config.overlap_ratio - DEFAULT_OVERLAP_RATIO).abs() < f32::EPSILON);
        env::remove_var("CHATRAGI_OVERLAP_RATIO");
    }
}

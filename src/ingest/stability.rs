//! File stability detection
//!
//! A file that just appeared in the inbox may still be mid-copy. The check
//! samples the size twice with a fixed wait in between: matching sizes (and
//! a file that still exists) count as stable. This is a heuristic, not a
//! guarantee, but it catches the common copy-in-progress case.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

/// Returns true iff the file's size is unchanged after `wait` and the file
/// still exists. Any I/O error (e.g. the file vanished between samples) is
/// logged and reported as not stable, never raised.
pub async fn is_file_stable(path: &Path, wait: Duration) -> bool {
    let initial_size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("Error checking file stability for {:?}: {}", path, e);
            return false;
        }
    };

    tokio::time::sleep(wait).await;

    match std::fs::metadata(path) {
        Ok(meta) => meta.len() == initial_size,
        Err(e) => {
            warn!("Error checking file stability for {:?}: {}", path, e);
            false
        }
    }
}

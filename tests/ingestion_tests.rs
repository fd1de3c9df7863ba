//! End-to-end ingestion pipeline tests: inbox scan through indexing and
//! archival, against a real on-disk store.

use std::sync::Arc;

use tempfile::TempDir;

use chatragi::config::Config;
use chatragi::ingest::IngestWatcher;
use chatragi::vector_store::{
    delete_document_by_filename, CollectionEntry, EmbeddedStore, VectorCollection, DOC_INDEX,
};

struct Pipeline {
    _root: TempDir,
    config: Config,
    doc_index: Arc<dyn VectorCollection>,
}

impl Pipeline {
    fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let config = Config {
            data_dir: root.path().join("data"),
            archive_dir: root.path().join("archive"),
            db_path: root.path().join("db"),
            stability_wait_secs: 0,
            ..Config::default()
        };
        std::fs::create_dir_all(&config.data_dir).expect("data dir");
        std::fs::create_dir_all(&config.archive_dir).expect("archive dir");

        let store = EmbeddedStore::open(&config.db_path).expect("open store");
        let doc_index: Arc<dyn VectorCollection> = Arc::new(store.collection(DOC_INDEX));

        Self {
            _root: root,
            config,
            doc_index,
        }
    }

    fn drop_file(&self, name: &str, content: &str) {
        std::fs::write(self.config.data_dir.join(name), content).expect("write inbox file");
    }

    async fn scan(&self) {
        let watcher = IngestWatcher::new(self.config.clone(), Arc::clone(&self.doc_index));
        watcher.process_existing_files().await;
    }

    fn indexed(&self) -> Vec<CollectionEntry> {
        self.doc_index.get_all().expect("get_all")
    }

    fn inbox_names(&self) -> Vec<String> {
        dir_names(&self.config.data_dir)
    }

    fn archive_names(&self) -> Vec<String> {
        dir_names(&self.config.archive_dir)
    }
}

fn dir_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const NOTES: &str = "Rust guarantees memory safety without garbage collection. \
    The borrow checker enforces ownership rules at compile time. \
    Fearless concurrency follows from the same rules. \
    Zero-cost abstractions keep the generated code fast.";

#[tokio::test]
async fn test_text_file_indexed_and_archived() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("notes.txt", NOTES);

    pipeline.scan().await;

    assert!(pipeline.inbox_names().is_empty(), "inbox should be drained");
    assert_eq!(pipeline.archive_names(), vec!["notes.txt"]);

    let entries = pipeline.indexed();
    assert!(!entries.is_empty());
    for entry in &entries {
        assert_eq!(entry.meta_str("file_name"), Some("notes.txt"));
        assert_eq!(entry.meta_str("source"), Some("text"));
        assert!(entry.meta_str("hash").is_some());
        assert!(entry.meta_str("file_hash").is_some());
        assert!(!entry.document.trim().is_empty());
    }
}

#[tokio::test]
async fn test_duplicate_content_archived_without_reindexing() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("notes.txt", NOTES);
    pipeline.scan().await;
    let count_after_first = pipeline.indexed().len();

    // Same content under a different name
    pipeline.drop_file("copy.txt", NOTES);
    pipeline.scan().await;

    assert_eq!(pipeline.indexed().len(), count_after_first);
    assert_eq!(pipeline.archive_names(), vec!["copy.txt", "notes.txt"]);
}

#[tokio::test]
async fn test_reingesting_same_name_archives_with_suffix() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("notes.txt", NOTES);
    pipeline.scan().await;
    let count_after_first = pipeline.indexed().len();

    // A fresh watcher over the same persisted index: restart scenario
    pipeline.drop_file("notes.txt", NOTES);
    pipeline.scan().await;

    assert_eq!(pipeline.indexed().len(), count_after_first);
    assert_eq!(pipeline.archive_names(), vec!["notes.txt", "notes_1.txt"]);
}

#[tokio::test]
async fn test_updated_file_under_same_name_is_ingested() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("notes.txt", NOTES);
    pipeline.scan().await;
    let count_after_first = pipeline.indexed().len();

    // Same name, new content: must be indexed, not skipped
    pipeline.drop_file(
        "notes.txt",
        "A revised draft with entirely new material. Trait objects enable dynamic dispatch.",
    );
    pipeline.scan().await;

    let entries = pipeline.indexed();
    assert!(entries.len() > count_after_first, "revised content was not indexed");
    assert!(entries
        .iter()
        .any(|e| e.document.contains("dynamic dispatch")));
    assert!(pipeline.inbox_names().is_empty(), "inbox should be drained");
    assert_eq!(pipeline.archive_names(), vec!["notes.txt", "notes_1.txt"]);
}

#[tokio::test]
async fn test_empty_file_archived_not_indexed() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("empty.txt", "   \n  ");

    pipeline.scan().await;

    assert!(pipeline.indexed().is_empty());
    assert_eq!(pipeline.archive_names(), vec!["empty.txt"]);
}

#[tokio::test]
async fn test_unsupported_extension_archived_not_indexed() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("image.png", "binary-ish");

    pipeline.scan().await;

    assert!(pipeline.indexed().is_empty());
    assert_eq!(pipeline.archive_names(), vec!["image.png"]);
}

#[tokio::test]
async fn test_unparseable_json_archived_not_indexed() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("broken.json", "{ definitely not json");

    pipeline.scan().await;

    assert!(pipeline.indexed().is_empty());
    assert_eq!(pipeline.archive_names(), vec!["broken.json"]);
}

#[tokio::test]
async fn test_hidden_file_left_alone() {
    let pipeline = Pipeline::new();
    pipeline.drop_file(".partial-upload", NOTES);

    pipeline.scan().await;

    assert!(pipeline.indexed().is_empty());
    assert_eq!(pipeline.inbox_names(), vec![".partial-upload"]);
    assert!(pipeline.archive_names().is_empty());
}

#[tokio::test]
async fn test_json_file_indexed_with_source_kind() {
    let pipeline = Pipeline::new();
    pipeline.drop_file(
        "config.json",
        r#"{"service": "chatragi", "features": ["ingest", "memory"]}"#,
    );

    pipeline.scan().await;

    let entries = pipeline.indexed();
    assert!(!entries.is_empty());
    assert_eq!(entries[0].meta_str("source"), Some("json"));
    assert_eq!(pipeline.archive_names(), vec!["config.json"]);
}

#[tokio::test]
async fn test_csv_file_indexed_as_table_text() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("team.csv", "name,role\nAda,engineer\nGrace,admiral\n");

    pipeline.scan().await;

    let entries = pipeline.indexed();
    assert!(!entries.is_empty());
    assert_eq!(entries[0].meta_str("source"), Some("csv"));
    let text: String = entries.iter().map(|e| e.document.as_str()).collect();
    assert!(text.contains("Ada"));
    assert!(text.contains("admiral"));
}

#[tokio::test]
async fn test_different_documents_both_indexed() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("notes.txt", NOTES);
    pipeline.drop_file(
        "other.txt",
        "Completely unrelated material about sailing. Knots and rigging take practice.",
    );

    pipeline.scan().await;

    let names: std::collections::HashSet<String> = pipeline
        .indexed()
        .iter()
        .filter_map(|e| e.meta_str("file_name").map(str::to_string))
        .collect();
    assert!(names.contains("notes.txt"));
    assert!(names.contains("other.txt"));
}

#[tokio::test]
async fn test_delete_document_removes_all_its_chunks() {
    let pipeline = Pipeline::new();
    pipeline.drop_file("notes.txt", NOTES);
    pipeline.drop_file("other.txt", "Different content entirely. It stays indexed.");
    pipeline.scan().await;

    let removed = delete_document_by_filename(pipeline.doc_index.as_ref(), "notes.txt")
        .expect("delete by filename");
    assert!(removed > 0);

    let remaining = pipeline.indexed();
    assert!(!remaining.is_empty());
    assert!(remaining
        .iter()
        .all(|e| e.meta_str("file_name") == Some("other.txt")));
}

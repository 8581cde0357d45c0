//! Ingestion service
//!
//! Orchestrates sanitize, chunk, and store for single documents and
//! batches. Transient chunk insert failures are logged and skipped so
//! one bad row never discards the rest of a document; a store that
//! persists nothing fails the document. Batch items are isolated so
//! one failing document never aborts its siblings.

use crate::chunker::chunk_text;
use crate::sanitize::clean_text;
use docforge_common::config::ChunkingConfig;
use docforge_common::{AppError, ChunkStore, NewChunk, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Per-document outcome within a batch
#[derive(Debug, Serialize)]
pub struct DocumentResult {
    pub uri: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a batch ingestion run
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DocumentResult>,
}

/// Service handling document ingestion
#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn ChunkStore>,
    chunking: ChunkingConfig,
}

impl IngestService {
    pub fn new(store: Arc<dyn ChunkStore>, chunking: ChunkingConfig) -> Self {
        Self { store, chunking }
    }

    /// Sanitize, chunk, and store one document. Returns the number of
    /// chunks actually inserted.
    ///
    /// A transient insert failure skips that chunk and continues. A
    /// connection-class failure, or a run where no chunk at all could
    /// be persisted, fails the whole document.
    pub async fn ingest_text(
        &self,
        document_uri: &str,
        raw_text: &str,
        metadata: serde_json::Value,
    ) -> Result<usize> {
        let started = Instant::now();
        let text = clean_text(raw_text);
        let chunks = chunk_text(&text, &self.chunking);
        let total = chunks.len();

        let mut inserted = 0usize;
        let mut last_err: Option<AppError> = None;
        for chunk in chunks {
            let row = NewChunk {
                document_uri: document_uri.to_string(),
                chunk_num: chunk.chunk_num,
                text: chunk.text,
                metadata: metadata.clone(),
            };
            match self.store.insert_chunk(&row).await {
                Ok(()) => inserted += 1,
                Err(e) if e.is_connection_error() => {
                    warn!(
                        document_uri = %document_uri,
                        chunk_num = row.chunk_num,
                        error = %e,
                        "Store unreachable, aborting document"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        document_uri = %document_uri,
                        chunk_num = row.chunk_num,
                        error = %e,
                        "Failed to insert chunk, skipping"
                    );
                    last_err = Some(e);
                }
            }
        }

        // Skipping is best-effort within a document; persisting nothing
        // out of a non-empty chunk list is a document failure.
        if inserted == 0 {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        let skipped = total - inserted;
        docforge_common::metrics::record_ingestion(
            started.elapsed().as_secs_f64(),
            inserted,
            skipped,
        );
        info!(
            document_uri = %document_uri,
            chunks_created = inserted,
            chunks_skipped = skipped,
            "Document ingested"
        );
        Ok(inserted)
    }

    /// Ingest a document from a local path.
    pub async fn ingest_path(&self, path: &str, metadata: serde_json::Value) -> Result<usize> {
        if !Path::new(path).exists() {
            return Err(AppError::DocumentNotFound(path.to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes);
        self.ingest_text(path, &text, metadata).await
    }

    /// Ingest a list of document paths sequentially. Each item's
    /// failure is captured in the summary instead of aborting the run.
    pub async fn ingest_batch(&self, uris: Vec<String>) -> BatchSummary {
        let mut results = Vec::with_capacity(uris.len());
        let mut successful = 0usize;
        let mut failed = 0usize;

        for uri in &uris {
            match self.ingest_path(uri, serde_json::json!({})).await {
                Ok(chunks) => {
                    successful += 1;
                    results.push(DocumentResult {
                        uri: uri.clone(),
                        success: true,
                        chunks: Some(chunks),
                        error: None,
                    });
                }
                Err(e) => {
                    failed += 1;
                    warn!(uri = %uri, error = %e, "Batch item failed");
                    results.push(DocumentResult {
                        uri: uri.clone(),
                        success: false,
                        chunks: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        BatchSummary {
            total: uris.len(),
            successful,
            failed,
            results,
        }
    }

    /// Check connectivity to the chunk store.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<NewChunk>>,
    }

    #[async_trait]
    impl ChunkStore for MemoryStore {
        async fn insert_chunk(&self, chunk: &NewChunk) -> Result<()> {
            self.rows
                .lock()
                .map_err(|_| AppError::Validation("poisoned".into()))?
                .push(chunk.clone());
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Rejects every insert, as an unreachable database would.
    struct DeadStore;

    #[async_trait]
    impl ChunkStore for DeadStore {
        async fn insert_chunk(&self, _chunk: &NewChunk) -> Result<()> {
            Err(AppError::DatabaseConnection("connection refused".into()))
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::DatabaseConnection("connection refused".into()))
        }
    }

    /// Fails every insert with a statement-level error.
    struct RejectingStore;

    #[async_trait]
    impl ChunkStore for RejectingStore {
        async fn insert_chunk(&self, _chunk: &NewChunk) -> Result<()> {
            Err(AppError::Validation("malformed row".into()))
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Fails every insert whose chunk_num matches.
    struct FlakyStore {
        inner: MemoryStore,
        fail_chunk: i32,
    }

    #[async_trait]
    impl ChunkStore for FlakyStore {
        async fn insert_chunk(&self, chunk: &NewChunk) -> Result<()> {
            if chunk.chunk_num == self.fail_chunk {
                return Err(AppError::Validation("simulated insert failure".into()));
            }
            self.inner.insert_chunk(chunk).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn service_with(store: Arc<dyn ChunkStore>) -> IngestService {
        IngestService::new(
            store,
            ChunkingConfig {
                chunk_size: 100,
                chunk_overlap: 20,
            },
        )
    }

    #[tokio::test]
    async fn ingest_text_stores_ordered_chunks() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(store.clone());

        let text = (0..80).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let inserted = service
            .ingest_text("doc-1", &text, serde_json::json!({"k": "v"}))
            .await
            .unwrap();

        let rows = store.rows.lock().unwrap();
        assert_eq!(inserted, rows.len());
        assert!(inserted > 1);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.chunk_num, i as i32);
            assert_eq!(row.document_uri, "doc-1");
            assert_eq!(row.metadata["k"], "v");
        }
    }

    #[tokio::test]
    async fn empty_text_is_success_with_zero_chunks() {
        let service = service_with(Arc::new(MemoryStore::default()));
        let inserted = service
            .ingest_text("empty", "  \n\n ", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn failed_chunk_insert_is_skipped_not_fatal() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::default(),
            fail_chunk: 1,
        });
        let service = service_with(store.clone());

        let text = (0..80).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let inserted = service
            .ingest_text("doc-2", &text, serde_json::json!({}))
            .await
            .unwrap();

        let stored = store.inner.rows.lock().unwrap().len();
        assert_eq!(inserted, stored);
        assert!(store.inner.rows.lock().unwrap().iter().all(|r| r.chunk_num != 1));
    }

    #[tokio::test]
    async fn unreachable_store_fails_the_document() {
        let service = service_with(Arc::new(DeadStore));
        let text = (0..80).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let err = service
            .ingest_text("doc-dead", &text, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseConnection(_)));
    }

    #[tokio::test]
    async fn persisting_nothing_is_a_document_failure() {
        let service = service_with(Arc::new(RejectingStore));
        let text = (0..80).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let err = service
            .ingest_text("doc-rejected", &text, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_store_fails_every_batch_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.txt");
        let path_b = dir.path().join("b.txt");
        writeln!(std::fs::File::create(&path_a).unwrap(), "first document body").unwrap();
        writeln!(std::fs::File::create(&path_b).unwrap(), "second document body").unwrap();

        let service = service_with(Arc::new(DeadStore));
        let summary = service
            .ingest_batch(vec![
                path_a.to_string_lossy().into_owned(),
                path_b.to_string_lossy().into_owned(),
            ])
            .await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 2);
        assert!(summary.results.iter().all(|r| !r.success && r.error.is_some()));
    }

    #[tokio::test]
    async fn ingest_path_missing_file_is_not_found() {
        let service = service_with(Arc::new(MemoryStore::default()));
        let err = service
            .ingest_path("/no/such/file.txt", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let good_a = dir.path().join("a.txt");
        let good_b = dir.path().join("b.txt");
        writeln!(std::fs::File::create(&good_a).unwrap(), "first document body").unwrap();
        writeln!(std::fs::File::create(&good_b).unwrap(), "second document body").unwrap();

        let service = service_with(Arc::new(MemoryStore::default()));
        let uris = vec![
            good_a.to_string_lossy().into_owned(),
            "/missing/doc.txt".to_string(),
            good_b.to_string_lossy().into_owned(),
        ];
        let summary = service.ingest_batch(uris.clone()).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results.len(), 3);
        for (result, uri) in summary.results.iter().zip(&uris) {
            assert_eq!(&result.uri, uri);
        }
        assert!(summary.results[0].success);
        assert!(!summary.results[1].success);
        assert!(summary.results[1].error.is_some());
        assert!(summary.results[2].success);
    }

    #[tokio::test]
    async fn empty_batch_is_an_empty_summary() {
        let service = service_with(Arc::new(MemoryStore::default()));
        let summary = service.ingest_batch(Vec::new()).await;
        assert_eq!(summary.total, 0);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.results.is_empty());
    }
}

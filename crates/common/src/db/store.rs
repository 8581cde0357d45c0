//! Persistence seam for chunk rows
//!
//! The ingestion service writes through this trait so tests can
//! substitute an in-memory store for the Postgres repository.

use crate::errors::Result;
use async_trait::async_trait;

/// One chunk row ready for insertion
#[derive(Debug, Clone)]
pub struct NewChunk {
    /// Owning document identifier (URI, path, or filename)
    pub document_uri: String,
    /// 0-based position within the document
    pub chunk_num: i32,
    /// Sanitized chunk text
    pub text: String,
    /// Metadata inherited from the document
    pub metadata: serde_json::Value,
}

/// Trait for chunk persistence backends
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert a single chunk row, deriving its search vector from the text
    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<()>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;
}

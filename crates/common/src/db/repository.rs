//! Postgres chunk repository
//!
//! Inserts chunk rows with a tsvector search column. The tsvector is
//! generated in SQL via `to_tsvector` so the database tokenizer stays
//! the single source of truth for the search representation.

use crate::db::store::{ChunkStore, NewChunk};
use crate::db::DbPool;
use crate::errors::Result;
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use uuid::Uuid;

/// Repository for chunk persistence
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for Repository {
    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<()> {
        // Raw SQL so the search vector is derived in the same statement
        // that stores the text ($2 is bound once, used twice).
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO document_chunks (id, text, text_search, document_uri, chunk_num, metadata)
            VALUES ($1, $2, to_tsvector('english', $2), $3, $4, $5)
            "#,
            vec![
                Uuid::new_v4().into(),
                chunk.text.clone().into(),
                chunk.document_uri.clone().into(),
                chunk.chunk_num.into(),
                chunk.metadata.clone().into(),
            ],
        );

        self.pool.conn().execute(stmt).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

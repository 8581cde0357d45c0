//! Database layer for DocForge
//!
//! Provides:
//! - Connection pool management
//! - Embedded schema migrations
//! - The `ChunkStore` trait and its Postgres `Repository` implementation

mod repository;
mod store;

pub use repository::Repository;
pub use store::{ChunkStore, NewChunk};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection(format!("Failed to connect: {}", e)))?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Run embedded schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        let migrations = [include_str!("migrations/001_init.sql")];

        for (i, sql) in migrations.iter().enumerate() {
            info!("Running migration {}", i + 1);
            self.conn.execute_unprepared(sql).await?;
        }

        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection(format!("Ping failed: {}", e)))?;

        Ok(())
    }
}

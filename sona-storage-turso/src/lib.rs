//! # SONA Storage - Turso
//!
//! Turso/libSQL persistence for the `sona-core` EWC++ pattern store.
//!
//! This crate provides:
//! - Connection management for local and remote libSQL databases
//! - Schema creation for patterns, the Fisher singleton, and
//!   consolidation history
//! - The [`sona_core::store::PatternStorage`] implementation consumed by
//!   [`sona_core::store::PatternStore`]
//!
//! ## Example
//!
//! ```no_run
//! use sona_storage_turso::TursoPatternStorage;
//!
//! # async fn example() -> sona_core::Result<()> {
//! let storage = TursoPatternStorage::local("patterns.db", 384).await?;
//! storage.initialize_schema().await?;
//! # Ok(())
//! # }
//! ```

use libsql::{Builder, Connection, Database};
use sona_core::{Error, Result};
use std::sync::Arc;
use tracing::info;

mod fisher;
mod patterns;
mod rows;
mod schema;
mod trait_impl;

/// Turso-backed pattern storage.
///
/// One instance owns one database handle; it is not shared across stores.
pub struct TursoPatternStorage {
    db: Arc<Database>,
    dimension: usize,
}

impl TursoPatternStorage {
    /// Connect to a database URL.
    ///
    /// Only `libsql://`, `file:`, and `:memory:` protocols are accepted;
    /// remote connections require a non-empty token.
    pub async fn new(url: &str, token: &str, dimension: usize) -> Result<Self> {
        info!("Connecting to Turso database at {url}");

        if !url.starts_with("libsql://") && !url.starts_with("file:") && url != ":memory:" {
            return Err(Error::Configuration(format!(
                "Insecure database URL: {url}. Only libsql://, file:, or :memory: are allowed"
            )));
        }
        if url.starts_with("libsql://") && token.trim().is_empty() {
            return Err(Error::Configuration(
                "Authentication token required for remote Turso connections".to_string(),
            ));
        }

        let db = if url.starts_with("libsql://") {
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
                .map_err(|e| Error::Storage(format!("Failed to connect to Turso: {e}")))?
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Builder::new_local(path)
                .build()
                .await
                .map_err(|e| Error::Storage(format!("Failed to connect to Turso: {e}")))?
        };

        Ok(Self {
            db: Arc::new(db),
            dimension,
        })
    }

    /// Open a local database file.
    pub async fn local(path: &str, dimension: usize) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| Error::Storage(format!("Failed to open local database: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            dimension,
        })
    }

    /// Wrap an existing database handle.
    pub fn from_database(db: Database, dimension: usize) -> Self {
        Self {
            db: Arc::new(db),
            dimension,
        }
    }

    /// Create tables and indices if they do not exist.
    pub async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        for statement in schema::ALL_STATEMENTS {
            conn.execute(statement, ())
                .await
                .map_err(|e| Error::Storage(format!("Failed to initialize schema: {e}")))?;
        }
        info!("Pattern storage schema initialized");
        Ok(())
    }

    /// Store-wide embedding dimension used to validate persisted blobs.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub(crate) fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| Error::Storage(format!("Failed to open connection: {e}")))
    }
}

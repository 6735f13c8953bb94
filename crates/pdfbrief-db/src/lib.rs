//! # pdfbrief-db
//!
//! PostgreSQL persistence and blob storage for pdfbrief.
//!
//! This crate provides:
//! - Connection pool management
//! - `PgDocumentRepository`, the relational store for documents and summaries
//! - `FilesystemArtifactStore`, the blob store for uploaded PDF bytes
//! - Embedded migrations (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use pdfbrief_db::{Database, DocumentRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/pdfbrief").await?;
//!     for item in db.documents.list_documents().await? {
//!         println!("{} {}", item.id, item.original_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod artifact_store;
pub mod documents;
pub mod pool;

// Always compiled so integration tests in tests/ can share the default URL.
pub mod test_fixtures;

// Re-export core types
pub use pdfbrief_core::*;

pub use artifact_store::{stored_path_for, FilesystemArtifactStore};
pub use documents::PgDocumentRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Document and summary repository.
    pub documents: PgDocumentRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            documents: PgDocumentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

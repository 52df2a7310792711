//! # Modelhooks Repository
//!
//! Concrete document store implementations (adapters) for the modelhooks service.
//! This crate provides adapters that implement the `DocumentStore` port.

use async_trait::async_trait;
use modelhooks_types::{Document, DocumentId, DocumentStore, Filter, Query, RepoError, Update};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;


pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// `DATABASE_URL` value selecting the in-memory store.
pub const MEMORY_URL: &str = "memory";

/// Unified store wrapper picked from a database URL at startup.
pub enum Store {
    Memory(MemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteStore),
}

/// Build and initialize a store from a database URL.
///
/// # Examples
///
/// ```ignore
/// let store = build_store("memory").await?;
///
/// // SQLite (with `sqlite` feature)
/// let store = build_store("sqlite://modelhooks.db?mode=rwc").await?;
/// ```
pub async fn build_store(database_url: &str) -> anyhow::Result<Store> {
    Store::new(database_url).await
}

impl Store {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        if database_url == MEMORY_URL {
            tracing::warn!("Using in-memory document store; data is lost on exit");
            return Ok(Self::Memory(MemoryStore::new()));
        }

        #[cfg(feature = "sqlite")]
        if database_url.starts_with("sqlite:") {
            let inner = SqliteStore::new(database_url).await?;
            return Ok(Self::Sqlite(inner));
        }

        anyhow::bail!("unsupported DATABASE_URL: {database_url}")
    }

    fn inner(&self) -> &dyn DocumentStore {
        match self {
            Self::Memory(store) => store,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(store) => store,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Implement DocumentStore for Store (delegation)
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl DocumentStore for Store {
    async fn save(&self, collection: &str, doc: &Document) -> Result<(), RepoError> {
        self.inner().save(collection, doc).await
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepoError> {
        self.inner().find(collection, query).await
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Document>, RepoError> {
        self.inner().find_by_ids(collection, ids).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, RepoError> {
        self.inner().update_many(collection, filter, update).await
    }
}

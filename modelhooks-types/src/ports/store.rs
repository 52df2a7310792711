//! Document store port trait.
//!
//! Adapters (in-memory, SQLite) implement this trait. Hooks never run at
//! this level; the model layer wraps every call.

use crate::domain::{Document, DocumentId, Filter, Query, Update};
use crate::error::RepoError;

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Inserts the document, or replaces the stored one with the same id.
    async fn save(&self, collection: &str, doc: &Document) -> Result<(), RepoError>;

    /// Runs the filter/sort/skip/limit part of a query.
    ///
    /// `query.populate` is ignored; expansion is the caller's job.
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepoError>;

    /// Fetches every document whose id is in `ids`, in no particular order.
    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Document>, RepoError>;

    /// Applies `update` to every document matching `filter`; returns the match count.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, RepoError>;
}

//! In-memory document store.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use modelhooks_types::{
    Document, DocumentId, DocumentStore, Filter, Query, RepoError, Sort, Update,
};

/// Document store backed by a concurrent map of collections.
///
/// Used by tests and by the server when `DATABASE_URL=memory`.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, HashMap<DocumentId, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

/// Orders by creation time (id breaks ties) and cuts the skip/limit window.
pub(crate) fn sort_and_window(mut docs: Vec<Document>, query: &Query) -> Vec<Document> {
    docs.sort_by(|a, b| {
        let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
        match query.sort {
            Sort::CreatedAtAsc => ord,
            Sort::CreatedAtDesc => ord.reverse(),
        }
    });

    let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
    let limit = query
        .limit
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);

    docs.into_iter().skip(skip).take(limit).collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save(&self, collection: &str, doc: &Document) -> Result<(), RepoError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id, doc.clone());
        Ok(())
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepoError> {
        let matching: Vec<Document> = match self.collections.get(collection) {
            Some(docs) => docs
                .values()
                .filter(|d| d.matches(&query.filter))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        Ok(sort_and_window(matching, query))
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Document>, RepoError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, RepoError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut matched = 0;
        for doc in docs.values_mut().filter(|d| d.matches(filter)) {
            doc.apply(update);
            matched += 1;
        }

        Ok(matched)
    }
}

//! Query, filter and update descriptions handed to a `DocumentStore`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::DocumentId;

/// Equality filter over a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub eq: Map<String, Value>,
}

impl Filter {
    pub fn by_id(id: DocumentId) -> Self {
        Self {
            id: Some(id),
            eq: Map::new(),
        }
    }

    /// Adds an equality condition on `field`.
    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.eq.insert(field.into(), value);
        self
    }
}

/// `$set`-style update applied to every matching document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub set: Map<String, Value>,
}

impl Update {
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    /// Drops assignments to the document envelope (`_id`, `createdAt`).
    pub fn without_reserved(mut self) -> Self {
        self.set.retain(|field, _| !super::is_reserved(field));
        self
    }

    pub fn touches(&self, field: &str) -> bool {
        self.set.contains_key(field)
    }
}

/// Ordering on the creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sort {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
}

/// A find-class query.
///
/// `populate` lists the relation paths to expand after the store returns;
/// pre-find hooks append to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Sort,
    pub skip: u64,
    pub limit: Option<u64>,
    pub populate: Vec<String>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requests expansion of a relation path. Duplicate paths are ignored.
    pub fn populate(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.populate.contains(&path) {
            self.populate.push(path);
        }
    }
}

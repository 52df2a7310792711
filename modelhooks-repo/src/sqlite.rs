//! SQLite document store adapter.
//!
//! Every collection shares one `documents` table; field filters go through
//! `json_extract` on the JSON body.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use modelhooks_types::{
    Document, DocumentId, DocumentStore, Filter, Query, RepoError, Sort, Update,
};

use crate::types::{DbDocument, timestamp};

const SELECT_DOCUMENTS: &str = "SELECT id, created_at, body FROM documents WHERE collection = ";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite document store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let store = Self { pool };
        store.create_schema().await?;
        tracing::debug!("SQLite document store ready at {}", database_url);

        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_documents.sql");
        sqlx::raw_sql(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

/// `$."field"` path for `json_extract`.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

/// Appends the `AND ...` conditions of `filter` to a query already scoped
/// to one collection.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id.to_string());
    }

    for (field, expected) in &filter.eq {
        qb.push(" AND json_extract(body, ")
            .push_bind(json_path(field))
            .push(")");

        match expected {
            Value::Null => {
                qb.push(" IS NULL");
            }
            Value::Bool(b) => {
                qb.push(" = ").push_bind(i64::from(*b));
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    qb.push(" = ").push_bind(i);
                } else {
                    qb.push(" = ").push_bind(n.as_f64().unwrap_or_default());
                }
            }
            Value::String(s) => {
                qb.push(" = ").push_bind(s.clone());
            }
            other => {
                qb.push(" = json(").push_bind(other.to_string()).push(")");
            }
        }
    }
}

fn select_matching<'a>(collection: &str, filter: &Filter) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(SELECT_DOCUMENTS);
    qb.push_bind(collection.to_string());
    push_filter(&mut qb, filter);
    qb
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save(&self, collection: &str, doc: &Document) -> Result<(), RepoError> {
        let body = serde_json::to_string(&doc.fields)?;

        sqlx::query(
            r#"INSERT INTO documents (collection, id, created_at, body) VALUES (?, ?, ?, ?)
               ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body, created_at = excluded.created_at"#,
        )
        .bind(collection)
        .bind(doc.id.to_string())
        .bind(timestamp(doc))
        .bind(&body)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepoError> {
        let mut qb = select_matching(collection, &query.filter);

        match query.sort {
            Sort::CreatedAtDesc => qb.push(" ORDER BY created_at DESC, id DESC"),
            Sort::CreatedAtAsc => qb.push(" ORDER BY created_at ASC, id ASC"),
        };

        // OFFSET needs a LIMIT; -1 means unbounded.
        let limit = query
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let offset = i64::try_from(query.skip).unwrap_or(i64::MAX);
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows: Vec<DbDocument> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbDocument::into_domain).collect()
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Document>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(SELECT_DOCUMENTS);
        qb.push_bind(collection.to_string());
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let rows: Vec<DbDocument> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbDocument::into_domain).collect()
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut qb = select_matching(collection, filter);
        let rows: Vec<DbDocument> = qb
            .build_query_as()
            .fetch_all(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut matched = 0;
        for row in rows {
            let mut doc = row.into_domain()?;
            doc.apply(update);
            let body = serde_json::to_string(&doc.fields)?;

            sqlx::query(r#"UPDATE documents SET body = ? WHERE collection = ? AND id = ?"#)
                .bind(&body)
                .bind(collection)
                .bind(doc.id.to_string())
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

            matched += 1;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(matched)
    }
}

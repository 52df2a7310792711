//! Database row types for the SQLite adapter.

use chrono::SecondsFormat;
use sqlx::FromRow;

use modelhooks_types::{Document, DocumentId, RepoError};

/// Document row from database.
#[derive(FromRow)]
pub struct DbDocument {
    pub id: String,
    pub created_at: String,
    pub body: String,
}

impl DbDocument {
    /// Convert database row to domain Document.
    pub fn into_domain(self) -> Result<Document, RepoError> {
        let id: DocumentId = self
            .id
            .parse()
            .map_err(|e: uuid::Error| RepoError::Database(e.to_string()))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| RepoError::Database(e.to_string()))?
            .with_timezone(&chrono::Utc);

        let fields = serde_json::from_str(&self.body)?;

        Ok(Document::from_parts(id, created_at, fields))
    }
}

/// Timestamp text whose lexical order matches chronological order.
pub fn timestamp(doc: &Document) -> String {
    doc.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

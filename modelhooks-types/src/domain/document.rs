//! Document domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new random DocumentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reads an id out of a JSON value holding its string form.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Keys of the document envelope. Never stored among the fields.
pub const RESERVED_FIELDS: [&str; 2] = ["_id", "createdAt"];

pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

fn without_reserved(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.retain(|field, _| !is_reserved(field));
    fields
}

/// A schemaless document as held by a store.
///
/// Serializes flat: `{"_id": ..., "createdAt": ..., <fields>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Creates a new document with a fresh id and the current timestamp.
    ///
    /// Reserved keys in `fields` are dropped.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            id: DocumentId::new(),
            created_at: Utc::now(),
            fields: without_reserved(fields),
        }
    }

    /// Creates a document with all parts specified (for store reconstruction).
    pub fn from_parts(id: DocumentId, created_at: DateTime<Utc>, fields: Map<String, Value>) -> Self {
        Self {
            id,
            created_at,
            fields: without_reserved(fields),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field. Reserved keys are ignored.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if !is_reserved(&field) {
            self.fields.insert(field, value);
        }
    }

    /// Equality match used by every store adapter.
    ///
    /// A filter on a field the document lacks only matches `null`.
    pub fn matches(&self, filter: &super::Filter) -> bool {
        if let Some(id) = filter.id {
            if id != self.id {
                return false;
            }
        }

        filter
            .eq
            .iter()
            .all(|(field, expected)| self.fields.get(field).unwrap_or(&Value::Null) == expected)
    }

    /// Applies the `$set` half of an update in place.
    pub fn apply(&mut self, update: &super::Update) {
        for (field, value) in &update.set {
            self.set(field.clone(), value.clone());
        }
    }
}

//! Domain models for the modelhooks service.

pub mod document;
pub mod environment;
pub mod query;
pub mod schema;

pub use document::{Document, DocumentId, RESERVED_FIELDS, is_reserved};
pub use environment::Environment;
pub use query::{Filter, Query, Sort, Update};
pub use schema::{
    DEFAULT_ACTIVE_FLAG, Element, FieldDescriptor, FieldKind, PopulateDirective, Schema,
};

//! # Modelhooks Types
//!
//! Domain types and port traits for the modelhooks service.
//! This crate has ZERO external IO dependencies - only data structures,
//! schema rules, and trait definitions.
//!
//! ## Architecture
//!
//! - `domain/` - Schemas, documents, queries and the runtime environment
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Pagination and response shapes
//! - `error/` - Schema, repository, application and HTTP-facing errors

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    DEFAULT_ACTIVE_FLAG, Document, DocumentId, Element, Environment, FieldDescriptor, FieldKind,
    Filter, PopulateDirective, Query, Schema, Sort, Update,
};
pub use dto::*;
pub use error::{
    ApiError, AppError, FieldError, RepoError, RouteError, SchemaError, ValidationError,
};
pub use ports::{DocumentStore, ManagerNotifier, NotifyError};

//! # Modelhooks Hex
//!
//! Model layer and HTTP adapter for the modelhooks service.
//!
//! ## Architecture
//!
//! - `model/` - Schema hook installer and the models built on it
//! - `inbound/` - HTTP adapter (Axum pipeline)
//!
//! Models are generic over `S: DocumentStore`, allowing different store
//! implementations to be injected.

pub mod inbound;
pub mod model;

#[cfg(test)]
mod model_tests;

pub use model::{Model, ModelBuilder, install_populate_cascade};

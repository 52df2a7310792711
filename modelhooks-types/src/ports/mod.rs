//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The model layer depends on these traits, not concrete implementations.

mod manager;
mod store;

pub use manager::{ManagerNotifier, NotifyError};
pub use store::DocumentStore;

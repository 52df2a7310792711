//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::Document;

pub const DEFAULT_SKIP: u64 = 0;
pub const DEFAULT_LIMIT: u64 = 50;

/// Page window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_skip")]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_skip() -> u64 {
    DEFAULT_SKIP
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }.normalized()
    }

    /// Limit must be positive; zero falls back to the default.
    pub fn normalized(self) -> Self {
        Self {
            skip: self.skip,
            limit: if self.limit == 0 { DEFAULT_LIMIT } else { self.limit },
        }
    }
}

/// Result of a model update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Documents matched by the caller's update.
    pub matched: u64,
    /// Side-effect updates issued by pre-update hooks before it.
    pub side_effects: u64,
}

/// Response body for a single updated resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub outcome: UpdateOutcome,
    pub document: Option<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_query() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pagination::default());
        assert_eq!(p.limit, 50);
    }

    #[test]
    fn test_zero_limit_normalized() {
        assert_eq!(Pagination::new(5, 0).limit, DEFAULT_LIMIT);
        assert_eq!(Pagination::new(5, 7).limit, 7);
    }
}

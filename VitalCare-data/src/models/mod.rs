// Storage models, one module per table group
pub mod account;
pub mod appointment;
pub mod health_record;
pub mod notification;

use serde::{Deserialize, Serialize};

/// Offset pagination applied to list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return
    pub limit: usize,
    /// Number of rows to skip
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: 20, offset: 0 }
    }
}

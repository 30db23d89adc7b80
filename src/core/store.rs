//! Storage collaborator
//!
//! The pipeline never talks to a database directly. It goes through
//! [`Store`], which addresses records by collection name and keeps the
//! distinction between "not found", unique-constraint violations and
//! everything else.

use crate::core::query::{Filter, OrderTerm, Window};
use crate::core::record::Record;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate value for {collection}.{field}")]
    UniqueViolation { collection: String, field: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Record storage addressed by collection
///
/// Soft-deleted records are invisible unless the filter is
/// [unscoped](Filter::unscoped).
#[async_trait]
pub trait Store: Send + Sync {
    /// First record matching the filter
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Record, StoreError>;

    /// Number of records matching the filter
    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError>;

    /// Ordered records matching the filter, optionally sliced
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        order: &[OrderTerm],
        window: Option<Window>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Insert a new record; the store assigns the identity and timestamps
    async fn create(&self, collection: &str, record: Record) -> Result<Record, StoreError>;

    /// Replace an existing record, refreshing `updated_at`
    async fn save(&self, collection: &str, record: Record) -> Result<Record, StoreError>;

    /// Soft delete: mark the record removed
    async fn delete(&self, collection: &str, id: u64) -> Result<(), StoreError>;

    /// Permanently remove records, soft-deleted or not; returns rows removed
    async fn unscoped_delete(&self, collection: &str, ids: &[u64]) -> Result<usize, StoreError>;
}

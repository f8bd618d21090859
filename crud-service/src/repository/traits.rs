//! Repository trait definitions
//!
//! This module provides the storage capabilities consumed by the use-case
//! layer, using RPITIT (Return Position Impl Trait In Traits), available since
//! Rust 1.75.
//!
//! # Overview
//!
//! - [`Entity`]: what the generic orchestration needs to know about a row type
//! - [`EntityRepository`]: list, count, find, create, update and soft delete
//! - [`ExistenceChecker`]: precondition queries gating mutations
//!
//! Every method takes the [`OperationContext`] of the running operation, which
//! carries the tenant explicitly and the deadline the call must respect.
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_service::repository::{EntityRepository, RepositoryResult};
//!
//! struct PgRoleRepository {
//!     pools: TenantPools,
//! }
//!
//! impl EntityRepository<Role> for PgRoleRepository {
//!     async fn count(&self, ctx: &OperationContext, criteria: &ListCriteria) -> RepositoryResult<u64> {
//!         let pool = self.pools.get(ctx.tenant())?;
//!         sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE deleted_at IS NULL")
//!             .fetch_one(pool)
//!             .await
//!             .map_err(|e| StructuredError::infrastructure("PgRoleRepository::count", e))
//!     }
//!     // ... other methods
//! }
//! ```

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pagination::{FilterValue, ListCriteria, PaginationRequest};
use crate::error::StructuredError;
use crate::usecase::context::OperationContext;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, StructuredError>;

/// Column holding the soft-delete marker
pub const DELETED_AT_COLUMN: &str = "deleted_at";

/// Column holding the primary key
pub const ID_COLUMN: &str = "id";

/// A tenant-scoped business entity managed by the generic use case
///
/// Ids are generated by the use case, never by storage. Deletion is logical:
/// `deleted_at` is set and the row stays in place.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Input accepted by create
    type Create: NewEntity<Self>;
    /// Input accepted by update
    type Update: EntityChanges<Self>;

    /// Singular name used in error descriptions and logs (e.g. `role`)
    const NAME: &'static str;
    /// Storage table (e.g. `roles`)
    const TABLE: &'static str;
    /// Column that must be unique among live rows (e.g. `name`)
    const UNIQUE_COLUMN: &'static str;

    /// Primary key
    fn id(&self) -> Uuid;

    /// Value of [`Self::UNIQUE_COLUMN`]
    fn unique_key(&self) -> &str;

    /// Creation timestamp
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Soft-delete timestamp
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// Set the soft-delete timestamp
    fn mark_deleted(&mut self, at: DateTime<Utc>);

    /// Value of `column`, used for filtering and existence checks
    ///
    /// Returns `None` for unknown columns.
    fn field(&self, column: &str) -> Option<FilterValue>;
}

/// Validated input that becomes a new entity
pub trait NewEntity<E>: Send {
    /// Check field rules, collecting one message per failing field
    ///
    /// # Errors
    ///
    /// Returns a `VALIDATION_FAILED` error listing every failing field.
    fn validate(&self) -> Result<(), StructuredError>;

    /// Unique key the new row would hold
    fn unique_key(&self) -> &str;

    /// Build the entity with a generated id and creation time
    fn into_entity(self, id: Uuid, created_at: DateTime<Utc>) -> E;
}

/// Validated partial changes applied to an existing entity
pub trait EntityChanges<E>: Send {
    /// Check field rules, collecting one message per failing field
    ///
    /// # Errors
    ///
    /// Returns a `VALIDATION_FAILED` error listing every failing field.
    fn validate(&self) -> Result<(), StructuredError>;

    /// New unique key, when the change renames the entity
    fn unique_key(&self) -> Option<&str>;

    /// Apply the changes in place
    fn apply(self, entity: &mut E);
}

/// Storage capability for one entity type
///
/// Implementations classify their own failures as
/// [`ErrorKind::Infrastructure`](crate::error::ErrorKind) at this boundary.
/// Listing and counting never return soft-deleted rows.
pub trait EntityRepository<E: Entity>: Send + Sync {
    /// Fetch one page of live rows matching `criteria`
    fn list(
        &self,
        ctx: &OperationContext,
        criteria: &ListCriteria,
        page: &PaginationRequest,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Count live rows matching `criteria`
    fn count(
        &self,
        ctx: &OperationContext,
        criteria: &ListCriteria,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Find a live row by id
    fn find_by_id(
        &self,
        ctx: &OperationContext,
        id: Uuid,
    ) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Insert a new row
    fn create(
        &self,
        ctx: &OperationContext,
        entity: &E,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Overwrite an existing row
    fn update(
        &self,
        ctx: &OperationContext,
        entity: &E,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Set the soft-delete marker of a row
    fn soft_delete(
        &self,
        ctx: &OperationContext,
        id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;
}

/// Parameters of a precondition query
///
/// A row exists when `id_column = id_value` and, if a status column is set,
/// the column equals `status_value` (`Null` meaning `IS NULL`).
///
/// ```rust
/// use crud_service::repository::ExistenceCheckParams;
///
/// let params = ExistenceCheckParams::new("roles", "name", "Gerencia").excluding_deleted();
/// assert_eq!(params.status_column.as_deref(), Some("deleted_at"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistenceCheckParams {
    /// Table to query
    pub table: String,
    /// Column compared with `id_value`
    pub id_column: String,
    /// Value looked up
    pub id_value: String,
    /// Optional status column filter
    pub status_column: Option<String>,
    /// Expected status value; `None` means `IS NULL`
    pub status_value: Option<String>,
}

impl ExistenceCheckParams {
    /// Look up `id_value` in `table.id_column`
    pub fn new(
        table: impl Into<String>,
        id_column: impl Into<String>,
        id_value: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
            id_value: id_value.into(),
            status_column: None,
            status_value: None,
        }
    }

    /// Require `column` to equal `value` (`None` meaning `IS NULL`)
    #[must_use]
    pub fn with_status(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.status_column = Some(column.into());
        self.status_value = value;
        self
    }

    /// Ignore soft-deleted rows
    #[must_use]
    pub fn excluding_deleted(self) -> Self {
        self.with_status(DELETED_AT_COLUMN, None)
    }

    /// Expected status as a filter value
    #[must_use]
    pub fn status_filter_value(&self) -> FilterValue {
        FilterValue::from(self.status_value.clone())
    }
}

/// Capability answering precondition queries
pub trait ExistenceChecker: Send + Sync {
    /// Whether a row matching `params` exists
    fn exists(
        &self,
        ctx: &OperationContext,
        params: &ExistenceCheckParams,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_result_type() {
        let ok_result: RepositoryResult<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: RepositoryResult<i32> = Err(StructuredError::not_found("role", "123"));
        assert!(err_result.is_err());
    }

    #[test]
    fn test_existence_params_builders() {
        let plain = ExistenceCheckParams::new("roles", "id", "X");
        assert!(plain.status_column.is_none());
        assert_eq!(plain.status_filter_value(), FilterValue::Null);

        let live = plain.clone().excluding_deleted();
        assert_eq!(live.status_column.as_deref(), Some(DELETED_AT_COLUMN));
        assert!(live.status_value.is_none());

        let enabled = plain.with_status("enable", Some("true".to_string()));
        assert_eq!(
            enabled.status_filter_value(),
            FilterValue::String("true".to_string())
        );
    }
}

//! Storage capabilities for tenant-scoped entities
//!
//! This module defines what the use-case layer needs from storage and nothing
//! more. Concrete backends implement the traits; the crate ships an in-memory
//! one.
//!
//! # Features
//!
//! - **Entity model**: [`Entity`], [`NewEntity`] and [`EntityChanges`] describe a row type
//! - **Repository**: [`EntityRepository`] for paged reads, counts and soft delete
//! - **Preconditions**: [`ExistenceChecker`] answers [`ExistenceCheckParams`] queries
//! - **Pagination**: [`PaginationRequest`] in, [`PaginationResult`] out
//! - **Filtering**: [`ListCriteria`] built from [`FilterCondition`]s
//!
//! # Example
//!
//! ```rust
//! use crud_service::repository::{PaginationRequest, PaginationResult};
//!
//! let request = PaginationRequest::new(3, 10);
//! let result = PaginationResult::compute(&request, 25, 5);
//! assert_eq!((result.from, result.to, result.last_page), (21, 25, 3));
//! ```

mod memory;
mod pagination;
mod traits;

// Re-export all public types
pub use memory::{InMemoryStore, MemoryStoreError};
pub use pagination::{
    FilterCondition, FilterOperator, FilterValue, ListCriteria, OrderDirection, PageLimits,
    PaginationRequest, PaginationResult, DEFAULT_SIZE_PAGE, MAX_SIZE_PAGE,
};
pub use traits::{
    Entity, EntityChanges, EntityRepository, ExistenceCheckParams, ExistenceChecker, NewEntity,
    RepositoryResult, DELETED_AT_COLUMN, ID_COLUMN,
};

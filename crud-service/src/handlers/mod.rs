//! HTTP transport for entity use cases
//!
//! A thin axum layer: it reads the tenant from the `x-tenant-id` header, turns
//! the query string and JSON bodies into use-case inputs and maps results onto
//! response envelopes. Every failure is a
//! [`StructuredError`](crate::error::StructuredError) answered with its own
//! HTTP status.
//!
//! # Features
//!
//! - **Router**: [`entity_router`] mounts list, get, create, update and delete
//! - **Tenant**: [`Tenant`] extractor over [`TENANT_HEADER`]
//! - **Pagination**: [`ListQuery`] in, [`ListResponse`] out
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum::Router;
//! use crud_service::clock::SystemClock;
//! use crud_service::handlers::entity_router;
//! use crud_service::repository::InMemoryStore;
//! use crud_service::roles::Role;
//! use crud_service::usecase::EntityUseCase;
//!
//! let store = Arc::new(InMemoryStore::<Role>::new());
//! let roles = EntityUseCase::<Role, _, _>::new(store.clone(), store, Arc::new(SystemClock));
//! let app: Router = Router::new().nest("/roles", entity_router(roles));
//! ```

mod query;
mod response;
mod routes;

// Re-export all public types
pub use query::{ListQuery, ORDER_COLUMN};
pub use response::{Created, ItemResponse, ListResponse};
pub use routes::{entity_router, Tenant, TENANT_HEADER};

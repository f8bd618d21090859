//! # crud-service
//!
//! Use-case orchestration core for tenant-scoped REST microservices that expose
//! list / get / create / update / delete over one business entity.
//!
//! ## Features
//!
//! - **Structured errors**: one typed error carrying layer, severity, HTTP status and messages
//! - **Paginated fan-out**: page and count reads issued concurrently and joined
//! - **Existence-gated mutation**: precondition queries before every write
//! - **Bounded execution**: per-operation deadline, cancellation and panic recovery
//! - **Explicit tenancy**: the tenant travels with every repository call
//! - **HTTP transport**: generic axum router with tracing and panic recovery layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use crud_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let store = Arc::new(InMemoryStore::<Role>::new());
//!     let roles = EntityUseCase::<Role, _, _>::new(store.clone(), store, Arc::new(SystemClock))
//!         .with_timeout(config.usecase.timeout())
//!         .with_limits(config.usecase.limits());
//!
//!     let app = Router::new().nest("/roles", entity_router(roles));
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod repository;
pub mod roles;
pub mod server;
pub mod usecase;

/// Prelude module for convenient imports
pub mod prelude {
    pub use axum::Router;

    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{Config, ServiceConfig, UseCaseConfig};
    pub use crate::error::{Error, ErrorKind, Layer, Level, Result, StructuredError};
    pub use crate::handlers::{entity_router, ItemResponse, ListQuery, ListResponse, Tenant};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        Entity, EntityChanges, EntityRepository, ExistenceCheckParams, ExistenceChecker,
        FilterCondition, InMemoryStore, ListCriteria, NewEntity, PageLimits, PaginationRequest,
        PaginationResult, RepositoryResult,
    };
    pub use crate::roles::{CreateRole, Role, UpdateRole};
    pub use crate::server::Server;
    pub use crate::usecase::{
        list_with_total, run_bounded, EntityUseCase, OperationContext, Page, RequestContext,
        TenantId,
    };
}

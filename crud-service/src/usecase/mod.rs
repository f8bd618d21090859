//! Use-case orchestration for tenant-scoped entities
//!
//! [`EntityUseCase`] owns the business flow of the five operations exposed to
//! transports. Every operation:
//!
//! 1. runs inside an `info_span!` carrying the entity, operation and tenant,
//! 2. is bounded by [`run_bounded`] (deadline, cancellation, panic recovery),
//! 3. gates mutations on an [`ExistenceChecker`] query before writing.
//!
//! The check and the write are separate storage calls. Two concurrent creates
//! of the same key, or two concurrent deletes, can both pass the check; a
//! unique index in storage is what ultimately rejects the second write.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use crud_service::clock::SystemClock;
//! use crud_service::repository::{InMemoryStore, ListCriteria, PaginationRequest};
//! use crud_service::roles::{CreateRole, Role};
//! use crud_service::usecase::{EntityUseCase, RequestContext, TenantId};
//!
//! # tokio_test_block_on(async {
//! let store = Arc::new(InMemoryStore::<Role>::new());
//! let roles: EntityUseCase<Role, _, _> =
//!     EntityUseCase::new(store.clone(), store, Arc::new(SystemClock));
//! let ctx = RequestContext::new(TenantId::new("acme")?);
//!
//! roles.create(&ctx, CreateRole { name: "Gerencia".into(), ..Default::default() }).await?;
//! let page = roles.list(&ctx, &ListCriteria::new(), PaginationRequest::default()).await?;
//! assert_eq!(page.pagination.total, 1);
//! # Ok::<_, crud_service::error::StructuredError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod context;
mod list;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::StructuredError;
use crate::repository::{
    Entity, EntityChanges, EntityRepository, ExistenceCheckParams, ExistenceChecker, ListCriteria,
    NewEntity, PageLimits, PaginationRequest, ID_COLUMN,
};

pub use context::{run_bounded, OperationContext, RequestContext, TenantId};
pub use list::{list_with_total, Page};

/// Default budget of one use-case operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Generic CRUD orchestration over one entity type
///
/// `R` provides storage and `C` answers precondition queries; the two are
/// often the same adapter behind two `Arc`s.
pub struct EntityUseCase<E, R, C> {
    repository: Arc<R>,
    checker: Arc<C>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    limits: PageLimits,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R, C> Clone for EntityUseCase<E, R, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            checker: Arc::clone(&self.checker),
            clock: Arc::clone(&self.clock),
            timeout: self.timeout,
            limits: self.limits,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, R, C> fmt::Debug for EntityUseCase<E, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityUseCase")
            .field("entity", &E::NAME)
            .field("clock", &self.clock)
            .field("timeout", &self.timeout)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl<E, R, C> EntityUseCase<E, R, C>
where
    E: Entity,
    R: EntityRepository<E>,
    C: ExistenceChecker,
{
    /// Create a use case with the default timeout and page limits
    pub fn new(repository: Arc<R>, checker: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            checker,
            clock,
            timeout: DEFAULT_TIMEOUT,
            limits: PageLimits::default(),
            _entity: PhantomData,
        }
    }

    /// Bound every operation by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clamp every page request of [`list`](Self::list) to `limits`
    #[must_use]
    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Page size defaults and maximum
    #[must_use]
    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Per-operation budget
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn function(operation: &str) -> String {
        format!("EntityUseCase<{}>::{operation}", E::NAME)
    }

    fn span(ctx: &RequestContext, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "usecase",
            entity = E::NAME,
            operation,
            tenant = %ctx.tenant(),
        )
    }

    async fn is_live(
        &self,
        op: &OperationContext,
        column: &str,
        value: &str,
        function: &str,
    ) -> Result<bool, StructuredError> {
        let params = ExistenceCheckParams::new(E::TABLE, column, value).excluding_deleted();
        self.checker
            .exists(op, &params)
            .await
            .map_err(|e| e.observed_in(function))
    }

    /// List one page of live rows matching `criteria`
    ///
    /// The page size of `request` is clamped to the configured maximum.
    ///
    /// # Errors
    ///
    /// Returns the page or count read's error, or `TIMEOUT` / `FATAL`.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        criteria: &ListCriteria,
        request: PaginationRequest,
    ) -> Result<Page<E>, StructuredError> {
        let function = Self::function("list");
        let name = function.as_str();
        let request = self
            .limits
            .request(Some(request.page()), Some(request.size_page()));
        run_bounded(ctx, self.timeout, name, |op| async move {
            list_with_total(self.repository.as_ref(), &op, criteria, &request)
                .await
                .map_err(|e| e.observed_in(name))
        })
        .instrument(Self::span(ctx, "list"))
        .await
    }

    /// Fetch one live row by id
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` when the id is malformed, unknown or soft-deleted.
    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<E, StructuredError> {
        let function = Self::function("get");
        let name = function.as_str();
        run_bounded(ctx, self.timeout, name, |op| async move {
            let not_found = || StructuredError::not_found(E::NAME, id).with_function(name);
            let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;
            self.repository
                .find_by_id(&op, uuid)
                .await
                .map_err(|e| e.observed_in(name))?
                .ok_or_else(not_found)
        })
        .instrument(Self::span(ctx, "get"))
        .await
    }

    /// Create a row after checking that its unique key is free
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` or `ALREADY_EXISTS` without writing, or the
    /// storage error of the insert.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: E::Create,
    ) -> Result<E, StructuredError> {
        let function = Self::function("create");
        let name = function.as_str();
        run_bounded(ctx, self.timeout, name, move |op| async move {
            input.validate().map_err(|e| e.with_function(name))?;

            let key = input.unique_key().to_string();
            if self.is_live(&op, E::UNIQUE_COLUMN, &key, name).await? {
                return Err(
                    StructuredError::already_exists(E::NAME, E::UNIQUE_COLUMN, &key)
                        .with_function(name),
                );
            }

            let entity = input.into_entity(Uuid::new_v4(), self.clock.now());
            self.repository
                .create(&op, &entity)
                .await
                .map_err(|e| e.observed_in(name))?;
            tracing::info!(id = %entity.id(), "created");
            Ok(entity)
        })
        .instrument(Self::span(ctx, "create"))
        .await
    }

    /// Apply `changes` to a live row
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED`, `NOT_FOUND` (missing or soft-deleted id) or
    /// `ALREADY_EXISTS` (rename onto another live row) without writing, or the
    /// storage error of the update.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        changes: E::Update,
    ) -> Result<E, StructuredError> {
        let function = Self::function("update");
        let name = function.as_str();
        run_bounded(ctx, self.timeout, name, move |op| async move {
            changes.validate().map_err(|e| e.with_function(name))?;

            let not_found = || StructuredError::not_found(E::NAME, id).with_function(name);
            let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;
            if !self.is_live(&op, ID_COLUMN, &uuid.to_string(), name).await? {
                return Err(not_found());
            }
            let mut entity = self
                .repository
                .find_by_id(&op, uuid)
                .await
                .map_err(|e| e.observed_in(name))?
                .ok_or_else(not_found)?;

            if let Some(key) = changes.unique_key() {
                if key != entity.unique_key()
                    && self.is_live(&op, E::UNIQUE_COLUMN, key, name).await?
                {
                    return Err(
                        StructuredError::already_exists(E::NAME, E::UNIQUE_COLUMN, key)
                            .with_function(name),
                    );
                }
            }

            changes.apply(&mut entity);
            self.repository
                .update(&op, &entity)
                .await
                .map_err(|e| e.observed_in(name))?;
            tracing::info!(id = %uuid, "updated");
            Ok(entity)
        })
        .instrument(Self::span(ctx, "update"))
        .await
    }

    /// Soft-delete a live row, stamping `deleted_at` from the clock
    ///
    /// # Errors
    ///
    /// Returns `ALREADY_DELETED` without writing when no live row has `id`, or
    /// the storage error of the write. A malformed id or one that never
    /// existed is also reported as `ALREADY_DELETED`; the check cannot tell
    /// those apart from a soft-deleted row.
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), StructuredError> {
        let function = Self::function("delete");
        let name = function.as_str();
        run_bounded(ctx, self.timeout, name, |op| async move {
            let already_deleted =
                || StructuredError::already_deleted(E::NAME, id).with_function(name);
            let uuid = Uuid::parse_str(id).map_err(|_| already_deleted())?;
            if !self.is_live(&op, ID_COLUMN, &uuid.to_string(), name).await? {
                return Err(already_deleted());
            }
            self.repository
                .soft_delete(&op, uuid, self.clock.now())
                .await
                .map_err(|e| e.observed_in(name))?;
            tracing::info!(id = %uuid, "soft deleted");
            Ok(())
        })
        .instrument(Self::span(ctx, "delete"))
        .await
    }
}

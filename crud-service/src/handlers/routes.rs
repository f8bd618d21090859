//! Axum routes over an [`EntityUseCase`]

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};

use super::{ItemResponse, ListQuery, ListResponse};
use super::response::Created;
use crate::error::StructuredError;
use crate::repository::{Entity, EntityRepository, ExistenceChecker};
use crate::usecase::{EntityUseCase, RequestContext, TenantId};

/// Header carrying the tenant of every request
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant taken from the [`TENANT_HEADER`] header
///
/// A missing, non-text or blank header is rejected with `BAD_REQUEST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(pub TenantId);

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = StructuredError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_HEADER)
            .ok_or_else(|| {
                StructuredError::bad_request(format!("missing {TENANT_HEADER} header"))
            })?
            .to_str()
            .map_err(|_| {
                StructuredError::bad_request(format!("{TENANT_HEADER} header is not valid text"))
            })?;
        TenantId::new(value).map(Self)
    }
}

impl Tenant {
    /// Request context for this tenant
    #[must_use]
    pub fn context(self) -> RequestContext {
        RequestContext::new(self.0)
    }
}

/// Build the CRUD router of one entity
///
/// | Method | Path | Success |
/// |--------|------|---------|
/// | GET | `/` | 200 with a [`ListResponse`] |
/// | GET | `/{id}` | 200 with an [`ItemResponse`] |
/// | POST | `/` | 201 with an [`ItemResponse`] |
/// | PUT | `/{id}` | 200 with an [`ItemResponse`] |
/// | DELETE | `/{id}` | 204 |
///
/// Failures answer with the error's HTTP status and its JSON body.
pub fn entity_router<E, R, C>(use_case: EntityUseCase<E, R, C>) -> Router
where
    E: Entity + Serialize,
    E::Create: DeserializeOwned,
    E::Update: DeserializeOwned,
    R: EntityRepository<E> + 'static,
    C: ExistenceChecker + 'static,
{
    Router::new()
        .route("/", get(list::<E, R, C>).post(create::<E, R, C>))
        .route(
            "/{id}",
            get(fetch::<E, R, C>)
                .put(update::<E, R, C>)
                .delete(remove::<E, R, C>),
        )
        .with_state(use_case)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, StructuredError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| StructuredError::bad_request(rejection.body_text()))
}

async fn list<E, R, C>(
    State(use_case): State<EntityUseCase<E, R, C>>,
    tenant: Tenant,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ListResponse<E>, StructuredError>
where
    E: Entity + Serialize,
    R: EntityRepository<E>,
    C: ExistenceChecker,
{
    let Query(query) =
        query.map_err(|rejection| StructuredError::bad_request(rejection.body_text()))?;
    let request = query.pagination(&use_case.limits());
    let criteria = query.criteria::<E>();
    let page = use_case.list(&tenant.context(), &criteria, request).await?;
    Ok(page.into())
}

async fn fetch<E, R, C>(
    State(use_case): State<EntityUseCase<E, R, C>>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> Result<ItemResponse<E>, StructuredError>
where
    E: Entity + Serialize,
    R: EntityRepository<E>,
    C: ExistenceChecker,
{
    let entity = use_case.get(&tenant.context(), &id).await?;
    Ok(ItemResponse::new(entity))
}

async fn create<E, R, C>(
    State(use_case): State<EntityUseCase<E, R, C>>,
    tenant: Tenant,
    payload: Result<Json<E::Create>, JsonRejection>,
) -> Result<Created<E>, StructuredError>
where
    E: Entity + Serialize,
    E::Create: DeserializeOwned,
    R: EntityRepository<E>,
    C: ExistenceChecker,
{
    let input = body(payload)?;
    let entity = use_case.create(&tenant.context(), input).await?;
    Ok(ItemResponse::new(entity).created())
}

async fn update<E, R, C>(
    State(use_case): State<EntityUseCase<E, R, C>>,
    tenant: Tenant,
    Path(id): Path<String>,
    payload: Result<Json<E::Update>, JsonRejection>,
) -> Result<ItemResponse<E>, StructuredError>
where
    E: Entity + Serialize,
    E::Update: DeserializeOwned,
    R: EntityRepository<E>,
    C: ExistenceChecker,
{
    let changes = body(payload)?;
    let entity = use_case.update(&tenant.context(), &id, changes).await?;
    Ok(ItemResponse::new(entity))
}

async fn remove<E, R, C>(
    State(use_case): State<EntityUseCase<E, R, C>>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> Result<StatusCode, StructuredError>
where
    E: Entity,
    R: EntityRepository<E>,
    C: ExistenceChecker,
{
    use_case.delete(&tenant.context(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

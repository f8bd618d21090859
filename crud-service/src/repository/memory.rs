//! In-memory tenant-partitioned storage
//!
//! [`InMemoryStore`] implements both [`EntityRepository`] and
//! [`ExistenceChecker`] over a [`DashMap`] keyed by tenant and id. It backs the
//! demo binary and the integration-style tests. No shard guard is held across
//! an await point.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use super::pagination::{
    values_equal, FilterValue, ListCriteria, OrderDirection, PaginationRequest,
};
use super::traits::{
    Entity, EntityRepository, ExistenceCheckParams, ExistenceChecker, RepositoryResult,
};
use crate::error::StructuredError;
use crate::usecase::context::{OperationContext, TenantId};

/// Failure raised by the in-memory store itself
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// The existence check named a table this store does not hold
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    /// Insert of an id that is already stored
    #[error("duplicate primary key {0}")]
    DuplicateKey(Uuid),
    /// Update or delete of an id that is not stored
    #[error("no row with primary key {0}")]
    MissingRow(Uuid),
}

/// Tenant-partitioned in-memory table for one entity type
pub struct InMemoryStore<E> {
    rows: DashMap<(TenantId, Uuid), E>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for InMemoryStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryStore<E> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            _entity: PhantomData,
        }
    }

    /// Insert rows directly, bypassing the use case
    pub fn seed(&self, tenant: &TenantId, rows: impl IntoIterator<Item = E>) {
        for row in rows {
            self.rows.insert((tenant.clone(), row.id()), row);
        }
    }

    /// Fetch a row regardless of its soft-delete marker
    #[must_use]
    pub fn get_raw(&self, tenant: &TenantId, id: Uuid) -> Option<E> {
        self.rows
            .get(&(tenant.clone(), id))
            .map(|entry| entry.value().clone())
    }

    fn live_matching(&self, tenant: &TenantId, criteria: &ListCriteria) -> Vec<E> {
        self.rows
            .iter()
            .filter(|entry| &entry.key().0 == tenant)
            .filter(|entry| entry.value().deleted_at().is_none())
            .filter(|entry| {
                criteria
                    .filters()
                    .iter()
                    .all(|filter| filter.matches(entry.value().field(&filter.field).as_ref()))
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn function(operation: &str) -> String {
        format!("InMemoryStore<{}>::{operation}", E::NAME)
    }
}

fn compare_values(left: Option<&FilterValue>, right: Option<&FilterValue>) -> Ordering {
    match (left, right) {
        (Some(FilterValue::Integer(a)), Some(FilterValue::Integer(b))) => a.cmp(b),
        (Some(FilterValue::Boolean(a)), Some(FilterValue::Boolean(b))) => a.cmp(b),
        (Some(FilterValue::Timestamp(a)), Some(FilterValue::Timestamp(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.as_text().cmp(&b.as_text()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<E: Entity> EntityRepository<E> for InMemoryStore<E> {
    async fn list(
        &self,
        ctx: &OperationContext,
        criteria: &ListCriteria,
        page: &PaginationRequest,
    ) -> RepositoryResult<Vec<E>> {
        let mut rows = self.live_matching(ctx.tenant(), criteria);
        match criteria.order_by() {
            Some((field, direction)) => rows.sort_by(|a, b| {
                let ordering = compare_values(a.field(field).as_ref(), b.field(field).as_ref())
                    .then_with(|| a.id().cmp(&b.id()));
                match direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                }
            }),
            None => rows.sort_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.id().cmp(&b.id()))
            }),
        }

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(
        &self,
        ctx: &OperationContext,
        criteria: &ListCriteria,
    ) -> RepositoryResult<u64> {
        let total = self.live_matching(ctx.tenant(), criteria).len();
        Ok(u64::try_from(total).unwrap_or(u64::MAX))
    }

    async fn find_by_id(&self, ctx: &OperationContext, id: Uuid) -> RepositoryResult<Option<E>> {
        Ok(self
            .get_raw(ctx.tenant(), id)
            .filter(|row| row.deleted_at().is_none()))
    }

    async fn create(&self, ctx: &OperationContext, entity: &E) -> RepositoryResult<()> {
        let key = (ctx.tenant().clone(), entity.id());
        if self.rows.contains_key(&key) {
            return Err(StructuredError::infrastructure(
                Self::function("create"),
                MemoryStoreError::DuplicateKey(entity.id()),
            ));
        }
        self.rows.insert(key, entity.clone());
        tracing::debug!(
            entity = E::NAME,
            id = %entity.id(),
            tenant = %ctx.tenant(),
            "row inserted"
        );
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, entity: &E) -> RepositoryResult<()> {
        match self.rows.get_mut(&(ctx.tenant().clone(), entity.id())) {
            Some(mut row) => {
                *row = entity.clone();
                Ok(())
            }
            None => Err(StructuredError::infrastructure(
                Self::function("update"),
                MemoryStoreError::MissingRow(entity.id()),
            )),
        }
    }

    async fn soft_delete(
        &self,
        ctx: &OperationContext,
        id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        match self.rows.get_mut(&(ctx.tenant().clone(), id)) {
            Some(mut row) => {
                row.mark_deleted(deleted_at);
                Ok(())
            }
            None => Err(StructuredError::infrastructure(
                Self::function("soft_delete"),
                MemoryStoreError::MissingRow(id),
            )),
        }
    }
}

impl<E: Entity> ExistenceChecker for InMemoryStore<E> {
    async fn exists(
        &self,
        ctx: &OperationContext,
        params: &ExistenceCheckParams,
    ) -> RepositoryResult<bool> {
        if params.table != E::TABLE {
            return Err(StructuredError::infrastructure(
                Self::function("exists"),
                MemoryStoreError::UnknownTable(params.table.clone()),
            ));
        }

        let expected_id = FilterValue::String(params.id_value.clone());
        let expected_status = params.status_filter_value();
        let found = self
            .rows
            .iter()
            .filter(|entry| &entry.key().0 == ctx.tenant())
            .any(|entry| {
                let row = entry.value();
                let id_matches = row
                    .field(&params.id_column)
                    .is_some_and(|value| values_equal(&value, &expected_id));
                let status_matches = params.status_column.as_deref().is_none_or(|column| {
                    values_equal(
                        &row.field(column).unwrap_or(FilterValue::Null),
                        &expected_status,
                    )
                });
                id_matches && status_matches
            });
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::FilterCondition;
    use crate::roles::Role;

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name).unwrap()
    }

    fn ctx(name: &str) -> OperationContext {
        OperationContext::for_tests(tenant(name))
    }

    fn role(name: &str, minute: u32) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            enable: true,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_list_is_tenant_scoped_ordered_and_paged() {
        let store = InMemoryStore::<Role>::new();
        store.seed(&tenant("acme"), [role("c", 3), role("a", 1), role("b", 2)]);
        store.seed(&tenant("other"), [role("z", 0)]);

        let acme = ctx("acme");
        let rows = store
            .list(&acme, &ListCriteria::new(), &PaginationRequest::new(1, 2))
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let second = store
            .list(&acme, &ListCriteria::new(), &PaginationRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "c");

        assert_eq!(store.count(&acme, &ListCriteria::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_applies_filters_and_order() {
        let store = InMemoryStore::<Role>::new();
        let mut disabled = role("Gerencia Norte", 2);
        disabled.enable = false;
        store.seed(&tenant("acme"), [role("Gerencia", 1), disabled, role("Ventas", 3)]);

        let acme = ctx("acme");
        let criteria = ListCriteria::new()
            .with_filter(FilterCondition::contains("name", "geren"))
            .with_order("name", OrderDirection::Desc);
        let rows = store
            .list(&acme, &criteria, &PaginationRequest::new(1, 10))
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Gerencia Norte", "Gerencia"]);

        let enabled = ListCriteria::new().with_filter(FilterCondition::eq("enable", true));
        assert_eq!(store.count(&acme, &enabled).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_are_hidden() {
        let store = InMemoryStore::<Role>::new();
        let row = role("Gerencia", 1);
        let id = row.id;
        store.seed(&tenant("acme"), [row]);

        let acme = ctx("acme");
        let deleted_at = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        store.soft_delete(&acme, id, deleted_at).await.unwrap();

        assert_eq!(
            store.get_raw(&tenant("acme"), id).unwrap().deleted_at,
            Some(deleted_at)
        );
        assert!(store.find_by_id(&acme, id).await.unwrap().is_none());
        assert_eq!(store.count(&acme, &ListCriteria::new()).await.unwrap(), 0);

        let live = ExistenceCheckParams::new("roles", "id", id.to_string()).excluding_deleted();
        let any = ExistenceCheckParams::new("roles", "id", id.to_string());
        assert!(!store.exists(&acme, &live).await.unwrap());
        assert!(store.exists(&acme, &any).await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_by_unique_column() {
        let store = InMemoryStore::<Role>::new();
        store.seed(&tenant("acme"), [role("Gerencia", 1)]);

        let params = ExistenceCheckParams::new("roles", "name", "Gerencia").excluding_deleted();
        assert!(store.exists(&ctx("acme"), &params).await.unwrap());
        assert!(!store.exists(&ctx("other"), &params).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_table_is_infrastructure_error() {
        let store = InMemoryStore::<Role>::new();
        let params = ExistenceCheckParams::new("stores", "id", "1");
        let error = store.exists(&ctx("acme"), &params).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Infrastructure);
        assert_eq!(error.function(), "InMemoryStore<role>::exists");
    }

    #[tokio::test]
    async fn test_duplicate_insert_and_missing_update_fail() {
        let store = InMemoryStore::<Role>::new();
        let acme = ctx("acme");
        let row = role("Gerencia", 1);

        let error = store.update(&acme, &row).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Infrastructure);

        store.create(&acme, &row).await.unwrap();
        let error = store.create(&acme, &row).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Infrastructure);
    }
}
